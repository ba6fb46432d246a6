// src/engine/dispatcher.rs

//! Maps a validated step action onto adapter calls.
//!
//! The dispatcher depends only on the `CommandAdapter` interface: `C` runs
//! CLI commands, `R` issues REST calls. Every handler composes its
//! definitions from the per-step context and the typed options.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::{OptionBag, SequenceStep};
use crate::engine::action::{
    ConfigureAdminUserOptions, CreateUserOptions, DeleteScratchOrgOptions, DeployMetadataOptions,
    ImportDataTreeOptions, InstallPackageOptions, StepAction, UserDefinition,
};
use crate::engine::context::ExecutionContext;
use crate::errors::{Result, SequenceError};
use crate::exec::{
    CliCommand, CommandAdapter, OrgTarget, RestCommand, RestRequest, SfCommand, StepProgress,
};
use crate::fs::{read_json, FileSystem};
use crate::progress::{ProgressNotifier, ProgressSubscriber};
use crate::types::ActionKind;

/// `--wait` minutes passed to long-running CLI commands.
const CLI_WAIT_MINUTES: i64 = 10;

pub struct StepDispatcher<C, R> {
    cli: C,
    rest: R,
    fs: Arc<dyn FileSystem>,
    settle_interval: Duration,
}

impl<C, R> StepDispatcher<C, R>
where
    C: CommandAdapter<Definition = CliCommand, Output = String>,
    R: CommandAdapter<Definition = RestCommand, Output = Value>,
{
    pub fn new(cli: C, rest: R, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            cli,
            rest,
            fs,
            settle_interval: Duration::from_secs(3),
        }
    }

    /// Pause after each successful step so the final progress line stays
    /// visible before the next one starts.
    pub fn with_settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    /// Validate and run one step.
    ///
    /// Unknown actions and missing options fail before any adapter call.
    /// Adapter errors come back wrapped with the step's action and name.
    pub async fn dispatch(
        &self,
        step: &SequenceStep,
        defaults: &OptionBag,
        ctx: &ExecutionContext,
        subscriber: Option<ProgressSubscriber>,
        notifier: &ProgressNotifier,
    ) -> Result<ActionKind> {
        let action = StepAction::parse(step, defaults)?;
        let kind = action.kind();
        let step_ctx = ctx.for_step(subscriber);
        let progress = StepProgress::new(
            step_ctx.progress.clone(),
            notifier.clone(),
            step_ctx.log_level.is_verbose(),
        );

        info!(step = %step.name, action = %kind, "dispatching step");

        let result = match action {
            StepAction::InstallPackage(opts) => self.install_package(&step_ctx, opts, &progress).await,
            StepAction::DeployMetadata(opts) => self.deploy_metadata(&step_ctx, opts, &step.name, &progress).await,
            StepAction::ImportDataTree(opts) => self.import_data_tree(&step_ctx, opts, &step.name, &progress).await,
            StepAction::CreateUser(opts) => self.create_user(&step_ctx, opts, &step.name, &progress).await,
            StepAction::ConfigureAdminUser(opts) => {
                self.configure_admin_user(&step_ctx, opts, &step.name, &progress).await
            }
            StepAction::DeleteScratchOrg(opts) => self.delete_scratch_org(&step_ctx, opts, &progress).await,
        };
        result.map_err(|e| e.in_step(kind.as_str(), &step.name))?;

        if !self.settle_interval.is_zero() {
            tokio::time::sleep(self.settle_interval).await;
        }

        debug!(step = %step.name, action = %kind, "step finished");
        Ok(kind)
    }

    async fn install_package(
        &self,
        ctx: &ExecutionContext,
        opts: InstallPackageOptions,
        progress: &StepProgress,
    ) -> Result<()> {
        let mut cmd = CliCommand::new(SfCommand::PackageInstall)
            .messages(
                format!("Installing package {}", opts.package_name),
                format!("Failed to install package {}", opts.package_name),
                format!("Package {} installed", opts.package_name),
            )
            .flag("package", opts.package_version_id)
            .flag("target-org", ctx.target_org_alias.as_str())
            .flag("wait", CLI_WAIT_MINUTES)
            .flag("publish-wait", CLI_WAIT_MINUTES)
            .flag("no-prompt", true);
        if let Some(key) = opts.installation_key {
            cmd = cmd.flag("installation-key", key);
        }

        self.cli.run(cmd.flag("json", true), progress).await?;
        Ok(())
    }

    async fn deploy_metadata(
        &self,
        ctx: &ExecutionContext,
        opts: DeployMetadataOptions,
        step: &str,
        progress: &StepProgress,
    ) -> Result<()> {
        let source_dir = ctx.mdapi_source_path.join(&opts.mdapi_source);
        if !self.fs.is_dir(&source_dir) {
            return Err(invalid_option(
                ActionKind::DeployMetadata,
                step,
                "mdapiSource",
                format!("directory {} not found", source_dir.display()),
            ));
        }

        let cmd = CliCommand::new(SfCommand::ProjectDeployStart)
            .messages(
                format!("Deploying metadata from {}", opts.mdapi_source),
                format!("Failed to deploy metadata from {}", opts.mdapi_source),
                format!("Metadata from {} deployed", opts.mdapi_source),
            )
            .flag("metadata-dir", source_dir.display().to_string())
            .flag("target-org", ctx.target_org_alias.as_str())
            .flag("wait", CLI_WAIT_MINUTES)
            .flag("json", true);

        self.cli.run(cmd, progress).await?;
        Ok(())
    }

    async fn import_data_tree(
        &self,
        ctx: &ExecutionContext,
        opts: ImportDataTreeOptions,
        step: &str,
        progress: &StepProgress,
    ) -> Result<()> {
        let plan = ctx.data_path.join(&opts.plan);
        if !self.fs.is_file(&plan) {
            return Err(invalid_option(
                ActionKind::ImportDataTree,
                step,
                "plan",
                format!("plan file {} not found", plan.display()),
            ));
        }

        let cmd = CliCommand::new(SfCommand::DataImportTree)
            .messages(
                format!("Importing data using plan {}", opts.plan),
                format!("Failed to import data using plan {}", opts.plan),
                format!("Data from plan {} imported", opts.plan),
            )
            .flag("plan", plan.display().to_string())
            .flag("target-org", ctx.target_org_alias.as_str())
            .flag("json", true);

        self.cli.run(cmd, progress).await?;
        Ok(())
    }

    async fn delete_scratch_org(
        &self,
        ctx: &ExecutionContext,
        opts: DeleteScratchOrgOptions,
        progress: &StepProgress,
    ) -> Result<()> {
        let alias = opts
            .scratch_org_alias
            .unwrap_or_else(|| ctx.target_org_alias.clone());

        let cmd = CliCommand::new(SfCommand::OrgDeleteScratch)
            .messages(
                format!("Deleting scratch org {alias}"),
                format!("Failed to delete scratch org {alias}"),
                format!("Scratch org {alias} deleted"),
            )
            .flag("target-org", alias.as_str())
            .flag("no-prompt", true)
            .flag("json", true);

        self.cli.run(cmd, progress).await?;
        Ok(())
    }

    /// Insert a user, then assign permission sets, set the password and
    /// register a local alias.
    ///
    /// Only the insert is atomic. A failure in any follow-up leaves the user
    /// in place and is reported as `PartiallyApplied`.
    async fn create_user(
        &self,
        ctx: &ExecutionContext,
        opts: CreateUserOptions,
        step: &str,
        progress: &StepProgress,
    ) -> Result<()> {
        let kind = ActionKind::CreateUser;
        let def = self.read_user_definition(kind, step, ctx, &opts.definition_file)?;
        let username = def
            .username()
            .ok_or_else(|| {
                invalid_option(
                    kind,
                    step,
                    "definitionFile",
                    format!("{} has no Username", opts.definition_file),
                )
            })?
            .to_string();
        let target = OrgTarget::Alias(ctx.target_org_alias.clone());

        let mut record = def.fields.clone();
        if let Some(profile) = &def.profile_name {
            let profile_id = self
                .query_id(
                    &target,
                    format!("SELECT Id FROM Profile WHERE Name = '{}'", soql_escape(profile)),
                    &format!("profile '{profile}'"),
                    progress,
                )
                .await?;
            record.insert("ProfileId".to_string(), Value::String(profile_id));
        }

        let created = self
            .rest
            .run(
                RestCommand::new(
                    target.clone(),
                    RestRequest::post("/sobjects/User", Value::Object(record)),
                )
                .messages(
                    format!("Creating user {username}"),
                    format!("Failed to create user {username}"),
                    format!("User {username} created"),
                ),
                progress,
            )
            .await?;
        let user_id = record_id(&created).ok_or_else(|| {
            SequenceError::CommandFailed(format!("creating user {username} returned no id"))
        })?;

        let mut applied = vec![format!("creating user {username}")];

        for permset in &def.permission_sets {
            self.assign_permission_set(&target, &user_id, permset, progress)
                .await
                .map_err(|e| partially_applied(kind, step, &applied, e))?;
            applied.push(format!("assigning permission set {permset}"));
        }

        if let Some(password) = &def.password {
            self.set_password(&target, &user_id, &username, password, progress)
                .await
                .map_err(|e| partially_applied(kind, step, &applied, e))?;
            applied.push(format!("setting the password of {username}"));
        }

        let alias_cmd = CliCommand::new(SfCommand::AliasSet)
            .messages(
                format!("Setting alias {}", opts.user_alias),
                format!("Failed to set alias {}", opts.user_alias),
                format!("Alias {} set", opts.user_alias),
            )
            .arg(format!("{}={}", opts.user_alias, username));
        self.cli
            .run(alias_cmd, progress)
            .await
            .map_err(|e| partially_applied(kind, step, &applied, e))?;

        Ok(())
    }

    /// Update the connection's own user from a definition file and assign
    /// its permission sets.
    async fn configure_admin_user(
        &self,
        ctx: &ExecutionContext,
        opts: ConfigureAdminUserOptions,
        step: &str,
        progress: &StepProgress,
    ) -> Result<()> {
        let kind = ActionKind::ConfigureAdminUser;
        let def = self.read_user_definition(kind, step, ctx, &opts.definition_file)?;
        let target = OrgTarget::Alias(ctx.target_org_alias.clone());

        let info = self
            .rest
            .run(
                RestCommand::new(target.clone(), RestRequest::get("/services/oauth2/userinfo"))
                    .messages("Looking up admin user", "Failed to look up admin user", ""),
                progress,
            )
            .await?;
        let user_id = info
            .get("user_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SequenceError::CommandFailed("userinfo returned no user_id".to_string()))?;

        let mut applied: Vec<String> = Vec::new();

        let mut fields: Map<String, Value> = def.fields.clone();
        fields.remove("Username");
        if !fields.is_empty() {
            self.rest
                .run(
                    RestCommand::new(
                        target.clone(),
                        RestRequest::patch(format!("/sobjects/User/{user_id}"), Value::Object(fields)),
                    )
                    .messages(
                        "Updating admin user",
                        "Failed to update admin user",
                        "Admin user updated",
                    ),
                    progress,
                )
                .await?;
            applied.push("updating the admin user".to_string());
        }

        for permset in &def.permission_sets {
            self.assign_permission_set(&target, &user_id, permset, progress)
                .await
                .map_err(|e| partially_applied(kind, step, &applied, e))?;
            applied.push(format!("assigning permission set {permset}"));
        }

        Ok(())
    }

    fn read_user_definition(
        &self,
        kind: ActionKind,
        step: &str,
        ctx: &ExecutionContext,
        file: &str,
    ) -> Result<UserDefinition> {
        let path = ctx.config_path.join(file);
        read_json::<UserDefinition>(self.fs.as_ref(), &path)
            .map_err(|e| invalid_option(kind, step, "definitionFile", format!("{e:#}")))
    }

    async fn assign_permission_set(
        &self,
        target: &OrgTarget,
        user_id: &str,
        permset: &str,
        progress: &StepProgress,
    ) -> Result<()> {
        let permset_id = self
            .query_id(
                target,
                format!("SELECT Id FROM PermissionSet WHERE Name = '{}'", soql_escape(permset)),
                &format!("permission set '{permset}'"),
                progress,
            )
            .await?;

        self.rest
            .run(
                RestCommand::new(
                    target.clone(),
                    RestRequest::post(
                        "/sobjects/PermissionSetAssignment",
                        json!({ "AssigneeId": user_id, "PermissionSetId": permset_id }),
                    ),
                )
                .messages(
                    format!("Assigning permission set {permset}"),
                    format!("Failed to assign permission set {permset}"),
                    format!("Permission set {permset} assigned"),
                ),
                progress,
            )
            .await?;
        Ok(())
    }

    async fn set_password(
        &self,
        target: &OrgTarget,
        user_id: &str,
        username: &str,
        password: &str,
        progress: &StepProgress,
    ) -> Result<()> {
        self.rest
            .run(
                RestCommand::new(
                    target.clone(),
                    RestRequest::post(
                        format!("/sobjects/User/{user_id}/password"),
                        json!({ "NewPassword": password }),
                    ),
                )
                .messages(
                    format!("Setting password for {username}"),
                    format!("Failed to set password for {username}"),
                    format!("Password set for {username}"),
                ),
                progress,
            )
            .await?;
        Ok(())
    }

    /// Run a SOQL query expected to return at least one record and take the
    /// first record's `Id`.
    async fn query_id(
        &self,
        target: &OrgTarget,
        soql: String,
        what: &str,
        progress: &StepProgress,
    ) -> Result<String> {
        let response = self
            .rest
            .run(
                RestCommand::new(target.clone(), RestRequest::query(soql))
                    .messages(format!("Looking up {what}"), format!("Failed to look up {what}"), ""),
                progress,
            )
            .await?;

        response
            .get("records")
            .and_then(Value::as_array)
            .and_then(|records| records.first())
            .and_then(|r| r.get("Id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SequenceError::CommandFailed(format!("{what} not found")))
    }
}

/// `id` of an sObject create response (`{"id": "...", "success": true}`).
fn record_id(response: &Value) -> Option<String> {
    response
        .get("id")
        .or_else(|| response.get("Id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn soql_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn invalid_option(kind: ActionKind, step: &str, option: &str, reason: String) -> SequenceError {
    SequenceError::InvalidOption {
        action: kind.to_string(),
        step: step.to_string(),
        option: option.to_string(),
        reason,
    }
}

fn partially_applied(
    kind: ActionKind,
    step: &str,
    applied: &[String],
    err: SequenceError,
) -> SequenceError {
    if applied.is_empty() {
        return err;
    }
    SequenceError::PartiallyApplied {
        action: kind.to_string(),
        step: step.to_string(),
        applied: applied.join(", "),
        message: err.to_string(),
    }
}
