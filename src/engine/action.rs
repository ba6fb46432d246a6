// src/engine/action.rs

//! Typed step actions.
//!
//! A `SequenceStep` carries a free-form option bag. [`StepAction::parse`]
//! turns it into one strongly-typed options struct per action kind, checking
//! presence and shape once, before any handler runs. Step options take
//! precedence over the sequence-wide defaults.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{OptionBag, SequenceStep};
use crate::errors::{Result, SequenceError};
use crate::types::ActionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPackageOptions {
    pub package_name: String,
    pub package_version_id: String,
    pub installation_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployMetadataOptions {
    /// Folder name under the context's MDAPI source path.
    pub mdapi_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDataTreeOptions {
    /// Plan file name under the context's data path.
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserOptions {
    /// User definition file under the context's config path.
    pub definition_file: String,
    /// Local alias to register for the new user.
    pub user_alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureAdminUserOptions {
    pub definition_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteScratchOrgOptions {
    /// Defaults to the context's target org.
    pub scratch_org_alias: Option<String>,
}

/// A validated step action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    InstallPackage(InstallPackageOptions),
    DeployMetadata(DeployMetadataOptions),
    ImportDataTree(ImportDataTreeOptions),
    CreateUser(CreateUserOptions),
    ConfigureAdminUser(ConfigureAdminUserOptions),
    DeleteScratchOrg(DeleteScratchOrgOptions),
}

impl StepAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            StepAction::InstallPackage(_) => ActionKind::InstallPackage,
            StepAction::DeployMetadata(_) => ActionKind::DeployMetadata,
            StepAction::ImportDataTree(_) => ActionKind::ImportDataTree,
            StepAction::CreateUser(_) => ActionKind::CreateUser,
            StepAction::ConfigureAdminUser(_) => ActionKind::ConfigureAdminUser,
            StepAction::DeleteScratchOrg(_) => ActionKind::DeleteScratchOrg,
        }
    }

    /// Resolve a step's action name and validate its options.
    pub fn parse(step: &SequenceStep, defaults: &OptionBag) -> Result<Self> {
        let kind: ActionKind = step
            .action
            .parse()
            .map_err(|_| SequenceError::UnknownAction {
                step: step.name.clone(),
                action: step.action.clone(),
            })?;

        let opts = StepOptions {
            kind,
            step,
            defaults,
        };

        let action = match kind {
            ActionKind::InstallPackage => StepAction::InstallPackage(InstallPackageOptions {
                package_name: opts.required("packageName")?,
                package_version_id: opts.required("packageVersionId")?,
                installation_key: opts.optional("installationKey")?,
            }),
            ActionKind::DeployMetadata => StepAction::DeployMetadata(DeployMetadataOptions {
                mdapi_source: opts.required("mdapiSource")?,
            }),
            ActionKind::ImportDataTree => StepAction::ImportDataTree(ImportDataTreeOptions {
                plan: opts.required("plan")?,
            }),
            ActionKind::CreateUser => StepAction::CreateUser(CreateUserOptions {
                definition_file: opts.required("definitionFile")?,
                user_alias: opts.required("sfdxUserAlias")?,
            }),
            ActionKind::ConfigureAdminUser => {
                StepAction::ConfigureAdminUser(ConfigureAdminUserOptions {
                    definition_file: opts.required("definitionFile")?,
                })
            }
            ActionKind::DeleteScratchOrg => StepAction::DeleteScratchOrg(DeleteScratchOrgOptions {
                scratch_org_alias: opts.optional("scratchOrgAlias")?,
            }),
        };

        Ok(action)
    }
}

/// Option lookup for one step, falling back to sequence defaults.
struct StepOptions<'a> {
    kind: ActionKind,
    step: &'a SequenceStep,
    defaults: &'a OptionBag,
}

impl StepOptions<'_> {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.step
            .options
            .get(key)
            .or_else(|| self.defaults.get(key))
            .filter(|v| !v.is_null())
    }

    fn required(&self, key: &str) -> Result<String> {
        match self.optional(key)? {
            Some(value) => Ok(value),
            None => Err(SequenceError::MissingOption {
                action: self.kind.to_string(),
                step: self.step.name.clone(),
                option: key.to_string(),
            }),
        }
    }

    /// Strings are trimmed and empty ones count as absent. Numbers and
    /// booleans are accepted in their textual form.
    fn optional(&self, key: &str) -> Result<Option<String>> {
        let Some(value) = self.lookup(key) else {
            return Ok(None);
        };
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(SequenceError::InvalidOption {
                    action: self.kind.to_string(),
                    step: self.step.name.clone(),
                    option: key.to_string(),
                    reason: format!("expected a string, got {other}"),
                });
            }
        };
        Ok((!text.is_empty()).then_some(text))
    }
}

/// Contents of a user definition file.
///
/// Recognised keys are pulled out; every other key is passed through as a
/// `User` field.
///
/// ```json
/// {
///   "Username": "demo.user@example.com",
///   "LastName": "User",
///   "Email": "demo.user@example.com",
///   "Alias": "duser",
///   "profileName": "Standard User",
///   "permsets": ["Demo_Access"],
///   "password": "S3cret-pass"
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDefinition {
    #[serde(default, rename = "profileName", alias = "ProfileName")]
    pub profile_name: Option<String>,

    #[serde(default, rename = "permsets", alias = "permissionSets")]
    pub permission_sets: Vec<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl UserDefinition {
    pub fn username(&self) -> Option<&str> {
        self.fields
            .get("Username")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}
