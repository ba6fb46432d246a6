#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use orgseq::config::{CommandSequence, OptionBag, SequenceGroup, SequenceStep};
use orgseq::engine::{ExecutionContext, StepDispatcher};
use orgseq::fs::mock::MockFileSystem;

use crate::fake_adapters::{CallLog, FakeCliAdapter, FakeRestAdapter};

/// Project root used by test contexts.
pub const PROJECT: &str = "/project";
/// Target org alias used by test contexts.
pub const TARGET_ORG: &str = "demo-scratch";

/// Builder for `CommandSequence` to simplify test setup.
pub struct SequenceBuilder {
    sequence: CommandSequence,
}

impl SequenceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            sequence: CommandSequence {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                description: String::new(),
                groups: Vec::new(),
                options: OptionBag::new(),
            },
        }
    }

    pub fn group(mut self, name: &str, steps: Vec<SequenceStep>) -> Self {
        self.sequence.groups.push(SequenceGroup {
            name: name.to_string(),
            steps,
        });
        self
    }

    pub fn default_option(mut self, key: &str, value: Value) -> Self {
        self.sequence.options.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> CommandSequence {
        self.sequence
    }
}

/// A step with options given as a JSON object.
///
/// ```ignore
/// step("Install", "install-package", json!({"packageName": "Base", "packageVersionId": "04t"}))
/// ```
pub fn step(name: &str, action: &str, options: Value) -> SequenceStep {
    let options = match options {
        Value::Object(map) => map,
        Value::Null => OptionBag::new(),
        other => panic!("step options must be a JSON object, got {other}"),
    };
    SequenceStep {
        name: name.to_string(),
        action: action.to_string(),
        options,
    }
}

/// Context rooted at [`PROJECT`], targeting [`TARGET_ORG`].
pub fn test_context() -> ExecutionContext {
    ExecutionContext::new(TARGET_ORG, PROJECT)
}

/// Fake adapters sharing one call log, plus the filesystem they read from.
pub struct TestRig {
    pub cli: FakeCliAdapter,
    pub rest: FakeRestAdapter,
    pub fs: MockFileSystem,
    pub calls: CallLog,
}

impl TestRig {
    pub fn new() -> Self {
        let calls = CallLog::default();
        Self {
            cli: FakeCliAdapter::new(calls.clone()),
            rest: FakeRestAdapter::new(calls.clone()),
            fs: MockFileSystem::new(),
            calls,
        }
    }

    /// Add an MDAPI source folder under the test context.
    pub fn with_mdapi_source(self, name: &str) -> Self {
        self.fs.add_dir(format!("{PROJECT}/mdapi-source/{name}"));
        self
    }

    /// Add a data plan under the test context.
    pub fn with_data_plan(self, name: &str) -> Self {
        self.fs.add_file(format!("{PROJECT}/data/{name}"), "[]");
        self
    }

    /// Add a definition file under the test context's config folder.
    pub fn with_definition(self, name: &str, content: Value) -> Self {
        self.fs
            .add_file(format!("{PROJECT}/config/{name}"), content.to_string());
        self
    }

    /// Dispatcher over this rig's fakes, without a settle pause.
    pub fn dispatcher(&self) -> StepDispatcher<FakeCliAdapter, FakeRestAdapter> {
        StepDispatcher::new(self.cli.clone(), self.rest.clone(), Arc::new(self.fs.clone()))
            .with_settle_interval(Duration::ZERO)
    }
}

impl Default for TestRig {
    fn default() -> Self {
        Self::new()
    }
}
