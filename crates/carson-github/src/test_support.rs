use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{CommandOutput, CommandRunner, GithubClient, GithubError, RepoRef};

/// Replays queued outputs in order and records every argument list it receives.
#[derive(Default)]
pub(crate) struct ScriptedCommandRunner {
    outputs: Mutex<VecDeque<CommandOutput>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedCommandRunner {
    pub(crate) fn new(outputs: Vec<CommandOutput>) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(outputs.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }
}

#[async_trait]
impl CommandRunner for ScriptedCommandRunner {
    async fn run(&self, args: &[String]) -> Result<CommandOutput, GithubError> {
        self.calls.lock().expect("calls lock").push(args.to_vec());
        Ok(self
            .outputs
            .lock()
            .expect("outputs lock")
            .pop_front()
            .unwrap_or_else(|| CommandOutput::failed("unexpected gh call")))
    }
}

pub(crate) fn client_for(runner: Arc<ScriptedCommandRunner>) -> GithubClient {
    GithubClient::new(runner, RepoRef::parse("acme/widgets").expect("repo"))
}

pub(crate) fn json_output(value: serde_json::Value) -> CommandOutput {
    CommandOutput::ok(value.to_string())
}

pub(crate) fn has_arg(call: &[String], expected: &str) -> bool {
    call.iter().any(|arg| arg == expected)
}
