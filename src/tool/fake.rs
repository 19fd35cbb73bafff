use std::cell::RefCell;
use std::io;

use super::{Execution, Runner};

/// Records scripts and answers them with canned executions.
///
/// The first response whose pattern is contained in the script wins,
/// everything else succeeds without output.
#[derive(Debug, Default)]
pub(crate) struct FakeRunner {
    scripts: RefCell<Vec<String>>,
    responses: Vec<(String, Execution)>,
}

impl FakeRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, pattern: &str, exit_code: i32, stdout: &[&str]) -> Self {
        let execution = Execution {
            exit_code: Some(exit_code),
            stdout: stdout.iter().map(|line| line.to_string()).collect(),
        };
        self.responses.push((pattern.to_string(), execution));
        self
    }

    pub(crate) fn scripts(&self) -> Vec<String> {
        self.scripts.borrow().clone()
    }
}

impl Runner for FakeRunner {
    fn run(&self, script: &str) -> io::Result<Execution> {
        self.scripts.borrow_mut().push(script.to_string());
        let execution = self
            .responses
            .iter()
            .find(|(pattern, _)| script.contains(pattern.as_str()))
            .map(|(_, execution)| execution.clone())
            .unwrap_or(Execution {
                exit_code: Some(0),
                stdout: Vec::new(),
            });
        Ok(execution)
    }
}
