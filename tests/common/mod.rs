//! Shared test fixtures: a scripted command runner.
//!
//! The mock records every invocation and answers from a rule list, so
//! end-to-end properties ("no pod creation call was issued") are
//! assertable without a cluster.
#![allow(dead_code)]

use async_trait::async_trait;
use cococtl::error::Result;
use cococtl::exec::{CmdOutput, CommandRunner};
use std::sync::Mutex;

/// One recorded external command invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl Invocation {
    /// True if the argv contains every given token, in order-insensitive
    /// fashion.
    pub fn has_args(&self, tokens: &[&str]) -> bool {
        tokens.iter().all(|t| self.args.iter().any(|a| a == t))
    }
}

type Matcher = Box<dyn Fn(&str, &[String]) -> bool + Send + Sync>;

/// Scripted [`CommandRunner`]: first matching rule answers; anything
/// unmatched succeeds with empty output.
#[derive(Default)]
pub struct MockRunner {
    rules: Vec<(Matcher, CmdOutput)>,
    calls: Mutex<Vec<Invocation>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule answering `output` when the program matches and the
    /// argv contains `needle`.
    pub fn on(mut self, program: &'static str, needle: &'static str, output: CmdOutput) -> Self {
        self.rules.push((
            Box::new(move |p, args| p == program && args.iter().any(|a| a.contains(needle))),
            output,
        ));
        self
    }

    pub fn ok(stdout: &str) -> CmdOutput {
        CmdOutput {
            code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn fail(code: i32, stderr: &str) -> CmdOutput {
        CmdOutput {
            code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// All recorded invocations.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Count of recorded invocations whose argv contains every token.
    pub fn count_with_args(&self, tokens: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|inv| inv.has_args(tokens))
            .count()
    }

    fn record_and_answer(&self, program: &str, args: &[String], stdin: Option<&str>) -> CmdOutput {
        self.calls.lock().unwrap().push(Invocation {
            program: program.to_string(),
            args: args.to_vec(),
            stdin: stdin.map(|s| s.to_string()),
        });
        for (matcher, output) in &self.rules {
            if matcher(program, args) {
                return output.clone();
            }
        }
        Self::ok("")
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, program: &str, args: &[String], stdin: Option<&str>) -> Result<CmdOutput> {
        Ok(self.record_and_answer(program, args, stdin))
    }

    async fn run_streaming(&self, program: &str, args: &[String]) -> Result<i32> {
        Ok(self.record_and_answer(program, args, None).code)
    }
}
