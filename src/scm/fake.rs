//! Scripted executor for driving the pipeline without git.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{CommandExecutor, CommandOutput};

type Responder = Box<dyn Fn(&[String], &Path) -> CommandOutput + Send + Sync>;

fn constant(output: CommandOutput) -> Responder {
    Box::new(move |_: &[String], _: &Path| output.clone())
}

struct Rule {
    prefix: Vec<String>,
    remaining: Option<usize>,
    respond: Responder,
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub args: Vec<String>,
    pub workdir: PathBuf,
}

impl Call {
    pub fn line(&self) -> String {
        self.args.join(" ")
    }
}

/// Matches each command against rules in insertion order; the first live rule
/// whose prefix matches answers it. Unmatched commands succeed with no output.
pub(crate) struct ScriptedExecutor {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        ScriptedExecutor {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on(self, prefix: &[&str], output: CommandOutput) -> Self {
        self.push_rule(prefix, None, constant(output))
    }

    /// Answer only the next matching command.
    pub fn once(self, prefix: &[&str], output: CommandOutput) -> Self {
        self.push_rule(prefix, Some(1), constant(output))
    }

    /// Answer with a closure, e.g. to create files as a side effect.
    pub fn on_with<F>(self, prefix: &[&str], respond: F) -> Self
    where
        F: Fn(&[String], &Path) -> CommandOutput + Send + Sync + 'static,
    {
        self.push_rule(prefix, None, Box::new(respond))
    }

    fn push_rule(self, prefix: &[&str], remaining: Option<usize>, respond: Responder) -> Self {
        self.rules.lock().unwrap().push(Rule {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            remaining,
            respond,
        });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls().iter().map(Call::line).collect()
    }

    pub fn count_matching(&self, prefix: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.args.iter().map(String::as_str).take(prefix.len()).eq(prefix.iter().copied()))
            .count()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn run(&self, args: &[&str], workdir: &Path) -> CommandOutput {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.calls.lock().unwrap().push(Call {
            args: args.clone(),
            workdir: workdir.to_path_buf(),
        });

        let mut rules = self.rules.lock().unwrap();
        for rule in rules.iter_mut() {
            if rule.remaining == Some(0) || !args.starts_with(&rule.prefix) {
                continue;
            }
            if let Some(n) = rule.remaining.as_mut() {
                *n -= 1;
            }
            return (rule.respond)(&args, workdir);
        }
        CommandOutput::ok("")
    }
}
