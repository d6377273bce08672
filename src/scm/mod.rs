//! Process boundary to the version-control tool.
//!
//! Every interaction with git goes through the [`CommandExecutor`] trait so the
//! higher layers can be driven by a scripted executor in tests.

mod git;
mod session;

#[cfg(test)]
pub(crate) mod fake;

use std::path::Path;

use crate::error::CommandError;

pub use git::GitCli;
pub use session::GitSession;

/// Result of running one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Standard output on success; diagnostic text on failure.
    pub output: String,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        CommandOutput {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(diagnostic: impl Into<String>) -> Self {
        CommandOutput {
            success: false,
            output: diagnostic.into(),
        }
    }

    /// Convert into a `Result`, attaching `command` to the error.
    pub fn into_result(self, command: impl Into<String>) -> Result<String, CommandError> {
        if self.success {
            Ok(self.output)
        } else {
            Err(CommandError {
                command: command.into(),
                diagnostic: self.output,
            })
        }
    }
}

/// Runs a single version-control command.
///
/// Implementations never fail: a non-zero exit or a process that could not be
/// started both come back as `success == false` with the diagnostic in
/// `output`. Retrying is left to the caller.
pub trait CommandExecutor: Send + Sync {
    fn run(&self, args: &[&str], workdir: &Path) -> CommandOutput;
}

/// Check if a directory is a git working copy.
pub fn is_repo(path: &Path) -> bool {
    path.join(".git").exists()
}
