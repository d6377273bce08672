//! Git executor using the git CLI.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use super::{CommandExecutor, CommandOutput};

/// Runs commands through the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: OsString,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Use a different executable, e.g. an absolute path to git.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        GitCli {
            program: program.into(),
        }
    }

    /// Check if the executable can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl CommandExecutor for GitCli {
    fn run(&self, args: &[&str], workdir: &Path) -> CommandOutput {
        let result = Command::new(&self.program)
            .args(args)
            .current_dir(workdir)
            // Unattended: fail instead of waiting for a credential prompt
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output();

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                return CommandOutput::failed(format!(
                    "failed to run {} in {}: {}",
                    self.program.to_string_lossy(),
                    workdir.display(),
                    e
                ))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return CommandOutput::ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let diagnostic = match (stderr.is_empty(), stdout.is_empty()) {
            (false, false) => format!("{stderr}\n{stdout}"),
            (false, true) => stderr,
            (true, false) => stdout,
            (true, true) => format!("exited with {}", output.status),
        };
        CommandOutput::failed(diagnostic)
    }
}
