use std::path::Path;

use super::{CommandExecutor, CommandOutput};
use crate::error::CommandError;
use crate::repo_config::RepositoryConfig;

/// An executor bound to one repository configuration.
///
/// Masks the credential token in logged command lines and in returned
/// diagnostics, so callers can log and report output freely.
#[derive(Clone, Copy)]
pub struct GitSession<'a> {
    executor: &'a dyn CommandExecutor,
    config: &'a RepositoryConfig,
}

impl<'a> GitSession<'a> {
    pub fn new(executor: &'a dyn CommandExecutor, config: &'a RepositoryConfig) -> Self {
        GitSession { executor, config }
    }

    pub fn config(&self) -> &'a RepositoryConfig {
        self.config
    }

    /// Run inside the working copy.
    pub fn run(&self, args: &[&str]) -> CommandOutput {
        self.run_in(self.config.local_path(), args)
    }

    /// Run inside an arbitrary directory (used for cloning).
    pub fn run_in(&self, workdir: &Path, args: &[&str]) -> CommandOutput {
        let display = self.display(args);
        log::debug!("Running `{}` in {}", display, workdir.display());

        let out = self.executor.run(args, workdir);
        let output = self.config.redact(&out.output);
        if !out.success {
            log::debug!("`{}` failed: {}", display, output);
        }

        CommandOutput {
            success: out.success,
            output,
        }
    }

    /// Run inside the working copy, converting failure into a [`CommandError`].
    pub fn run_checked(&self, args: &[&str]) -> Result<String, CommandError> {
        self.run(args).into_result(self.display(args))
    }

    /// Command line as it may be shown to a human.
    pub fn display(&self, args: &[&str]) -> String {
        self.config.redact(&format!("git {}", args.join(" ")))
    }
}
