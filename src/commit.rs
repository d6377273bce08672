//! Committing working copy changes, only when something changed.

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::{PublishError, PublishResult};
use crate::repo_config::DATE_PLACEHOLDER;
use crate::scm::GitSession;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// What a commit attempt did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    Committed { message: String },
    /// Nothing was pending; no commit was created.
    Unchanged,
}

/// Stages everything and commits if the working copy differs from HEAD.
pub struct ChangeCommitter<'a> {
    git: GitSession<'a>,
}

impl<'a> ChangeCommitter<'a> {
    pub fn new(git: GitSession<'a>) -> Self {
        ChangeCommitter { git }
    }

    pub fn commit_if_changed(&self, template: &str) -> PublishResult<CommitOutcome> {
        self.commit_if_changed_at(template, Local::now())
    }

    pub fn commit_if_changed_at(
        &self,
        template: &str,
        now: DateTime<Local>,
    ) -> PublishResult<CommitOutcome> {
        if !self.git.config().enabled() {
            return Err(PublishError::Disabled);
        }

        self.git.run_checked(&["add", "."])?;

        let status = self.git.run_checked(&["status", "--porcelain"])?;
        if status.trim().is_empty() {
            log::info!("No changes to commit");
            return Ok(CommitOutcome::Unchanged);
        }

        let message = format_commit_message(template, now);
        self.git.run_checked(&["commit", "-m", &message])?;
        log::info!("Committed: {}", message);

        Ok(CommitOutcome::Committed { message })
    }
}

/// Substitute the timestamp into every `{date}` placeholder.
pub fn format_commit_message(template: &str, now: DateTime<Local>) -> String {
    template.replace(DATE_PLACEHOLDER, &now.format(DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublishSettings;
    use crate::repo_config::RepositoryConfig;
    use crate::scm::fake::ScriptedExecutor;
    use crate::scm::CommandOutput;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn config(enabled: bool) -> RepositoryConfig {
        RepositoryConfig::new(PublishSettings {
            enabled,
            remote_url: "git@github.com:u/r.git".to_string(),
            local_path: PathBuf::from("/tmp/wc"),
            commit_message: "Reports for {date}".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 2, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_format_commit_message() {
        assert_eq!(
            format_commit_message("Reports for {date}", noon()),
            "Reports for 2024-01-02 12:30"
        );
    }

    #[test]
    fn test_commits_when_changed() {
        let config = config(true);
        let executor = ScriptedExecutor::new()
            .on(&["status"], CommandOutput::ok("A  posts/report.md"));

        let outcome = ChangeCommitter::new(GitSession::new(&executor, &config))
            .commit_if_changed_at(config.commit_message_template(), noon())
            .unwrap();

        assert_eq!(
            outcome,
            CommitOutcome::Committed {
                message: "Reports for 2024-01-02 12:30".to_string()
            }
        );
        assert_eq!(
            executor.lines(),
            vec![
                "add .",
                "status --porcelain",
                "commit -m Reports for 2024-01-02 12:30"
            ]
        );
    }

    #[test]
    fn test_second_run_without_changes_is_noop() {
        let config = config(true);
        let executor = ScriptedExecutor::new()
            .once(&["status"], CommandOutput::ok(" M posts/report.md"))
            .on(&["status"], CommandOutput::ok(""));
        let committer = ChangeCommitter::new(GitSession::new(&executor, &config));

        let first = committer.commit_if_changed_at("x {date}", noon()).unwrap();
        let second = committer.commit_if_changed_at("x {date}", noon()).unwrap();

        assert!(matches!(first, CommitOutcome::Committed { .. }));
        assert_eq!(second, CommitOutcome::Unchanged);
        assert_eq!(executor.count_matching(&["commit"]), 1);
    }

    #[test]
    fn test_commit_failure_is_reported_once() {
        let config = config(true);
        let executor = ScriptedExecutor::new()
            .on(&["status"], CommandOutput::ok("?? posts/new.md"))
            .on(&["commit"], CommandOutput::failed("error: gpg failed to sign the data"));

        let err = ChangeCommitter::new(GitSession::new(&executor, &config))
            .commit_if_changed("x {date}")
            .unwrap_err();

        match err {
            PublishError::Command(e) => assert!(e.diagnostic.contains("gpg failed")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(executor.count_matching(&["commit"]), 1);
    }

    #[test]
    fn test_stage_failure_stops_before_status() {
        let config = config(true);
        let executor =
            ScriptedExecutor::new().on(&["add"], CommandOutput::failed("fatal: index.lock exists"));

        let result = ChangeCommitter::new(GitSession::new(&executor, &config))
            .commit_if_changed("x {date}");

        assert!(matches!(result, Err(PublishError::Command(_))));
        assert_eq!(executor.lines(), vec!["add ."]);
    }

    #[test]
    fn test_disabled_runs_nothing() {
        let config = config(false);
        let executor = ScriptedExecutor::new();

        let result = ChangeCommitter::new(GitSession::new(&executor, &config))
            .commit_if_changed("x {date}");
        assert!(matches!(result, Err(PublishError::Disabled)));
        assert!(executor.calls().is_empty());
    }
}
