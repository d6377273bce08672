// Module declarations
mod push;
mod strategy;

// Re-export public types and functions
pub use push::SyncPusher;
pub use strategy::{
    classify_push_failure, next_action, AttemptTrail, NextAction, PushAttempt, PushFailure,
    Strategy, MERGE_MESSAGE, RECONCILE_CHAIN,
};

use std::path::{Path, PathBuf};

use crate::commit::ChangeCommitter;
use crate::error::{PublishError, PublishResult};
use crate::publish::ContentPublisher;
use crate::repo_config::RepositoryConfig;
use crate::report::PublishReport;
use crate::repository::{RepositoryManager, WorkingCopyState};
use crate::scm::{CommandExecutor, GitSession};

/// Full publish cycle: working copy, content, commit, push.
///
/// Each stage stops the cycle on an unrecoverable error. At most one cycle
/// may run against a given `local_path` at a time; nothing here locks it.
pub struct PublishPipeline<'a> {
    config: &'a RepositoryConfig,
    executor: &'a dyn CommandExecutor,
}

impl<'a> PublishPipeline<'a> {
    pub fn new(config: &'a RepositoryConfig, executor: &'a dyn CommandExecutor) -> Self {
        PublishPipeline { config, executor }
    }

    fn git(&self) -> GitSession<'a> {
        GitSession::new(self.executor, self.config)
    }

    /// Publish `artifacts` and push them to the remote.
    pub fn publish<P: AsRef<Path>>(&self, artifacts: &[P]) -> PublishResult<PublishReport> {
        if !self.config.enabled() {
            log::info!("Publishing is disabled");
            return Err(PublishError::Disabled);
        }
        if artifacts.is_empty() {
            return Err(PublishError::NoArtifacts);
        }
        self.config.check_credentials()?;

        let working_copy = RepositoryManager::new(self.git()).ensure_working_copy()?;

        let publisher = ContentPublisher::new(self.config);
        let published = publisher.publish(artifacts)?;
        if published.is_empty() {
            return Err(PublishError::NothingPublished);
        }
        let index_updated = publisher.regenerate_index()?.is_some();

        let commit = ChangeCommitter::new(self.git())
            .commit_if_changed(self.config.commit_message_template())?;

        // Push even when nothing new was committed: an earlier cycle may have
        // committed and then failed to push. An up-to-date push is a no-op.
        let push = SyncPusher::new(self.git()).sync_and_push()?;

        Ok(PublishReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            branch: self.config.branch().to_string(),
            working_copy,
            published,
            index_updated,
            commit,
            push,
        })
    }

    /// Validate configuration and prepare the working copy, without publishing.
    pub fn check_connection(&self) -> PublishResult<WorkingCopyState> {
        if !self.config.enabled() {
            return Err(PublishError::Disabled);
        }
        self.config.check_credentials()?;
        RepositoryManager::new(self.git()).ensure_working_copy()
    }

    /// Rewrite the index of the existing working copy; commits nothing.
    pub fn regenerate_index(&self) -> PublishResult<Option<PathBuf>> {
        ContentPublisher::new(self.config).regenerate_index()
    }
}
