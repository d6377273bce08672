//! Error types for the publish pipeline.
//!
//! External commands never raise; their failures surface as [`CommandError`]
//! values. Everything a publish cycle can fail with is collected in
//! [`PublishError`].

use std::path::PathBuf;
use thiserror::Error;

use crate::sync::AttemptTrail;

/// Configuration problems, detected before any external command runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("publishing is enabled but no remote_url is configured")]
    MissingRemoteUrl,

    #[error("remote '{remote}' uses HTTPS but no token is configured")]
    MissingToken { remote: String },

    #[error("commit message template '{template}' has no {{date}} placeholder")]
    InvalidTemplate { template: String },

    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A single external command that exited non-zero or could not be started.
#[derive(Debug, Clone, Error)]
#[error("`{command}` failed: {diagnostic}")]
pub struct CommandError {
    /// The command line as run, with credentials masked.
    pub command: String,
    pub diagnostic: String,
}

/// Failure of a whole publish cycle.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publishing is disabled")]
    Disabled,

    #[error("no artifacts were given to publish")]
    NoArtifacts,

    #[error("nothing published: none of the artifacts exist")]
    NothingPublished,

    #[error("could not prepare working copy: {diagnostic}")]
    WorkingCopy { diagnostic: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("filesystem error at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every applicable strategy was tried and the push still did not land.
    #[error("push failed after trying every strategy:\n{attempts}")]
    PushFailed { attempts: AttemptTrail },
}

impl PublishError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PublishError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type PublishResult<T> = Result<T, PublishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display() {
        let err = CommandError {
            command: "git push *** main".to_string(),
            diagnostic: "rejected".to_string(),
        };
        assert_eq!(err.to_string(), "`git push *** main` failed: rejected");
    }

    #[test]
    fn test_invalid_template_mentions_placeholder() {
        let err = ConfigError::InvalidTemplate {
            template: "update".to_string(),
        };
        assert!(err.to_string().contains("{date}"));
    }

    #[test]
    fn test_config_error_converts_into_publish_error() {
        let err: PublishError = ConfigError::MissingRemoteUrl.into();
        assert!(matches!(err, PublishError::Config(ConfigError::MissingRemoteUrl)));
    }
}
