//! Validated, immutable repository configuration and remote URL handling.

use std::path::{Path, PathBuf};

use crate::config::PublishSettings;
use crate::error::ConfigError;

/// Placeholder substituted with the commit timestamp.
pub const DATE_PLACEHOLDER: &str = "{date}";

const DEFAULT_AUTHOR_NAME: &str = "report-publisher";
const DEFAULT_AUTHOR_EMAIL: &str = "report-publisher@localhost";

/// Everything the pipeline needs to know about the target repository.
///
/// Built once from [`PublishSettings`] and passed by reference into every
/// component; nothing reads configuration from anywhere else.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    enabled: bool,
    remote_url: String,
    token: Option<String>,
    branch: String,
    local_path: PathBuf,
    commit_message_template: String,
    allow_force_push: bool,
    author_name: String,
    author_email: String,
}

impl RepositoryConfig {
    /// Validate settings into a configuration.
    ///
    /// Fails with [`ConfigError::MissingRemoteUrl`] if publishing is enabled
    /// without a remote.
    pub fn new(settings: PublishSettings) -> Result<Self, ConfigError> {
        let remote_url = settings.remote_url.trim().to_string();

        if settings.enabled {
            if remote_url.is_empty() {
                return Err(ConfigError::MissingRemoteUrl);
            }
            if !settings.commit_message.contains(DATE_PLACEHOLDER) {
                return Err(ConfigError::InvalidTemplate {
                    template: settings.commit_message,
                });
            }
        }

        let branch = if settings.branch.trim().is_empty() {
            "main".to_string()
        } else {
            settings.branch.trim().to_string()
        };

        Ok(RepositoryConfig {
            enabled: settings.enabled,
            remote_url,
            token: settings
                .token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            branch,
            local_path: settings.local_path,
            commit_message_template: settings.commit_message,
            allow_force_push: settings.allow_force_push,
            author_name: settings
                .author_name
                .unwrap_or_else(|| DEFAULT_AUTHOR_NAME.to_string()),
            author_email: settings
                .author_email
                .unwrap_or_else(|| DEFAULT_AUTHOR_EMAIL.to_string()),
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn commit_message_template(&self) -> &str {
        &self.commit_message_template
    }

    pub fn allow_force_push(&self) -> bool {
        self.allow_force_push
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn author_email(&self) -> &str {
        &self.author_email
    }

    /// Check that an HTTPS remote can authenticate.
    ///
    /// An HTTPS remote needs either a configured token or credentials already
    /// embedded in the URL. SSH remotes are always accepted.
    pub fn check_credentials(&self) -> Result<(), ConfigError> {
        if let Some(rest) = self.remote_url.strip_prefix("https://") {
            if self.token.is_none() && !has_userinfo(rest) {
                return Err(ConfigError::MissingToken {
                    remote: self.remote_url.clone(),
                });
            }
        }
        Ok(())
    }

    /// URL used for every network operation. Never persist this.
    pub fn authenticated_url(&self) -> String {
        authenticated_url(&self.remote_url, self.token.as_deref())
    }

    /// Mask the token wherever it appears in `text`.
    pub fn redact(&self, text: &str) -> String {
        match self.token.as_deref() {
            Some(token) => text.replace(token, "***"),
            None => text.to_string(),
        }
    }
}

impl TryFrom<PublishSettings> for RepositoryConfig {
    type Error = ConfigError;

    fn try_from(settings: PublishSettings) -> Result<Self, Self::Error> {
        RepositoryConfig::new(settings)
    }
}

/// Embed `token` as userinfo into an HTTPS URL.
///
/// `https://host/path` becomes `https://<token>@host/path`. SSH remotes,
/// URLs without a path, URLs that already carry userinfo, and calls without a
/// token are returned unchanged.
pub fn authenticated_url(remote_url: &str, token: Option<&str>) -> String {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return remote_url.to_string();
    };

    match remote_url.strip_prefix("https://") {
        Some(rest) if !has_userinfo(rest) => match rest.split_once('/') {
            Some((host, path)) if !host.is_empty() => format!("https://{token}@{host}/{path}"),
            _ => remote_url.to_string(),
        },
        _ => remote_url.to_string(),
    }
}

/// Whether the authority part of a scheme-less URL carries `user@`.
fn has_userinfo(without_scheme: &str) -> bool {
    let authority = without_scheme.split('/').next().unwrap_or_default();
    authority.contains('@')
}
