use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Cross-platform configuration directory manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the main configuration directory path following platform conventions:
    /// - Linux: $XDG_CONFIG_HOME/report-publisher or ~/.config/report-publisher
    /// - macOS: ~/Library/Application Support/report-publisher
    /// - Windows: %APPDATA%\report-publisher
    pub fn config_dir() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
                Ok(PathBuf::from(xdg_config).join("report-publisher"))
            } else {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                Ok(home.join(".config").join("report-publisher"))
            }
        }

        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home
                .join("Library")
                .join("Application Support")
                .join("report-publisher"))
        }

        #[cfg(target_os = "windows")]
        {
            Ok(dirs::config_dir()
                .context("Failed to get Windows config directory")?
                .join("report-publisher"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join(".report-publisher"))
        }
    }

    /// Get the settings file path (config.toml)
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the default working copy directory
    pub fn default_repo_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("repo"))
    }

    /// Get the log file path
    pub fn log_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("report-publisher.log"))
    }

    /// Ensure the configuration directory exists
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;
        Ok(config_dir)
    }
}

/// Publish settings as stored in `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSettings {
    /// Master switch; nothing touches the repository while this is false
    #[serde(default)]
    pub enabled: bool,

    /// Remote repository URL (HTTPS or SSH form)
    #[serde(default)]
    pub remote_url: String,

    /// Access token embedded into HTTPS remote URLs for network operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Branch that receives published content
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Location of the local working copy
    ///
    /// This directory is disposable: recovery may hard-reset or re-clone it,
    /// discarding anything that is not on the remote.
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,

    /// Commit message with a `{date}` placeholder
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Escalate to `--force-with-lease` when the remote rejects a push
    #[serde(default = "default_allow_force_push")]
    pub allow_force_push: bool,

    /// Committer name used when git has no identity configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    /// Committer email used when git has no identity configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_local_path() -> PathBuf {
    ConfigManager::default_repo_dir().unwrap_or_else(|_| PathBuf::from("output/repo"))
}

fn default_commit_message() -> String {
    "Update reports: {date}".to_string()
}

fn default_allow_force_push() -> bool {
    true
}

impl Default for PublishSettings {
    fn default() -> Self {
        PublishSettings {
            enabled: false,
            remote_url: String::new(),
            token: None,
            branch: default_branch(),
            local_path: default_local_path(),
            commit_message: default_commit_message(),
            allow_force_push: default_allow_force_push(),
            author_name: None,
            author_email: None,
        }
    }
}

impl PublishSettings {
    /// Load settings from a TOML file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save settings to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Copy of these settings that is safe to print
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if masked.token.as_deref().is_some_and(|t| !t.is_empty()) {
            masked.token = Some("***".to_string());
        }
        masked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_config_paths() {
        let config_dir = ConfigManager::config_dir().unwrap();
        assert!(config_dir.to_string_lossy().contains("report-publisher"));

        let config_file = ConfigManager::config_file_path().unwrap();
        assert!(config_file.to_string_lossy().ends_with("config.toml"));

        let log = ConfigManager::log_file_path().unwrap();
        assert!(log.to_string_lossy().contains("report-publisher.log"));

        let repo = ConfigManager::default_repo_dir().unwrap();
        assert!(repo.ends_with("repo"));
    }

    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn test_xdg_config_home_respected() {
        let original = std::env::var("XDG_CONFIG_HOME").ok();
        std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-xdg-config");
        let config_dir = ConfigManager::config_dir().unwrap();
        assert_eq!(
            config_dir,
            PathBuf::from("/tmp/test-xdg-config/report-publisher")
        );
        match original {
            Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = PublishSettings::load(&temp.path().join("absent.toml")).unwrap();

        assert!(!settings.enabled);
        assert_eq!(settings.branch, "main");
        assert!(settings.commit_message.contains("{date}"));
        assert!(settings.allow_force_push);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "enabled = true\nremote_url = \"git@github.com:u/r.git\"\nlocal_path = \"/tmp/wc\"\n",
        )
        .unwrap();

        let settings = PublishSettings::load(&path).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.remote_url, "git@github.com:u/r.git");
        assert_eq!(settings.local_path, PathBuf::from("/tmp/wc"));
        assert_eq!(settings.branch, "main");
        assert!(settings.token.is_none());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "enabled = [not toml").unwrap();

        let err = PublishSettings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let settings = PublishSettings {
            enabled: true,
            remote_url: "https://example.com/u/r.git".to_string(),
            branch: "reports".to_string(),
            ..Default::default()
        };

        settings.save(&path).unwrap();
        let loaded = PublishSettings::load(&path).unwrap();
        assert_eq!(loaded.remote_url, settings.remote_url);
        assert_eq!(loaded.branch, "reports");
    }

    #[test]
    fn test_masked_hides_token() {
        let settings = PublishSettings {
            token: Some("secret".to_string()),
            ..Default::default()
        };
        assert_eq!(settings.masked().token.as_deref(), Some("***"));
        assert_eq!(PublishSettings::default().masked().token, None);
    }
}
