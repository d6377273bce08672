//! Copying generated artifacts into the working copy.

mod index;

pub use index::{render_index, IndexEntry, INDEX_FILE, INDEX_LIMIT};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PublishError, PublishResult};
use crate::repo_config::RepositoryConfig;

/// Subdirectory of the working copy that receives artifacts.
pub const PUBLISH_DIR: &str = "posts";

/// A source file and where it lands inside the working copy.
///
/// Only the base name is kept; directory structure is flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Destination relative to the working copy root, `/`-separated.
    pub relative: String,
}

impl ArtifactFile {
    /// `None` if `source` has no file name (e.g. `..`).
    pub fn new(source: &Path, working_copy: &Path) -> Option<Self> {
        let name = source.file_name()?.to_string_lossy().into_owned();
        Some(ArtifactFile {
            source: source.to_path_buf(),
            destination: working_copy.join(PUBLISH_DIR).join(&name),
            relative: format!("{PUBLISH_DIR}/{name}"),
        })
    }
}

/// Places artifacts under `posts/` and keeps the index document current.
pub struct ContentPublisher<'a> {
    config: &'a RepositoryConfig,
}

impl<'a> ContentPublisher<'a> {
    pub fn new(config: &'a RepositoryConfig) -> Self {
        ContentPublisher { config }
    }

    fn publish_dir(&self) -> PathBuf {
        self.config.local_path().join(PUBLISH_DIR)
    }

    /// Copy every existing artifact into the publish directory.
    ///
    /// Missing sources are skipped with a warning. Returns the published
    /// paths relative to the working copy, in request order.
    pub fn publish<P: AsRef<Path>>(&self, artifacts: &[P]) -> PublishResult<Vec<String>> {
        if !self.config.enabled() {
            return Err(PublishError::Disabled);
        }

        let mut published = Vec::new();
        let mut seen = BTreeSet::new();

        for source in artifacts {
            let source = source.as_ref();
            if !source.is_file() {
                log::warn!("Artifact not found, skipping: {}", source.display());
                continue;
            }
            let Some(artifact) = ArtifactFile::new(source, self.config.local_path()) else {
                log::warn!("Artifact has no file name, skipping: {}", source.display());
                continue;
            };

            let dir = self.publish_dir();
            fs::create_dir_all(&dir).map_err(|e| PublishError::io(&dir, e))?;
            if is_same_file(&artifact.source, &artifact.destination) {
                // Copying a file onto itself truncates it.
                log::info!("Already in place: {}", artifact.destination.display());
            } else {
                fs::copy(&artifact.source, &artifact.destination)
                    .map_err(|e| PublishError::io(&artifact.destination, e))?;
                log::info!(
                    "Copied {} -> {}",
                    artifact.source.display(),
                    artifact.destination.display()
                );
            }

            if seen.insert(artifact.relative.clone()) {
                published.push(artifact.relative);
            }
        }

        Ok(published)
    }

    /// Rewrite the index document from the current contents of `posts/`.
    ///
    /// Returns the index path, or `None` when there is no publish directory yet.
    pub fn regenerate_index(&self) -> PublishResult<Option<PathBuf>> {
        if !self.config.enabled() {
            return Err(PublishError::Disabled);
        }

        let dir = self.publish_dir();
        if !dir.is_dir() {
            return Ok(None);
        }

        let entries = index::collect_entries(&dir)?;
        let index_path = self.config.local_path().join(INDEX_FILE);
        fs::write(&index_path, render_index(&entries))
            .map_err(|e| PublishError::io(&index_path, e))?;

        log::info!("Updated index {} ({} entries)", INDEX_FILE, entries.len());
        Ok(Some(index_path))
    }
}

/// True if both paths resolve to the same existing file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublishSettings;
    use tempfile::TempDir;

    fn config(local_path: PathBuf, enabled: bool) -> RepositoryConfig {
        RepositoryConfig::new(PublishSettings {
            enabled,
            remote_url: "git@github.com:u/r.git".to_string(),
            local_path,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_artifact_destination_is_flattened() {
        let artifact = ArtifactFile::new(
            Path::new("output/markdown/2024/report_2024-01-01.md"),
            Path::new("/wc"),
        )
        .unwrap();

        assert_eq!(artifact.destination, PathBuf::from("/wc/posts/report_2024-01-01.md"));
        assert_eq!(artifact.relative, "posts/report_2024-01-01.md");
        assert!(ArtifactFile::new(Path::new(".."), Path::new("/wc")).is_none());
    }

    #[test]
    fn test_publish_copies_and_skips_missing() {
        let src = TempDir::new().unwrap();
        let wc = TempDir::new().unwrap();
        let report = src.path().join("report_2024-01-01.md");
        fs::write(&report, "# Daily report\n\nbody\n").unwrap();

        let config = config(wc.path().to_path_buf(), true);
        let publisher = ContentPublisher::new(&config);
        let published = publisher
            .publish(&[report, src.path().join("missing.md")])
            .unwrap();

        assert_eq!(published, vec!["posts/report_2024-01-01.md".to_string()]);
        let copied = fs::read_to_string(wc.path().join("posts/report_2024-01-01.md")).unwrap();
        assert_eq!(copied, "# Daily report\n\nbody\n");
    }

    #[test]
    fn test_republishing_destination_keeps_content() {
        let src = TempDir::new().unwrap();
        let wc = TempDir::new().unwrap();
        let report = src.path().join("a.md");
        fs::write(&report, "# A content\n").unwrap();

        let config = config(wc.path().to_path_buf(), true);
        let publisher = ContentPublisher::new(&config);
        publisher.publish(&[&report]).unwrap();

        let in_place = wc.path().join(PUBLISH_DIR).join("a.md");
        let published = publisher.publish(&[&in_place]).unwrap();

        assert_eq!(published, vec!["posts/a.md".to_string()]);
        assert_eq!(fs::read_to_string(&in_place).unwrap(), "# A content\n");
    }

    #[test]
    fn test_publish_only_missing_returns_empty() {
        let wc = TempDir::new().unwrap();
        let config = config(wc.path().to_path_buf(), true);
        let publisher = ContentPublisher::new(&config);

        let published = publisher.publish(&[wc.path().join("absent.md")]).unwrap();
        assert!(published.is_empty());
        assert!(!wc.path().join(PUBLISH_DIR).exists());
    }

    #[test]
    fn test_disabled_publisher_touches_nothing() {
        let src = TempDir::new().unwrap();
        let wc = TempDir::new().unwrap();
        let report = src.path().join("r.md");
        fs::write(&report, "# r").unwrap();

        let config = config(wc.path().to_path_buf(), false);
        let publisher = ContentPublisher::new(&config);
        assert!(matches!(publisher.publish(&[report]), Err(PublishError::Disabled)));
        assert!(matches!(publisher.regenerate_index(), Err(PublishError::Disabled)));
        assert!(!wc.path().join(PUBLISH_DIR).exists());
    }

    #[test]
    fn test_regenerate_index_without_publish_dir() {
        let wc = TempDir::new().unwrap();
        let config = config(wc.path().to_path_buf(), true);
        let publisher = ContentPublisher::new(&config);
        assert_eq!(publisher.regenerate_index().unwrap(), None);
        assert!(!wc.path().join(INDEX_FILE).exists());
    }

    #[test]
    fn test_regenerate_index_is_idempotent() {
        let wc = TempDir::new().unwrap();
        let posts = wc.path().join(PUBLISH_DIR);
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join("report_2024-01-01.md"), "# New Year\n").unwrap();
        fs::write(posts.join("report_2024-01-02.md"), "## Second day\n").unwrap();

        let config = config(wc.path().to_path_buf(), true);
        let publisher = ContentPublisher::new(&config);
        let path = publisher.regenerate_index().unwrap().unwrap();
        let first = fs::read(&path).unwrap();
        publisher.regenerate_index().unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
        let text = String::from_utf8(first).unwrap();
        let newer = text.find("[Second day](posts/report_2024-01-02.md)").unwrap();
        let older = text.find("[New Year](posts/report_2024-01-01.md)").unwrap();
        assert!(newer < older);
    }
}
