//! Local working copy lifecycle.
//!
//! The working copy at `local_path` is disposable state, not a source of
//! truth: recovery hard-resets it to the remote or deletes and re-clones it.
//! Anything stored there that is not on the remote may be destroyed.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{PublishError, PublishResult};
use crate::scm::{is_repo, GitSession};

/// How the working copy was brought up to date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkingCopyState {
    /// Existing copy, pulled cleanly.
    Pulled,
    /// Existing copy whose pull failed; reset to the remote branch tip.
    ResetToRemote,
    /// Fresh clone of the target branch.
    Cloned,
    /// Fresh clone of the default branch, target branch created locally.
    ClonedNewBranch,
}

/// Ensures a usable, branch-checked-out working copy exists.
pub struct RepositoryManager<'a> {
    git: GitSession<'a>,
}

impl<'a> RepositoryManager<'a> {
    pub fn new(git: GitSession<'a>) -> Self {
        RepositoryManager { git }
    }

    /// Reuse and refresh the working copy, or (re-)create it by cloning.
    ///
    /// An existing copy that cannot be brought onto the remote branch tip is
    /// discarded and cloned again; only when that also fails is the cycle
    /// aborted with [`PublishError::WorkingCopy`].
    pub fn ensure_working_copy(&self) -> PublishResult<WorkingCopyState> {
        let config = self.git.config();
        if !config.enabled() {
            return Err(PublishError::Disabled);
        }

        let state = if is_repo(config.local_path()) {
            log::info!("Using existing working copy at {}", config.local_path().display());
            match self.refresh() {
                Ok(state) => state,
                Err(refresh) => {
                    log::warn!("Working copy could not be refreshed, cloning again: {}", refresh);
                    self.clone_fresh().map_err(|e| match e {
                        PublishError::WorkingCopy { diagnostic } => PublishError::WorkingCopy {
                            diagnostic: format!("{refresh}\n{diagnostic}"),
                        },
                        other => other,
                    })?
                }
            }
        } else {
            self.clone_fresh()?
        };

        self.ensure_identity();
        Ok(state)
    }

    /// Bring an existing copy onto the remote tip of the configured branch.
    ///
    /// Returns the combined diagnostics when that is not possible.
    fn refresh(&self) -> Result<WorkingCopyState, String> {
        let config = self.git.config();
        let branch = config.branch();
        let auth_url = config.authenticated_url();

        self.checkout_branch()?;

        let pull = self.git.run(&["pull", &auth_url, branch]);
        if pull.success {
            return Ok(WorkingCopyState::Pulled);
        }
        log::warn!("Pull of {} failed, resetting to remote: {}", branch, pull.output);

        // Resetting to a tracking ref that was not just fetched would discard
        // local commits against stale information.
        let refspec = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
        let fetch = self.git.run(&["fetch", &auth_url, &refspec]);
        if !fetch.success {
            return Err(join_diagnostics(&[pull.output, fetch.output]));
        }

        let tracking = format!("origin/{branch}");
        let reset = self.git.run(&["reset", "--hard", &tracking]);
        if reset.success {
            Ok(WorkingCopyState::ResetToRemote)
        } else {
            Err(join_diagnostics(&[pull.output, reset.output]))
        }
    }

    /// Switch to the configured branch if the copy is on another one.
    fn checkout_branch(&self) -> Result<(), String> {
        let branch = self.git.config().branch();
        let head = self.git.run(&["rev-parse", "--abbrev-ref", "HEAD"]);
        if head.success && head.output.trim() == branch {
            return Ok(());
        }

        log::warn!("Working copy is on '{}', switching to {}", head.output.trim(), branch);
        // Picks up a local branch or creates one from origin/<branch>.
        let checkout = self.git.run(&["checkout", "-f", branch]);
        if checkout.success {
            Ok(())
        } else {
            Err(checkout.output)
        }
    }

    fn clone_fresh(&self) -> PublishResult<WorkingCopyState> {
        let config = self.git.config();
        let local_path = config.local_path();
        let branch = config.branch();

        if local_path.exists() {
            log::warn!("Removing invalid working copy at {}", local_path.display());
            remove_path(local_path).map_err(|e| PublishError::io(local_path, e))?;
        }

        let parent = local_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(parent).map_err(|e| PublishError::io(parent, e))?;

        let target = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PublishError::WorkingCopy {
                diagnostic: format!("{} has no directory name", local_path.display()),
            })?;

        log::info!("Cloning {} into {}", config.remote_url(), local_path.display());
        let auth_url = config.authenticated_url();

        let first = self
            .git
            .run_in(parent, &["clone", "-b", branch, &auth_url, &target]);
        let state = if first.success {
            WorkingCopyState::Cloned
        } else {
            log::warn!("Branch {} could not be cloned, creating it: {}", branch, first.output);
            if local_path.exists() {
                remove_path(local_path).map_err(|e| PublishError::io(local_path, e))?;
            }

            let second = self.git.run_in(parent, &["clone", &auth_url, &target]);
            if !second.success {
                return Err(PublishError::WorkingCopy {
                    diagnostic: format!("{}\n{}", first.output, second.output),
                });
            }

            let create = self.git.run(&["checkout", "-b", branch]);
            if !create.success {
                // The default branch may already be the target branch.
                self.git
                    .run_checked(&["checkout", branch])
                    .map_err(|e| PublishError::WorkingCopy {
                        diagnostic: format!("{}\n{}", create.output, e),
                    })?;
            }
            WorkingCopyState::ClonedNewBranch
        };

        if !is_repo(local_path) {
            return Err(PublishError::WorkingCopy {
                diagnostic: format!("clone left no repository at {}", local_path.display()),
            });
        }

        // The clone recorded the authenticated URL as origin; keep the token out of .git/config.
        let scrub = self.git.run(&["remote", "set-url", "origin", config.remote_url()]);
        if !scrub.success {
            log::warn!("Failed to reset origin URL: {}", scrub.output);
        }

        Ok(state)
    }

    /// Configure a committer locally if git has none, so unattended commits work.
    fn ensure_identity(&self) {
        if self.git.run(&["config", "user.email"]).success {
            return;
        }

        let config = self.git.config();
        log::debug!("No git identity configured, using {}", config.author_email());
        for (key, value) in [
            ("user.name", config.author_name()),
            ("user.email", config.author_email()),
        ] {
            let out = self.git.run(&["config", key, value]);
            if !out.success {
                log::warn!("Failed to set {}: {}", key, out.output);
            }
        }
    }
}

fn join_diagnostics(parts: &[String]) -> String {
    parts
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

/// Delete a file or directory tree, retrying with relaxed permissions.
fn remove_path(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if !meta.is_dir() {
        return fs::remove_file(path);
    }

    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::warn!("Removal of {} failed ({}), forcing", path.display(), e);
            for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
                make_writable(entry.path());
            }
            fs::remove_dir_all(path)
        }
    }
}

#[cfg(unix)]
fn make_writable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(meta) = fs::symlink_metadata(path) {
        if meta.file_type().is_symlink() {
            return;
        }
        let mut perms = meta.permissions();
        perms.set_mode(perms.mode() | 0o700);
        let _ = fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) {
    if let Ok(meta) = fs::symlink_metadata(path) {
        let mut perms = meta.permissions();
        perms.set_readonly(false);
        let _ = fs::set_permissions(path, perms);
    }
}
