//! # report-publisher
//!
//! Publishes generated report files to a remote Git repository.
//!
//! ## Overview
//!
//! `report-publisher` keeps a local working copy of a remote repository,
//! copies report artifacts into its `posts/` directory, rewrites a
//! `README.md` index of the most recent reports, commits, and pushes. The
//! push does not give up on the first rejection: it walks a fixed chain of
//! reconciliation strategies (rebase pull, merge pull, fetch and merge) and
//! push variants (plain, set-upstream, force with lease) until one lands or
//! every applicable strategy has been tried.
//!
//! All interaction with git happens by running the `git` executable through
//! the [`scm::CommandExecutor`] trait, so every stage can be tested against a
//! scripted executor.
//!
//! ## Architecture
//!
//! - Configuration ([`config`], [`repo_config`]) and errors ([`error`])
//! - Running git ([`scm`])
//! - Working copy preparation ([`repository`])
//! - Placing artifacts and the index ([`publish`])
//! - Committing ([`commit`])
//! - Reconciliation and push, and the full pipeline ([`sync`])
//! - Output ([`report`], [`logger`])
//!
//! ## Example
//!
//! ```no_run
//! use report_publisher::config::PublishSettings;
//! use report_publisher::repo_config::RepositoryConfig;
//! use report_publisher::scm::GitCli;
//! use report_publisher::sync::PublishPipeline;
//!
//! # fn main() -> anyhow::Result<()> {
//! let settings = PublishSettings {
//!     enabled: true,
//!     remote_url: "https://github.com/acme/reports.git".to_string(),
//!     token: std::env::var("REPORT_PUBLISHER_TOKEN").ok(),
//!     ..Default::default()
//! };
//! let config = RepositoryConfig::new(settings)?;
//! let git = GitCli::new();
//!
//! let report = PublishPipeline::new(&config, &git).publish(&["output/report.md"])?;
//! println!("{}", report.to_json()?);
//! # Ok(())
//! # }
//! ```

/// Platform-agnostic configuration directory and the `config.toml` settings.
///
/// Locates configuration files following platform conventions (XDG on Linux,
/// Application Support on macOS, AppData on Windows).
pub mod config;

/// Validated, immutable repository configuration derived from the settings.
///
/// Also builds the authenticated remote URL and masks the token in any
/// text that may reach a log or a report.
pub mod repo_config;

/// Error types shared by every stage of the pipeline.
pub mod error;

/// Running the `git` executable.
pub mod scm;

/// Clone, refresh, and recovery of the local working copy.
pub mod repository;

/// Copying artifacts into the working copy and regenerating its index.
pub mod publish;

/// Staging and committing pending changes.
pub mod commit;

/// Reconciling with the remote and pushing through the fallback chain.
///
/// Also hosts [`sync::PublishPipeline`], which runs a whole publish cycle.
pub mod sync;

/// Summary of a publish cycle, for the console or as JSON.
pub mod report;

/// Logging configuration and utilities.
///
/// Sets up console logging (level from the command line or `RUST_LOG`) and
/// a persistent log file in the config directory, rotated when it grows
/// past 10MB.
pub mod logger;
