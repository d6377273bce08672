use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::LevelFilter;
use std::path::PathBuf;

use report_publisher::config::{ConfigManager, PublishSettings};
use report_publisher::error::PublishError;
use report_publisher::logger;
use report_publisher::repo_config::RepositoryConfig;
use report_publisher::scm::GitCli;
use report_publisher::sync::PublishPipeline;

#[derive(Parser)]
#[command(name = "report-publisher")]
#[command(about = "Publish generated reports to a remote git repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (default: config.toml in the config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Access token for HTTPS remotes; overrides the settings file
    #[arg(long, env = "REPORT_PUBLISHER_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Log every git command (tokens are masked)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy report files into the repository, commit, and push
    Publish {
        /// Report files to publish
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the publish report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate settings and prepare the working copy without publishing
    Check,

    /// Regenerate the README index of the working copy without committing
    Index,

    /// Show or initialize the settings file
    Config {
        /// Print the effective settings (token masked)
        #[arg(long)]
        show: bool,

        /// Write a default settings file if none exists
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

impl Cli {
    fn verbosity(&self) -> Option<LevelFilter> {
        if self.verbose {
            Some(LevelFilter::Debug)
        } else if self.quiet {
            Some(LevelFilter::Warn)
        } else {
            None
        }
    }

    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => ConfigManager::config_file_path(),
        }
    }

    fn load_settings(&self) -> Result<PublishSettings> {
        let path = self.config_path()?;
        let mut settings = PublishSettings::load(&path)?;
        if let Some(token) = &self.token {
            settings.token = Some(token.clone());
        }
        Ok(settings)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logger(cli.verbosity())?;

    match &cli.command {
        Commands::Publish { files, json } => {
            let config = RepositoryConfig::new(cli.load_settings()?)?;
            let git = require_git()?;

            let report = match PublishPipeline::new(&config, &git).publish(files) {
                Ok(report) => report,
                Err(e) => {
                    logger::log_to_file(&format!("Publish failed: {e}"))?;
                    return Err(explain(e));
                }
            };

            logger::log_to_file(&format!(
                "Published {} artifact(s) to {}, pushed: {}",
                report.published.len(),
                report.branch,
                report.pushed()
            ))?;

            if *json {
                println!("{}", report.to_json()?);
            } else {
                report.print();
            }
        }
        Commands::Check => {
            let config = RepositoryConfig::new(cli.load_settings()?)?;
            let git = require_git()?;

            let state = PublishPipeline::new(&config, &git)
                .check_connection()
                .map_err(explain)?;
            println!(
                "{} {} ({:?})",
                "✓".green(),
                config.local_path().display(),
                state
            );
        }
        Commands::Index => {
            let config = RepositoryConfig::new(cli.load_settings()?)?;
            match PublishPipeline::new(&config, &GitCli::new())
                .regenerate_index()
                .map_err(explain)?
            {
                Some(path) => println!("{} Updated {}", "✓".green(), path.display()),
                None => println!(
                    "{} Nothing to index in {}",
                    "Note:".yellow(),
                    config.local_path().display()
                ),
            }
        }
        Commands::Config { show, init } => {
            let path = cli.config_path()?;
            if *init {
                if path.exists() {
                    bail!("Config file already exists: {}", path.display());
                }
                PublishSettings::default().save(&path)?;
                println!("{} Wrote {}", "✓".green(), path.display());
            } else if *show {
                let settings = cli.load_settings()?.masked();
                let text = toml::to_string_pretty(&settings)
                    .context("Failed to serialize config")?;
                println!("{}", format!("# {}", path.display()).dimmed());
                print!("{text}");
            } else {
                println!("Config file: {}", path.display());
                println!("Use --show to print it or --init to create it");
            }
        }
    }

    Ok(())
}

fn require_git() -> Result<GitCli> {
    let git = GitCli::new();
    if !git.is_available() {
        bail!("git executable not found in PATH");
    }
    Ok(git)
}

/// Print a hint for errors the user can fix from the settings file.
fn explain(err: PublishError) -> anyhow::Error {
    let hint = match &err {
        PublishError::Disabled => Some("set `enabled = true` in the settings file"),
        PublishError::Config(_) => Some("run `report-publisher config --show` to inspect settings"),
        _ => None,
    };
    if let Some(hint) = hint {
        eprintln!("{} {}", "hint:".yellow(), hint);
    }
    anyhow::Error::new(err)
}
