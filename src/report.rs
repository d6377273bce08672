use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::commit::CommitOutcome;
use crate::repository::WorkingCopyState;
use crate::sync::AttemptTrail;

/// Outcome of one successful publish cycle.
///
/// Holds no credentials: commands in the attempt trail are already masked.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    /// RFC 3339 time the cycle finished
    pub timestamp: String,

    /// Branch that received the content
    pub branch: String,

    /// How the working copy was prepared
    pub working_copy: WorkingCopyState,

    /// Published paths relative to the working copy
    pub published: Vec<String>,

    /// Whether the index document was rewritten
    pub index_updated: bool,

    pub commit: CommitOutcome,

    /// Strategies tried while pushing. Runs even without a new commit, so
    /// commits left behind by an earlier failed push still go out.
    pub push: AttemptTrail,
}

impl PublishReport {
    /// True if the branch reached the remote.
    pub fn pushed(&self) -> bool {
        self.push.succeeded()
    }

    /// Strategies beyond the first rebase pull and plain push.
    pub fn fallbacks_used(&self) -> usize {
        self.push.fallbacks()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize publish report")
    }

    /// Print a human-readable summary to stdout
    pub fn print(&self) {
        println!("\n{}", "=== Publish Summary ===".bold().cyan());

        println!("  {} {}", "Working copy:".bold(), describe_state(&self.working_copy));

        println!("  {} {}", "Published:".bold(), self.published.len());
        for path in &self.published {
            println!("    {} {}", "+".green(), path);
        }

        match &self.commit {
            CommitOutcome::Committed { message } => {
                println!("  {} {}", "Committed:".bold(), message);
            }
            CommitOutcome::Unchanged => {
                println!("  {} No changes to commit", "Note:".yellow());
            }
        }

        println!("  {}", "Push attempts:".bold());
        for attempt in self.push.attempts() {
            let mark = if attempt.succeeded {
                "✓".green()
            } else {
                "✗".red()
            };
            println!("    {} {}", mark, attempt.strategy);
        }

        println!("\n{} {}", "Pushed to".green().bold(), self.branch.cyan());
    }
}

fn describe_state(state: &WorkingCopyState) -> String {
    match state {
        WorkingCopyState::Pulled => "pulled".to_string(),
        WorkingCopyState::ResetToRemote => "reset to remote".to_string(),
        WorkingCopyState::Cloned => "cloned".to_string(),
        WorkingCopyState::ClonedNewBranch => "cloned, branch created".to_string(),
    }
}
