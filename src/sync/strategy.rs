//! Reconciliation strategies and the decision table that orders them.
//!
//! Strategies run from least to most destructive. [`next_action`] looks only
//! at the attempts made so far, so the whole escalation order is visible in
//! one place and can be tested without git.

use serde::Serialize;
use std::fmt;

/// Message for the merge commit created by [`Strategy::FetchMerge`].
pub const MERGE_MESSAGE: &str = "Merge remote changes";

/// One named step of the push fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// `pull --rebase`: replay local commits on top of the remote.
    RebasePull,
    /// `pull --no-rebase --allow-unrelated-histories`.
    MergePull,
    /// Fetch, then merge `FETCH_HEAD` explicitly.
    FetchMerge,
    Push,
    PushSetUpstream,
    /// Force push that aborts if the remote moved since we last fetched.
    ForcePushWithLease,
}

/// Reconciliation strategies, in the order they are tried.
pub const RECONCILE_CHAIN: [Strategy; 3] = [
    Strategy::RebasePull,
    Strategy::MergePull,
    Strategy::FetchMerge,
];

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::RebasePull => "rebase-pull",
            Strategy::MergePull => "merge-pull",
            Strategy::FetchMerge => "fetch-merge",
            Strategy::Push => "push",
            Strategy::PushSetUpstream => "push-set-upstream",
            Strategy::ForcePushWithLease => "force-push-with-lease",
        }
    }

    pub fn is_reconcile(self) -> bool {
        RECONCILE_CHAIN.contains(&self)
    }

    /// Argument vectors for this strategy, run in order until one fails.
    pub fn commands(self, auth_url: &str, branch: &str) -> Vec<Vec<String>> {
        let tracking = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
        let lease = format!("--force-with-lease={branch}:refs/remotes/origin/{branch}");

        let argv: Vec<Vec<&str>> = match self {
            Strategy::RebasePull => vec![vec!["pull", auth_url, branch, "--rebase"]],
            Strategy::MergePull => vec![vec![
                "pull",
                auth_url,
                branch,
                "--no-rebase",
                "--allow-unrelated-histories",
            ]],
            Strategy::FetchMerge => vec![
                vec!["fetch", auth_url, tracking.as_str()],
                vec![
                    "merge",
                    "FETCH_HEAD",
                    "--allow-unrelated-histories",
                    "-m",
                    MERGE_MESSAGE,
                ],
            ],
            Strategy::Push => vec![vec!["push", auth_url, branch]],
            Strategy::PushSetUpstream => vec![vec!["push", "--set-upstream", auth_url, branch]],
            Strategy::ForcePushWithLease => vec![vec!["push", auth_url, branch, lease.as_str()]],
        };

        argv.into_iter()
            .map(|args| args.into_iter().map(str::to_string).collect())
            .collect()
    }

    /// Command that clears a half-finished rebase or merge after failure.
    pub fn cleanup(self) -> Option<&'static [&'static str]> {
        match self {
            Strategy::RebasePull => Some(&["rebase", "--abort"]),
            Strategy::MergePull | Strategy::FetchMerge => Some(&["merge", "--abort"]),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transient record of one strategy run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushAttempt {
    pub strategy: Strategy,
    /// Command lines as run, credentials masked.
    pub commands: Vec<String>,
    pub succeeded: bool,
    /// Diagnostic text of the failing command; empty on success.
    pub diagnostic: String,
}

/// Ordered record of every strategy tried in one push cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttemptTrail(Vec<PushAttempt>);

impl AttemptTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, attempt: PushAttempt) {
        self.0.push(attempt);
    }

    pub fn attempts(&self) -> &[PushAttempt] {
        &self.0
    }

    pub fn last(&self) -> Option<&PushAttempt> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn strategies(&self) -> Vec<Strategy> {
        self.0.iter().map(|a| a.strategy).collect()
    }

    pub fn attempted(&self, strategy: Strategy) -> bool {
        self.0.iter().any(|a| a.strategy == strategy)
    }

    /// True if every reconciliation strategy was tried and none worked.
    pub fn reconciliation_exhausted(&self) -> bool {
        RECONCILE_CHAIN
            .iter()
            .all(|s| self.0.iter().any(|a| a.strategy == *s && !a.succeeded))
    }

    /// Attempts beyond the first-choice rebase pull and plain push.
    pub fn fallbacks(&self) -> usize {
        self.0
            .iter()
            .filter(|a| !matches!(a.strategy, Strategy::RebasePull | Strategy::Push))
            .count()
    }

    pub fn succeeded(&self) -> bool {
        self.last()
            .is_some_and(|a| a.succeeded && !a.strategy.is_reconcile())
    }
}

impl fmt::Display for AttemptTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attempt) in self.0.iter().enumerate() {
            let outcome = if attempt.succeeded { "ok" } else { "failed" };
            writeln!(f, "{}. {} [{}]", i + 1, attempt.strategy, outcome)?;
            for command in &attempt.commands {
                writeln!(f, "   $ {command}")?;
            }
            for line in attempt.diagnostic.lines() {
                writeln!(f, "   | {line}")?;
            }
        }
        Ok(())
    }
}

/// Why a push was refused, judged from its diagnostic text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushFailure {
    NoUpstream,
    /// Non-fast-forward or otherwise rejected because the remote is ahead.
    Rejected,
    Other,
}

pub fn classify_push_failure(diagnostic: &str) -> PushFailure {
    let text = diagnostic.to_lowercase();
    if text.contains("has no upstream branch") || text.contains("set-upstream") {
        PushFailure::NoUpstream
    } else if text.contains("non-fast-forward")
        || text.contains("rejected")
        || text.contains("fetch first")
    {
        PushFailure::Rejected
    } else {
        PushFailure::Other
    }
}

/// What the pusher does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    Run(Strategy),
    Succeed,
    Fail,
}

/// Decide the next step from the attempts made so far.
///
/// Every strategy runs at most once, so the chain always terminates.
pub fn next_action(trail: &AttemptTrail, allow_force_push: bool) -> NextAction {
    let Some(last) = trail.last() else {
        return NextAction::Run(RECONCILE_CHAIN[0]);
    };

    let action = match last.strategy {
        s if s.is_reconcile() => {
            if last.succeeded {
                NextAction::Run(Strategy::Push)
            } else {
                let next = RECONCILE_CHAIN
                    .iter()
                    .position(|c| *c == s)
                    .and_then(|i| RECONCILE_CHAIN.get(i + 1));
                match next {
                    Some(next) => NextAction::Run(*next),
                    // Exhausted; the push may still fast-forward.
                    None => NextAction::Run(Strategy::Push),
                }
            }
        }
        _ if last.succeeded => NextAction::Succeed,
        Strategy::Push | Strategy::PushSetUpstream => {
            match classify_push_failure(&last.diagnostic) {
                PushFailure::NoUpstream if last.strategy == Strategy::Push => {
                    NextAction::Run(Strategy::PushSetUpstream)
                }
                PushFailure::Rejected if allow_force_push => {
                    NextAction::Run(Strategy::ForcePushWithLease)
                }
                _ => NextAction::Fail,
            }
        }
        _ => NextAction::Fail,
    };

    match action {
        NextAction::Run(s) if trail.attempted(s) => NextAction::Fail,
        other => other,
    }
}
