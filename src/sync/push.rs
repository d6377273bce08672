use crate::error::{PublishError, PublishResult};
use crate::scm::GitSession;

use super::strategy::{next_action, AttemptTrail, NextAction, PushAttempt, Strategy};

/// Reconciles local commits with the remote, then pushes.
pub struct SyncPusher<'a> {
    git: GitSession<'a>,
}

impl<'a> SyncPusher<'a> {
    pub fn new(git: GitSession<'a>) -> Self {
        SyncPusher { git }
    }

    /// Walk the fallback chain until a push lands or no strategy is left.
    ///
    /// On failure the error carries every attempt, in order, with its
    /// diagnostic.
    pub fn sync_and_push(&self) -> PublishResult<AttemptTrail> {
        let config = self.git.config();
        if !config.enabled() {
            return Err(PublishError::Disabled);
        }

        let auth_url = config.authenticated_url();
        let mut trail = AttemptTrail::new();

        loop {
            match next_action(&trail, config.allow_force_push()) {
                NextAction::Run(strategy) => {
                    if strategy == Strategy::Push && trail.reconciliation_exhausted() {
                        log::warn!("Could not reconcile with remote, pushing anyway");
                    }
                    if strategy == Strategy::ForcePushWithLease {
                        log::warn!(
                            "Remote rejected the push; forcing with lease on {}",
                            config.branch()
                        );
                    }
                    let attempt = self.execute(strategy, &auth_url, config.branch());
                    trail.record(attempt);
                }
                NextAction::Succeed => {
                    log::info!("Pushed to {}", config.branch());
                    return Ok(trail);
                }
                NextAction::Fail => {
                    log::error!("Push to {} failed:\n{}", config.branch(), trail);
                    return Err(PublishError::PushFailed { attempts: trail });
                }
            }
        }
    }

    fn execute(&self, strategy: Strategy, auth_url: &str, branch: &str) -> PushAttempt {
        let mut commands = Vec::new();
        let mut diagnostic = String::new();
        let mut succeeded = true;

        for args in strategy.commands(auth_url, branch) {
            let argv: Vec<&str> = args.iter().map(String::as_str).collect();
            commands.push(self.git.display(&argv));

            let out = self.git.run(&argv);
            if !out.success {
                succeeded = false;
                diagnostic = out.output;
                break;
            }
        }

        if succeeded {
            log::info!("{} succeeded", strategy);
        } else {
            log::warn!("{} failed: {}", strategy, diagnostic);
            if let Some(cleanup) = strategy.cleanup() {
                commands.push(self.git.display(cleanup));
                // Fails harmlessly when nothing is in progress.
                self.git.run(cleanup);
            }
        }

        PushAttempt {
            strategy,
            commands,
            succeeded,
            diagnostic,
        }
    }
}
