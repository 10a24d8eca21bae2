use lobster_core::Result;
use tracing::{info, warn};

use super::Session;

const TUTORIAL_TASK: &str = "tutorial";

/// What happened to the one-time tutorial during bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TutorialOutcome {
    /// The wallet already held currency.
    NotNeeded,
    Completed { earned_cc: i64, balance: i64 },
    /// The balance could not be read, so the tutorial was not attempted.
    Skipped(String),
    Failed(String),
}

/// Summary of an [`Session::ensure_connected`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub registered_now: bool,
    pub live: bool,
    /// Why the live channel is unavailable, when it is.
    pub live_error: Option<String>,
    pub tutorial: TutorialOutcome,
}

impl Session {
    /// Takes the session from whatever state it is in to authenticated, and live
    /// when possible.
    ///
    /// Registration and authentication failures are returned. A live channel
    /// failure is recorded in the report and the session continues over REST.
    pub async fn ensure_connected(&mut self, name: &str) -> Result<BootstrapReport> {
        let mut registered_now = false;
        if self.identity.is_none() && self.load_identity()?.is_none() {
            info!(%name, "no stored identity, registering");
            self.register(name).await?;
            registered_now = true;
        }

        self.authenticate().await?;

        let live_error = match self.connect_live().await {
            Ok(()) => None,
            Err(err) => {
                warn!(error = %err, "continuing without live channel");
                Some(err.to_string())
            }
        };

        let tutorial = self.complete_tutorial_if_unfunded().await;

        Ok(BootstrapReport {
            registered_now,
            live: self.is_live(),
            live_error,
            tutorial,
        })
    }

    /// Reads the balance from the server, never the mirror, before spending a task.
    async fn complete_tutorial_if_unfunded(&self) -> TutorialOutcome {
        let status = match self.refresh_status().await {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, "status unavailable, skipping tutorial check");
                return TutorialOutcome::Skipped(err.to_string());
            }
        };
        if status.wallet.cc != 0 {
            return TutorialOutcome::NotNeeded;
        }

        info!("wallet empty, completing tutorial");
        match self.complete_task(TUTORIAL_TASK).await {
            Ok(task) => TutorialOutcome::Completed {
                earned_cc: task.earned_cc,
                balance: task.balance,
            },
            Err(err) => {
                warn!(error = %err, "tutorial task failed");
                TutorialOutcome::Failed(err.to_string())
            }
        }
    }
}
