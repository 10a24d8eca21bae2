//! Autonomous work cycle built on a [`Session`].

use std::fmt;

use lobster_core::Result;
use lobster_core::api::QuestFilter;
use lobster_core::world::LicenseTier;
use tracing::{info, warn};

use crate::frames::InteractTarget;
use crate::session::Session;

/// Tasks a visitor repeats while working toward a citizen license.
pub const VISITOR_TASKS: [&str; 2] = ["daily_checkin", "read_notices"];

const DEFAULT_POSITION: (i64, i64) = (10, 10);

/// Where the avatar should stand to work at `stall`.
pub fn stall_position(stall: &str) -> (i64, i64) {
    match stall {
        "forge_stall" => (10, 10),
        "archive_desk" => (20, 10),
        "stamp_desk" => (15, 15),
        "notice_board" => (5, 5),
        _ => DEFAULT_POSITION,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub success: bool,
    pub message: String,
}

impl CycleOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.success { "✅" } else { "❌" };
        write!(f, "{mark} {}", self.message)
    }
}

/// One pass: check status, pick a quest, walk to its stall and fetch instructions.
///
/// Movement only happens when the session is live; everything else goes over REST.
pub async fn run_cycle(session: &Session) -> CycleOutcome {
    info!("starting work cycle");

    let status = match session.refresh_status().await {
        Ok(status) => status,
        Err(err) => return CycleOutcome::failed(format!("Failed to get status: {err}")),
    };
    info!(
        tier = %status.license.tier,
        cc = status.wallet.cc,
        ore = status.wallet.token("ore"),
        "status"
    );

    if status.license.tier == LicenseTier::Visitor {
        for task in VISITOR_TASKS {
            if let Err(err) = session.complete_task(task).await {
                warn!(task, error = %err, "daily task failed");
            }
        }
        return CycleOutcome::ok("Completed daily tasks (working toward CITIZEN)");
    }

    let quest = match session.api().quests(&QuestFilter::default()).await {
        Ok(response) => match response.quests.into_iter().next() {
            Some(quest) => quest,
            None => return CycleOutcome::failed("No quests available"),
        },
        Err(err) => {
            warn!(error = %err, "quest listing failed");
            return CycleOutcome::failed("No quests available");
        }
    };
    info!(quest = %quest.title, stall = %quest.stall, "selected quest");

    if session.is_live() {
        let (x, y) = stall_position(&quest.stall);
        let pacing = session.config().action_pacing();
        if let Err(err) = session.move_to(x, y) {
            warn!(error = %err, "move failed");
        }
        tokio::time::sleep(pacing).await;
        if let Err(err) = session.interact(InteractTarget::Stall(quest.stall.clone())) {
            warn!(error = %err, "interact failed");
        }
        tokio::time::sleep(pacing).await;
    }

    match session.api().stall(&quest.stall).await {
        Ok(info) => {
            let description = info
                .skill_instructions
                .map(|instructions| instructions.description)
                .filter(|description| !description.is_empty())
                .unwrap_or_else(|| "N/A".to_string());
            info!(%description, "stall instructions");
        }
        Err(err) => warn!(error = %err, "stall instructions unavailable"),
    }

    CycleOutcome::ok(format!("Ready to work on: {}", quest.title))
}

/// Bootstrap, one work cycle, then disconnect.
pub async fn check_and_work(session: &mut Session, name: &str) -> Result<CycleOutcome> {
    session.ensure_connected(name).await?;
    let outcome = run_cycle(session).await;
    session.disconnect();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_stalls_have_positions() {
        assert_eq!(stall_position("forge_stall"), (10, 10));
        assert_eq!(stall_position("archive_desk"), (20, 10));
        assert_eq!(stall_position("stamp_desk"), (15, 15));
        assert_eq!(stall_position("notice_board"), (5, 5));
        assert_eq!(stall_position("somewhere_new"), (10, 10));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(CycleOutcome::ok("done").to_string(), "✅ done");
        assert_eq!(CycleOutcome::failed("nope").to_string(), "❌ nope");
    }
}
