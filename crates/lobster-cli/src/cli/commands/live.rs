//! Commands that drive the avatar over the live channel.

use std::time::Duration;

use anyhow::{Result, bail};
use lobster_agent::{BootstrapReport, Session, SessionEvent, TutorialOutcome, check_and_work};
use lobster_core::Error;
use lobster_core::config::Config;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::open_session;

/// Time the server gets to play out an action before we hang up.
const MOVE_SETTLE: Duration = Duration::from_secs(2);
const CELEBRATE_SETTLE: Duration = Duration::from_secs(3);

fn print_bootstrap(session: &Session, report: &BootstrapReport) {
    if report.registered_now
        && let Some(identity) = session.identity()
    {
        println!("🦞 Registered as: {}", identity.signer_id);
    }
    println!("✅ Authenticated");
    match &report.live_error {
        None if report.live => println!("✅ Live channel connected"),
        None => {}
        Some(err) => println!("⚠️  Live channel unavailable ({err}), continuing over REST"),
    }
    match &report.tutorial {
        TutorialOutcome::Completed { earned_cc, balance } => {
            println!("🎓 Tutorial completed: +{earned_cc} CC (balance {balance} CC)");
        }
        TutorialOutcome::Failed(err) => println!("⚠️  Tutorial failed: {err}"),
        TutorialOutcome::NotNeeded | TutorialOutcome::Skipped(_) => {}
    }
}

/// Bootstraps and insists on a live channel.
async fn live_session(config: Config, name: &str) -> Result<Session> {
    let mut session = open_session(config)?;
    let report = session.ensure_connected(name).await?;
    print_bootstrap(&session, &report);
    if !session.is_live() {
        let reason = report.live_error.unwrap_or_else(|| "unknown reason".to_string());
        return Err(anyhow::Error::new(Error::NotConnected)
            .context(format!("live channel unavailable: {reason}")));
    }
    Ok(session)
}

/// Prints one event. Returns `false` once the channel is gone.
fn report_event(event: &SessionEvent) -> bool {
    match event {
        SessionEvent::LiveAuthenticated => println!("✅ Live session authenticated"),
        SessionEvent::LiveRejected { reason } => {
            println!("❌ Live authentication rejected: {reason}");
        }
        SessionEvent::ActionFailed { action, error } => println!(
            "⚠️  {} failed: {}",
            action.as_deref().unwrap_or("action"),
            error.as_deref().unwrap_or("no reason given")
        ),
        SessionEvent::AvatarUpdate(update) => debug!(%update, "avatar update"),
        SessionEvent::Ledger(entry) => println!("📒 {entry}"),
        SessionEvent::ChannelClosed { reason } => {
            match reason {
                Some(reason) => println!("🔌 Live channel closed: {reason}"),
                None => println!("🔌 Live channel closed"),
            }
            return false;
        }
    }
    true
}

/// Streams session events until Enter, Ctrl-C or the channel closing.
async fn wait_for_exit(session: &Session) {
    let mut events = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _line = lines.next_line() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if !report_event(&event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "missed session events"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

pub async fn connect(config: Config, name: &str) -> Result<()> {
    let mut session = open_session(config)?;
    let report = session.ensure_connected(name).await?;
    print_bootstrap(&session, &report);

    match session.refresh_status().await {
        Ok(status) => {
            println!("\nBot: {}", status.bot_id);
            println!("License: {}", status.license.tier);
            println!("CC: {}", status.wallet.cc);
            if let Some(avatar) = &status.avatar {
                println!("Avatar: {avatar}");
            }
        }
        Err(err) => warn!(error = %err, "status unavailable"),
    }

    if session.is_live() {
        println!("\nPress Enter to disconnect...");
        wait_for_exit(&session).await;
        session.disconnect();
    }
    Ok(())
}

pub async fn work(config: Config, name: &str) -> Result<()> {
    let mut session = open_session(config)?;
    let outcome = check_and_work(&mut session, name).await?;
    println!("{outcome}");
    if !outcome.success {
        bail!("work cycle did not complete");
    }
    Ok(())
}

pub async fn move_to(config: Config, name: &str, x: i64, y: i64) -> Result<()> {
    let mut session = live_session(config, name).await?;
    session.move_to(x, y)?;
    println!("Moved to ({x}, {y})");
    tokio::time::sleep(MOVE_SETTLE).await;
    session.disconnect();
    Ok(())
}

pub async fn celebrate(config: Config, name: &str) -> Result<()> {
    let mut session = live_session(config, name).await?;
    session.celebrate()?;
    println!("🎉 Celebrating!");
    tokio::time::sleep(CELEBRATE_SETTLE).await;
    session.disconnect();
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_only_channel_close_stops_waiting() {
        assert!(report_event(&SessionEvent::LiveAuthenticated));
        assert!(report_event(&SessionEvent::Ledger(json!({"kind": "mint"}))));
        assert!(report_event(&SessionEvent::ActionFailed {
            action: Some("MOVE".to_string()),
            error: None,
        }));
        assert!(!report_event(&SessionEvent::ChannelClosed { reason: None }));
    }
}
