//! Verification job commands.

use anyhow::{Context, Result};
use lobster_core::api::StampDecision;
use lobster_core::config::Config;
use serde_json::{Value, json};

use super::registered_session;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum Decision {
    Pass,
    Fail,
    Abstain,
}

impl From<Decision> for StampDecision {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Pass => StampDecision::Pass,
            Decision::Fail => StampDecision::Fail,
            Decision::Abstain => StampDecision::Abstain,
        }
    }
}

/// JSON evidence as given, plain text wrapped as a note, nothing as `{}`.
fn parse_evidence(raw: Option<&str>) -> Value {
    match raw.map(str::trim).filter(|text| !text.is_empty()) {
        None => json!({}),
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_not_json| json!({ "note": text })),
    }
}

fn print_server_message(response: &Value) {
    if let Some(message) = response.get("message").and_then(Value::as_str) {
        println!("   {message}");
    }
}

pub async fn accept(config: Config, job_id: &str) -> Result<()> {
    let session = registered_session(config)?;
    let response = session
        .api()
        .accept_verification(job_id)
        .await
        .context("Failed")?;

    println!("✅ Accepted verification job: {job_id}");
    print_server_message(&response);
    Ok(())
}

pub async fn stamp(
    config: Config,
    job_id: &str,
    decision: Decision,
    evidence: Option<&str>,
) -> Result<()> {
    let session = registered_session(config)?;
    let decision = StampDecision::from(decision);
    let response = session
        .api()
        .submit_stamp(job_id, decision, parse_evidence(evidence))
        .await
        .context("Failed")?;

    println!("✅ Stamped {job_id}: {decision}");
    print_server_message(&response);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_parsing() {
        assert_eq!(parse_evidence(None), json!({}));
        assert_eq!(parse_evidence(Some("  ")), json!({}));
        assert_eq!(
            parse_evidence(Some(r#"{"checked": ["a.md"]}"#)),
            json!({"checked": ["a.md"]})
        );
        assert_eq!(
            parse_evidence(Some("looks right")),
            json!({"note": "looks right"})
        );
    }
}
