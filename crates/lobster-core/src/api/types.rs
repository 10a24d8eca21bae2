use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::world::{Avatar, License, Wallet, WorldState, lenient_amounts, lenient_int};

/// Renders a loosely typed server value without JSON quoting.
pub fn value_label(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub agent_type: String,
    pub agent_version: String,
    pub public_key: String,
    pub requested_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub api_key: String,
    pub bot_id: String,
    pub signer_id: String,
    #[serde(default)]
    pub assigned_license: Value,
    #[serde(default)]
    pub welcome_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub bot_id: String,
    #[serde(default)]
    pub assigned_avatar: Avatar,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub ws_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotStats {
    pub quests_completed: i64,
    pub tokens_earned: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub bot_id: String,
    #[serde(default)]
    pub registered: bool,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub license: License,
    #[serde(default)]
    pub avatar: Option<Avatar>,
    #[serde(default)]
    pub wallet: Wallet,
    #[serde(default)]
    pub stats: Option<BotStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fantasy: String,
    #[serde(default)]
    pub real_work: String,
    #[serde(default)]
    pub school: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StallsResponse {
    pub stalls: Vec<Stall>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArtifactSpec {
    pub required: bool,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SkillInstructions {
    pub version: Value,
    pub description: String,
    pub artifact_format: BTreeMap<String, ArtifactSpec>,
    pub checklist: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StallInfo {
    pub stall_name: String,
    #[serde(default)]
    pub fantasy: String,
    #[serde(default)]
    pub real_work: String,
    #[serde(default)]
    pub skill_instructions: Option<SkillInstructions>,
    #[serde(default)]
    pub available_quests: Vec<Quest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Quest {
    pub quest_id: String,
    pub title: String,
    pub stall: String,
    #[serde(default)]
    pub escrow_cc: i64,
    #[serde(default)]
    pub reward_tokens: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub deadline: Value,
    #[serde(default)]
    pub description: String,
}

impl Quest {
    pub fn reward_label(&self) -> String {
        if self.reward_tokens.is_empty() {
            format!("{} CC", self.escrow_cc)
        } else {
            format!("{} CC + {}", self.escrow_cc, self.reward_tokens.join(", "))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestsResponse {
    #[serde(default)]
    pub quests: Vec<Quest>,
}

/// Query parameters for the quest listing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuestFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stall: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// What an artifact holds, going by its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Documentation,
    Code,
    Data,
    Text,
}

impl ArtifactKind {
    pub fn from_file_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("md") => ArtifactKind::Documentation,
            Some("js" | "ts" | "py" | "rs" | "go" | "patch" | "diff") => ArtifactKind::Code,
            Some("json") => ArtifactKind::Data,
            _ => ArtifactKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub name: String,
    pub content: String,
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
}

impl Artifact {
    /// Builds an artifact, hashing `content` as `sha256:<hex>` and inferring
    /// its kind from `name`.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let content = content.into();
        let digest = Sha256::digest(content.as_bytes());
        let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        Self {
            kind: ArtifactKind::from_file_name(&name),
            name,
            content,
            hash: format!("sha256:{hex}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub quest_id: String,
    pub artifacts: Vec<Artifact>,
    pub claims: Vec<String>,
    pub requested_tokens: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationJob {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub pay_cc: i64,
    #[serde(default)]
    pub stake_cc: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub submission_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub verification_jobs: Vec<VerificationJob>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A proposed change to a stall's skill instructions.
#[derive(Debug, Clone, Serialize)]
pub struct ImprovementRequest {
    pub stall_id: String,
    /// Free-form category such as `DOCUMENTATION`.
    pub improvement_type: String,
    pub description: String,
    pub artifacts: Vec<Artifact>,
    pub claims: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImprovementResponse {
    pub improvement_id: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorldStateResponse {
    pub state: WorldState,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletStats {
    pub verified_works: i64,
    pub correct_verifications: i64,
    pub total_verifications: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletResponse {
    #[serde(deserialize_with = "lenient_int")]
    pub cc: i64,
    #[serde(deserialize_with = "lenient_amounts")]
    pub tokens: BTreeMap<String, i64>,
    #[serde(deserialize_with = "lenient_amounts")]
    pub seals: BTreeMap<String, i64>,
    pub stats: WalletStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskResponse {
    #[serde(deserialize_with = "lenient_int")]
    pub earned_cc: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub balance: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CraftResponse {
    #[serde(default)]
    pub crafted: Value,
    #[serde(default)]
    pub cost: Value,
    #[serde(default)]
    pub balance: Wallet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpgradeResponse {
    pub new_license: License,
    #[serde(default)]
    pub balance: Wallet,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BasicTask {
    pub reward: i64,
    pub cooldown_hours: Option<f64>,
    pub once: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StallCost {
    pub entry: Option<i64>,
    #[serde(rename = "use")]
    pub use_cost: Option<i64>,
    pub stake: Option<i64>,
    pub fee_pct: Option<f64>,
}

impl StallCost {
    /// `"entry: 5 CC, fee: 2.5%"`, or `FREE` when nothing is charged.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        let charged = |value: Option<i64>| value.filter(|amount| *amount != 0);
        if let Some(entry) = charged(self.entry) {
            parts.push(format!("entry: {entry} CC"));
        }
        if let Some(use_cost) = charged(self.use_cost) {
            parts.push(format!("use: {use_cost} CC"));
        }
        if let Some(stake) = charged(self.stake) {
            parts.push(format!("stake: {stake} CC"));
        }
        if let Some(fee) = self.fee_pct.filter(|fee| fee.abs() > f64::EPSILON) {
            parts.push(format!("fee: {fee}%"));
        }
        if parts.is_empty() {
            "FREE".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Recipe {
    pub inputs: BTreeMap<String, i64>,
    pub output: BTreeMap<String, i64>,
    pub fee: i64,
    pub min_license: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LicenseRequirement {
    pub verified_works: Option<i64>,
    pub cc: Option<i64>,
    pub silver_seals: Option<i64>,
    pub gold_seals: Option<i64>,
}

impl LicenseRequirement {
    pub fn summary(&self) -> String {
        let labels = [
            (self.verified_works, "verified works"),
            (self.cc, "CC"),
            (self.silver_seals, "Silver seals"),
            (self.gold_seals, "Gold seal"),
        ];
        let parts: Vec<String> = labels
            .iter()
            .filter_map(|(value, label)| {
                value
                    .filter(|amount| *amount != 0)
                    .map(|amount| format!("{amount} {label}"))
            })
            .collect();
        if parts.is_empty() {
            "Default".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EconomyResponse {
    pub basic_tasks: BTreeMap<String, BasicTask>,
    pub stall_costs: BTreeMap<String, StallCost>,
    pub recipes: BTreeMap<String, Recipe>,
    pub license_requirements: BTreeMap<String, LicenseRequirement>,
}

/// Verdict attached to a verification stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StampDecision {
    Pass,
    Fail,
    Abstain,
}

impl fmt::Display for StampDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StampDecision::Pass => "PASS",
            StampDecision::Fail => "FAIL",
            StampDecision::Abstain => "ABSTAIN",
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_artifact_hash_is_prefixed_sha256() {
        let artifact = Artifact::new("notes.md", "abc");
        assert_eq!(
            artifact.hash,
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_artifact_kind_follows_extension() {
        assert_eq!(ArtifactKind::from_file_name("README.MD"), ArtifactKind::Documentation);
        assert_eq!(ArtifactKind::from_file_name("fix.patch"), ArtifactKind::Code);
        assert_eq!(ArtifactKind::from_file_name("main.rs"), ArtifactKind::Code);
        assert_eq!(ArtifactKind::from_file_name("report.json"), ArtifactKind::Data);
        assert_eq!(ArtifactKind::from_file_name("notes.txt"), ArtifactKind::Text);
        assert_eq!(ArtifactKind::from_file_name("Makefile"), ArtifactKind::Text);

        let value = serde_json::to_value(Artifact::new("plan.md", "x")).unwrap();
        assert_eq!(value["type"], "documentation");
    }

    #[test]
    fn test_submit_request_sends_null_tokens_when_absent() {
        let request = SubmitRequest {
            quest_id: "q1".to_string(),
            artifacts: vec![],
            claims: vec!["works".to_string()],
            requested_tokens: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["requested_tokens"], Value::Null);
        assert_eq!(value["claims"], json!(["works"]));
    }

    #[test]
    fn test_stall_cost_summary() {
        let free: StallCost = serde_json::from_value(json!({})).unwrap();
        assert_eq!(free.summary(), "FREE");

        let paid: StallCost =
            serde_json::from_value(json!({"entry": 5, "use": 0, "fee_pct": 2.5})).unwrap();
        assert_eq!(paid.summary(), "entry: 5 CC, fee: 2.5%");
    }

    #[test]
    fn test_license_requirement_summary() {
        let req: LicenseRequirement =
            serde_json::from_value(json!({"verified_works": 3, "cc": 100})).unwrap();
        assert_eq!(req.summary(), "3 verified works, 100 CC");
        assert_eq!(LicenseRequirement::default().summary(), "Default");
    }

    #[test]
    fn test_value_label_strips_quotes() {
        assert_eq!(value_label(&json!("2026-01-01")), "2026-01-01");
        assert_eq!(value_label(&json!(3)), "3");
        assert_eq!(value_label(&Value::Null), "-");
    }
}
