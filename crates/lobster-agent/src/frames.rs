//! Live channel wire format.
//!
//! Every frame is a JSON text message tagged by `type`. Inbound kinds we do not
//! know decode to [`Inbound::Unknown`]; frames that are not JSON objects, or whose
//! known kind has the wrong shape, are rejected as malformed.

use lobster_core::world::{Avatar, License, Wallet, WorldState};
use lobster_core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};

/// Frames the agent sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outbound {
    BotAuth {
        #[serde(rename = "botId")]
        bot_id: String,
        token: String,
    },
    BotAction {
        action: ActionKind,
        payload: Value,
    },
}

impl Outbound {
    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| Error::Channel(format!("encode frame: {err}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Move,
    Interact,
    Read,
    AcceptQuest,
    Celebrate,
}

/// What an `INTERACT` targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractTarget {
    Stall(String),
    Building(String),
}

/// An intent the agent asks the server to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Move { x: i64, y: i64 },
    Interact(InteractTarget),
    ReadNotices,
    AcceptQuest(String),
    Celebrate,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Move { .. } => ActionKind::Move,
            Action::Interact(_) => ActionKind::Interact,
            Action::ReadNotices => ActionKind::Read,
            Action::AcceptQuest(_) => ActionKind::AcceptQuest,
            Action::Celebrate => ActionKind::Celebrate,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Action::Move { x, y } => json!({ "x": x, "y": y }),
            Action::Interact(InteractTarget::Stall(id)) => {
                json!({ "stallId": id, "buildingId": null })
            }
            Action::Interact(InteractTarget::Building(id)) => {
                json!({ "stallId": null, "buildingId": id })
            }
            Action::ReadNotices => json!({ "targetId": "notice_board" }),
            Action::AcceptQuest(quest_id) => json!({ "questId": quest_id }),
            Action::Celebrate => json!({}),
        }
    }

    pub fn into_frame(self) -> Outbound {
        Outbound::BotAction {
            action: self.kind(),
            payload: self.payload(),
        }
    }
}

/// Frames the server pushes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Inbound {
    AuthSuccess {
        #[serde(default, deserialize_with = "null_as_default")]
        avatar: Avatar,
        #[serde(default, deserialize_with = "null_as_default")]
        wallet: Wallet,
        #[serde(default, deserialize_with = "null_as_default")]
        license: License,
    },
    AuthFailed {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    ActionResult {
        #[serde(default)]
        success: bool,
        #[serde(default)]
        action: Option<String>,
        #[serde(default)]
        data: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
    WorldState {
        #[serde(default, deserialize_with = "null_as_default")]
        state: WorldState,
    },
    AvatarUpdate {
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
    LedgerEvent {
        #[serde(default)]
        event: Value,
    },
    #[serde(other)]
    Unknown,
}

impl Inbound {
    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::AuthSuccess { .. } => "AUTH_SUCCESS",
            Inbound::AuthFailed { .. } => "AUTH_FAILED",
            Inbound::ActionResult { .. } => "ACTION_RESULT",
            Inbound::WorldState { .. } => "WORLD_STATE",
            Inbound::AvatarUpdate { .. } => "AVATAR_UPDATE",
            Inbound::LedgerEvent { .. } => "LEDGER_EVENT",
            Inbound::Unknown => "UNKNOWN",
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Decodes one text frame.
pub fn decode(text: &str) -> Result<Inbound> {
    serde_json::from_str(text).map_err(|err| Error::MalformedFrame(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_auth_frame_shape() {
        let frame = Outbound::BotAuth {
            bot_id: "bot_1".to_string(),
            token: "secret".to_string(),
        };
        let value: Value = serde_json::from_str(&frame.to_text().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "BOT_AUTH", "botId": "bot_1", "token": "secret"})
        );
    }

    #[test]
    fn test_action_frames_carry_expected_payloads() {
        let cases = [
            (
                Action::Move { x: 3, y: 4 },
                json!({"type": "BOT_ACTION", "action": "MOVE", "payload": {"x": 3, "y": 4}}),
            ),
            (
                Action::Interact(InteractTarget::Stall("forge_stall".to_string())),
                json!({"type": "BOT_ACTION", "action": "INTERACT",
                       "payload": {"stallId": "forge_stall", "buildingId": null}}),
            ),
            (
                Action::Interact(InteractTarget::Building("hall".to_string())),
                json!({"type": "BOT_ACTION", "action": "INTERACT",
                       "payload": {"stallId": null, "buildingId": "hall"}}),
            ),
            (
                Action::ReadNotices,
                json!({"type": "BOT_ACTION", "action": "READ",
                       "payload": {"targetId": "notice_board"}}),
            ),
            (
                Action::AcceptQuest("q_7".to_string()),
                json!({"type": "BOT_ACTION", "action": "ACCEPT_QUEST",
                       "payload": {"questId": "q_7"}}),
            ),
            (
                Action::Celebrate,
                json!({"type": "BOT_ACTION", "action": "CELEBRATE", "payload": {}}),
            ),
        ];
        for (action, expected) in cases {
            let text = action.into_frame().to_text().unwrap();
            assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), expected);
        }
    }

    #[test]
    fn test_unknown_kind_decodes_to_unknown() {
        let frame = decode(r#"{"type": "WEATHER", "rain": true}"#).unwrap();
        assert!(matches!(frame, Inbound::Unknown));
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        for text in ["not json", "[1,2]", r#"{"no_type": 1}"#, r#"{"type": "WORLD_STATE", "state": 5}"#] {
            assert!(
                matches!(decode(text), Err(Error::MalformedFrame(_))),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn test_auth_success_tolerates_null_sections() {
        let frame = decode(r#"{"type": "AUTH_SUCCESS", "avatar": {"name": "Pax", "x": 1, "y": 2}, "wallet": null}"#)
            .unwrap();
        let Inbound::AuthSuccess { avatar, wallet, license } = frame else {
            panic!("wrong variant");
        };
        assert_eq!(avatar.name, "Pax");
        assert_eq!(wallet, Wallet::default());
        assert_eq!(license, License::default());
    }

    #[test]
    fn test_avatar_update_keeps_all_fields() {
        let frame = decode(r#"{"type": "AVATAR_UPDATE", "avatarId": "a1", "x": 9}"#).unwrap();
        let Inbound::AvatarUpdate { fields } = frame else {
            panic!("wrong variant");
        };
        assert_eq!(fields.get("avatarId"), Some(&json!("a1")));
    }
}
