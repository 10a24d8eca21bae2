//! Local projection of server-authoritative state.
//!
//! The mirror is advisory: it may lag the server and must not be the only
//! input to a decision that spends currency.

use lobster_core::api::StatusResponse;
use lobster_core::world::{Avatar, AvatarPatch, License, Wallet, WorldSnapshot, round_number};
use serde_json::Value;

use crate::frames::Inbound;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mirror {
    pub avatar: Avatar,
    pub wallet: Wallet,
    pub license: License,
    /// `None` until the first world snapshot arrives.
    pub world: Option<WorldSnapshot>,
}

impl Mirror {
    /// Folds one inbound frame into the mirror. Returns whether anything changed.
    pub fn apply(&mut self, frame: &Inbound) -> bool {
        match frame {
            Inbound::AuthSuccess {
                avatar,
                wallet,
                license,
            } => {
                self.avatar = avatar.clone();
                self.wallet = wallet.clone();
                self.license = license.clone();
                true
            }
            Inbound::ActionResult {
                success: true,
                data: Some(data),
                ..
            } => {
                let patch = patch_from(data);
                if patch.is_empty() {
                    return false;
                }
                let before = self.avatar.clone();
                patch.apply_to(&mut self.avatar);
                before != self.avatar
            }
            Inbound::WorldState { state } => {
                self.world = Some(WorldSnapshot::from(state.clone()));
                true
            }
            _ => false,
        }
    }

    /// Seeds avatar, wallet and license from a REST status answer.
    pub fn seed_from_status(&mut self, status: &StatusResponse) {
        if let Some(avatar) = &status.avatar {
            self.avatar = avatar.clone();
        }
        self.wallet = status.wallet.clone();
        self.license = status.license.clone();
    }
}

/// Pulls the avatar fields out of an `ACTION_RESULT` payload, ignoring the rest.
fn patch_from(data: &Value) -> AvatarPatch {
    let coord = |key: &str| data.get(key).and_then(Value::as_number).and_then(round_number);
    AvatarPatch {
        x: coord("x"),
        y: coord("y"),
        state: data.get("state").and_then(Value::as_str).map(str::to_string),
    }
}
