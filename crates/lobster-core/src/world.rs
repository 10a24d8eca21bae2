//! World model types shared by the REST surface and the live mirror.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// Rounds a JSON number to the nearest integer.
pub fn round_number(number: &Number) -> Option<i64> {
    number
        .as_i64()
        .or_else(|| number.as_f64().map(|float| float.round() as i64))
}

/// Integer field that also takes a float (rounded) or `null` (zero).
pub fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Number>::deserialize(deserializer)? {
        None => Ok(0),
        Some(number) => round_number(&number)
            .ok_or_else(|| D::Error::custom(format!("number out of range: {number}"))),
    }
}

/// Name -> amount map with [`lenient_int`] amounts. `null` is an empty map.
pub fn lenient_amounts<'de, D>(deserializer: D) -> Result<BTreeMap<String, i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<Number>>>::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(name, amount)| -> Result<(String, i64), D::Error> {
            let amount = match amount {
                None => 0,
                Some(number) => round_number(&number).ok_or_else(|| {
                    D::Error::custom(format!("amount out of range for {name}: {number}"))
                })?,
            };
            Ok((name, amount))
        })
        .collect()
}

/// `null` decodes as the type's default.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An avatar as the server describes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Avatar {
    #[serde(deserialize_with = "lenient_int")]
    pub x: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub y: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Behavioural state (`idle`, `walking`, `working`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Avatar {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.x == 0 && self.y == 0 && self.state.is_none()
    }
}

impl fmt::Display for Avatar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at ({}, {})", self.name, self.x, self.y)?;
        if let Some(state) = &self.state {
            write!(f, " - {state}")?;
        }
        Ok(())
    }
}

/// Fields an `ACTION_RESULT` may carry about our own avatar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AvatarPatch {
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub state: Option<String>,
}

impl AvatarPatch {
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.state.is_none()
    }

    /// Overwrites only the fields present in the patch.
    pub fn apply_to(&self, avatar: &mut Avatar) {
        if let Some(x) = self.x {
            avatar.x = x;
        }
        if let Some(y) = self.y {
            avatar.y = y;
        }
        if let Some(state) = &self.state {
            avatar.state = Some(state.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wallet {
    /// Currency balance.
    #[serde(deserialize_with = "lenient_int")]
    pub cc: i64,
    /// Token symbol -> amount.
    #[serde(deserialize_with = "lenient_amounts")]
    pub tokens: BTreeMap<String, i64>,
}

impl Wallet {
    pub fn token(&self, symbol: &str) -> i64 {
        self.tokens.get(symbol).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseTier {
    #[default]
    Visitor,
    Citizen,
    Apprentice,
    Journeyman,
    Master,
    #[serde(other)]
    Unknown,
}

impl LicenseTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseTier::Visitor => "VISITOR",
            LicenseTier::Citizen => "CITIZEN",
            LicenseTier::Apprentice => "APPRENTICE",
            LicenseTier::Journeyman => "JOURNEYMAN",
            LicenseTier::Master => "MASTER",
            LicenseTier::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct License {
    pub tier: LicenseTier,
    pub school: Option<String>,
}

/// In-game clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameClock {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl fmt::Display for GameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {}, {:02}:{:02}", self.day, self.hour, self.minute)
    }
}

/// World state as the server sends it (`/api/world/state` and `WORLD_STATE`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldState {
    pub avatars: Vec<Value>,
    pub bot_count: u32,
    pub game_time: GameClock,
    pub is_build_night: bool,
}

/// Condensed world snapshot kept in the mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldSnapshot {
    pub avatar_count: usize,
    pub bot_count: u32,
    pub clock: GameClock,
    pub build_night: bool,
}

impl From<WorldState> for WorldSnapshot {
    fn from(state: WorldState) -> Self {
        Self {
            avatar_count: state.avatars.len(),
            bot_count: state.bot_count,
            clock: state.game_time,
            build_night: state.is_build_night,
        }
    }
}
