//! Action: the intent applied to the device's interruption policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pure intent: silence the device or restore it. Carries no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Mute,
    Unmute,
}

impl Action {
    /// Both actions, in the order a window applies them.
    pub const ALL: [Self; 2] = [Self::Mute, Self::Unmute];

    /// Target value for the device's "silenced?" flag.
    #[must_use]
    pub fn silenced(self) -> bool {
        matches!(self, Self::Mute)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mute => "mute",
            Self::Unmute => "unmute",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown action name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mute" => Ok(Self::Mute),
            "unmute" => Ok(Self::Unmute),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}
