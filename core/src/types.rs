//! Shared primitive types used across the entire pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds since the Unix epoch, as stored in the device logs.
pub type Timestamp = i64;

/// A user identifier, taken verbatim from the log directory name.
pub type UserId = String;

/// A device directory name under a user.
pub type DeviceId = String;

/// Binary credit-risk label. Good = 0, Bad = 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Good,
    Bad,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Good => 0,
            Label::Bad => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.as_u8() as f64
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Label::Good => "good",
            Label::Bad => "bad",
        })
    }
}
