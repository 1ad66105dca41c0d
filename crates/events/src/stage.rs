//! Upgrade/install pipeline stages

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Pipeline stage as seen by the UI
///
/// Stages form a strict forward-only sequence for one logical operation:
/// DOWNLOAD → UNCOMPRESSION → DONE, with REBOOT reachable only on the
/// whole-application upgrade path. The wire encoding is the bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Download = 1,
    Uncompression = 2,
    Done = 3,
    Reboot = 4,
}

impl Stage {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Stage::Download),
            2 => Some(Stage::Uncompression),
            3 => Some(Stage::Done),
            4 => Some(Stage::Reboot),
            _ => None,
        }
    }
}

impl Serialize for Stage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(self.as_i32())
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i32::deserialize(deserializer)?;
        Stage::from_i32(value)
            .ok_or_else(|| de::Error::custom(format!("unknown stage value {value}")))
    }
}
