//! Tracker configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Association policy used by [`SortTracker`](crate::SortTracker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum MatchingMode {
    /// One round over every active tracklet.
    #[default]
    Basic,
    /// Confirmed tracklets matched by recency first, everything else last.
    Cascade,
}

impl FromStr for MatchingMode {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "cascade" => Ok(Self::Cascade),
            other => Err(TrackerError::UnknownMatchingMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for MatchingMode {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for MatchingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => f.write_str("basic"),
            Self::Cascade => f.write_str("cascade"),
        }
    }
}

/// Configuration for the SortTracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Frames a tracklet may go unmatched before it is lost
    pub max_age: u32,
    /// Consecutive corrections needed to leave probation
    pub min_hits: u32,
    pub matching: MatchingMode,
    /// IoU threshold of the first (or only) matching round
    pub round1_iou: f32,
    /// IoU threshold of the final cascade round
    pub round2_iou: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 1,
            min_hits: 3,
            matching: MatchingMode::Basic,
            round1_iou: 0.3,
            round2_iou: 0.3,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.min_hits == 0 {
            return Err(TrackerError::InvalidConfig(
                "min_hits must be at least 1".to_string(),
            ));
        }
        for (name, value) in [("round1_iou", self.round1_iou), ("round2_iou", self.round2_iou)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackerError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}
