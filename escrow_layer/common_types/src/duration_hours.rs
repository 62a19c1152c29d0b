//   Copyright 2024 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::fmt::{Display, Formatter};

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// The permitted observation windows for a proof spec.
pub const PERMITTED_DURATION_HOURS: &[u32] = &[1, 12, 24, 48, 72, 168];

/// The observation window a posted proof must survive before a recorded
/// verification success becomes a final payout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DurationHours(u32);

impl DurationHours {
    pub fn new(hours: u32) -> Result<Self, InvalidDurationHours> {
        if PERMITTED_DURATION_HOURS.contains(&hours) {
            Ok(Self(hours))
        } else {
            Err(InvalidDurationHours(hours))
        }
    }

    pub fn as_hours(self) -> u32 {
        self.0
    }

    pub fn to_duration(self) -> Duration {
        Duration::hours(i64::from(self.0))
    }
}

impl Display for DurationHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}h", self.0)
    }
}

impl TryFrom<u32> for DurationHours {
    type Error = InvalidDurationHours;

    fn try_from(hours: u32) -> Result<Self, Self::Error> {
        Self::new(hours)
    }
}

impl<'de> Deserialize<'de> for DurationHours {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hours = <u32 as Deserialize>::deserialize(deserializer)?;
        Self::new(hours).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Duration of {0} hours is not in the permitted set")]
pub struct InvalidDurationHours(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_rejects_durations_outside_the_allow_list() {
        DurationHours::new(24).unwrap();
        DurationHours::new(168).unwrap();
        DurationHours::new(0).unwrap_err();
        DurationHours::new(25).unwrap_err();
    }
}
