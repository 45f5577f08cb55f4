//! Validity window of submission records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidityWindow {
    /// Days before the record timestamp the record becomes valid.
    pub valid_from_days: i64,
    /// Days after the record timestamp the record stays valid.
    pub valid_until_days: i64,
}

impl Default for ValidityWindow {
    fn default() -> Self {
        Self {
            valid_from_days: 1,
            valid_until_days: 28,
        }
    }
}

impl ValidityWindow {
    /// `None` when the shifted value leaves chrono's representable range.
    pub fn valid_from(&self, timestamp: DateTime<Utc>) -> Option<DateTime<Utc>> {
        timestamp.checked_sub_signed(Duration::try_days(self.valid_from_days)?)
    }

    pub fn valid_until(&self, timestamp: DateTime<Utc>) -> Option<DateTime<Utc>> {
        timestamp.checked_add_signed(Duration::try_days(self.valid_until_days)?)
    }

    pub fn is_valid(&self) -> bool {
        self.valid_from_days >= 0 && self.valid_until_days >= 0
    }
}
