use crate::error::{ParseError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Handles the timestamp forms a backing store hands back for `EndTime`/`TimeStamp`
pub struct TimestampParser;

impl TimestampParser {
    /// Parse a stored timestamp into a DateTime<Utc>.
    /// Naive values are taken as UTC, which is how the accounting tables store them.
    pub fn parse(timestamp_str: &str) -> Result<DateTime<Utc>> {
        let trimmed = timestamp_str.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }

        for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, layout) {
                return Ok(naive.and_utc());
            }
        }

        Err(ParseError::BackingStore(format!(
            "unrecognised timestamp '{}'",
            timestamp_str
        )))
    }

    /// Calendar (UTC) seconds of a stored timestamp, fractions dropped.
    pub fn epoch_seconds(timestamp_str: &str) -> Result<i64> {
        Ok(Self::parse(timestamp_str)?.timestamp())
    }

    /// UTC calendar form of an epoch-seconds value read from a log line.
    pub fn from_epoch(secs: i64) -> Result<DateTime<Utc>> {
        DateTime::from_timestamp(secs, 0).ok_or_else(|| ParseError::Format {
            index: 0,
            reason: format!("{} is outside the representable time range", secs),
        })
    }
}
