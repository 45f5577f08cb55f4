//! Accounting record models
//!
//! This module defines the records produced from BOINC accounting lines. Both shapes carry
//! the APEL column names on serialization so a downstream loader can insert them as-is.
//!
//! ## Record Kinds
//!
//! - [`ExecutionRecord`] - one finished job, destined for `EventRecords`
//! - [`SubmissionRecord`] - the submission/validity counterpart, destined for `BlahdRecords`
//!
//! [`RecordKind`] names the two and knows which table, time column and job-name column the
//! checkpoint query reads. [`FormatVersion`] selects between the older and the current field
//! derivation rules.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Datetime layout used for every calendar value leaving this crate.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout of the legacy submission timestamp (ISO-8601, no offset).
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Value of the `Processed` column for records not yet picked up by the unloader.
pub const UNPROCESSED: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Execution records, parsed from the batch log.
    Batch,
    /// Submission records, parsed from the same log for the blah table.
    Blah,
}

impl RecordKind {
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Batch => "EventRecords",
            RecordKind::Blah => "BlahdRecords",
        }
    }

    pub fn time_column(&self) -> &'static str {
        match self {
            RecordKind::Batch => "EndTime",
            RecordKind::Blah => "TimeStamp",
        }
    }

    pub fn name_column(&self) -> &'static str {
        match self {
            RecordKind::Batch => "JobName",
            RecordKind::Blah => "LrmsId",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Batch => write!(f, "batch"),
            RecordKind::Blah => write!(f, "blah"),
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "batch" | "event" => Ok(RecordKind::Batch),
            "blah" | "blahd" => Ok(RecordKind::Blah),
            other => Err(format!("unknown record kind '{}', expected batch or blah", other)),
        }
    }
}

/// Generation of the field derivation rules.
///
/// `Legacy` names jobs `<host>.<label>`, always reports one processor and writes the
/// submission timestamp as an ISO string without a global job id. `Current` uses the
/// prefixed, truncated job name, the configured processor count, an epoch timestamp and
/// carries the global job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatVersion {
    Legacy,
    #[default]
    Current,
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatVersion::Legacy => write!(f, "legacy"),
            FormatVersion::Current => write!(f, "current"),
        }
    }
}

impl FromStr for FormatVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(FormatVersion::Legacy),
            "current" => Ok(FormatVersion::Current),
            other => Err(format!("unknown format version '{}', expected legacy or current", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutionRecord {
    pub site: String,
    pub machine_name: String,
    pub infrastructure: String,
    pub job_name: String,
    #[serde(rename = "LocalUserID")]
    pub local_user_id: String,
    pub local_user_group: String,
    pub wall_duration: i64,
    pub cpu_duration: i64,
    pub start_time: i64,
    pub stop_time: i64,
    pub processors: u32,
    pub node_count: u32,
}

impl ExecutionRecord {
    pub fn runtime(&self) -> i64 {
        self.stop_time - self.start_time
    }
}

/// Submission timestamp in whichever form the active format version writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionTimestamp {
    Epoch(i64),
    Iso(NaiveDateTime),
}

impl SubmissionTimestamp {
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            SubmissionTimestamp::Epoch(secs) => DateTime::from_timestamp(*secs, 0),
            SubmissionTimestamp::Iso(naive) => Some(naive.and_utc()),
        }
    }
}

impl Serialize for SubmissionTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SubmissionTimestamp::Epoch(secs) => serializer.serialize_i64(*secs),
            SubmissionTimestamp::Iso(naive) => {
                serializer.collect_str(&naive.format(ISO_FORMAT))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    #[serde(rename = "TimeStamp")]
    pub timestamp: SubmissionTimestamp,
    #[serde(rename = "VO")]
    pub vo: String,
    #[serde(rename = "CE")]
    pub ce: String,
    #[serde(rename = "GlobalJobId", skip_serializing_if = "Option::is_none")]
    pub global_job_id: Option<String>,
    #[serde(rename = "LrmsId")]
    pub lrms_id: String,
    #[serde(rename = "Site")]
    pub site: String,
    #[serde(rename = "ValidFrom", serialize_with = "serialize_datetime")]
    pub valid_from: DateTime<Utc>,
    #[serde(rename = "ValidUntil", serialize_with = "serialize_datetime")]
    pub valid_until: DateTime<Utc>,
    #[serde(rename = "Processed")]
    pub processed: u8,
}

/// Either record shape, as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParsedRecord {
    Execution(ExecutionRecord),
    Submission(SubmissionRecord),
}

impl ParsedRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            ParsedRecord::Execution(_) => RecordKind::Batch,
            ParsedRecord::Submission(_) => RecordKind::Blah,
        }
    }

    pub fn job_name(&self) -> &str {
        match self {
            ParsedRecord::Execution(record) => &record.job_name,
            ParsedRecord::Submission(record) => &record.lrms_id,
        }
    }

    pub fn as_execution(&self) -> Option<&ExecutionRecord> {
        match self {
            ParsedRecord::Execution(record) => Some(record),
            ParsedRecord::Submission(_) => None,
        }
    }

    pub fn as_submission(&self) -> Option<&SubmissionRecord> {
        match self {
            ParsedRecord::Submission(record) => Some(record),
            ParsedRecord::Execution(_) => None,
        }
    }
}

fn serialize_datetime<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&value.format(DATETIME_FORMAT))
}
