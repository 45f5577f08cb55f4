//! Line-to-record parsing for BOINC accounting logs
//!
//! A [`BoincParser`] is set up for one [`RecordKind`] and owns everything the field
//! derivation needs: the site settings, the job naming rules and the checkpoint. Each call to
//! [`BoincParser::parse`] handles one line and yields at most one record.
//!
//! ## Field Derivation
//!
//! | field                      | source                                          |
//! |----------------------------|-------------------------------------------------|
//! | end time                   | token 0 as integer                              |
//! | CPU and wall duration      | token 4, rounded to whole seconds               |
//! | start time                 | end time minus the integer part of token 10     |
//! | job name / `LrmsId`        | [`JobIdentity`] over token 8 and token 0        |
//! | `GlobalJobId`              | token 8 verbatim (current format only)          |
//! | `ValidFrom` / `ValidUntil` | [`ValidityWindow`] around the end time          |
//!
//! Lines ending strictly before the checkpoint produce `Ok(None)`. That is the normal outcome
//! when a log is re-read and is not an error.

use crate::checkpoint::{resolve_checkpoint, CheckpointStore};
use crate::error::{ParseError, Result};
use crate::job_identity::{JobIdentity, SEPARATOR};
use crate::models::{
    ExecutionRecord, FormatVersion, ParsedRecord, RecordKind, SubmissionRecord,
    SubmissionTimestamp, UNPROCESSED,
};
use crate::timestamp_parser::TimestampParser;
use crate::tokenizer::RawLine;
use crate::validity::ValidityWindow;
use tracing::{info, trace};

pub const DEFAULT_PREFIX: &str = "boinc";
pub const DEFAULT_LOCAL_USER_ID: &str = "boinc";
pub const DEFAULT_INFRASTRUCTURE: &str = "APEL-BOINC-APEL-BOINC";
pub const DEFAULT_VO: &str = "atlas";

/// Everything a parser needs besides the checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    pub site_name: String,
    pub machine_name: String,
    pub hostname: String,
    pub prefix: String,
    pub local_user_id: String,
    pub infrastructure: String,
    pub processors: u32,
    pub node_count: u32,
    pub vo: String,
    pub version: FormatVersion,
    pub validity: ValidityWindow,
}

impl ParserSettings {
    /// Settings with every optional value at its default.
    pub fn new(
        site_name: impl Into<String>,
        machine_name: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            machine_name: machine_name.into(),
            hostname: hostname.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            local_user_id: DEFAULT_LOCAL_USER_ID.to_string(),
            infrastructure: DEFAULT_INFRASTRUCTURE.to_string(),
            processors: 1,
            node_count: 1,
            vo: DEFAULT_VO.to_string(),
            version: FormatVersion::Current,
            validity: ValidityWindow::default(),
        }
    }

    pub fn with_version(mut self, version: FormatVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_processors(mut self, processors: u32) -> Self {
        self.processors = processors;
        self
    }

    pub fn identity(&self) -> JobIdentity {
        JobIdentity::new(self.prefix.clone(), self.hostname.clone(), self.version)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("site_name", &self.site_name),
            ("machine_name", &self.machine_name),
            ("hostname", &self.hostname),
            ("prefix", &self.prefix),
        ] {
            if value.trim().is_empty() {
                return Err(ParseError::Configuration(format!("{} must not be empty", name)));
            }
        }
        for (name, value) in [("hostname", &self.hostname), ("prefix", &self.prefix)] {
            if value.contains(SEPARATOR) {
                return Err(ParseError::Configuration(format!(
                    "{} '{}' must not contain '{}'",
                    name, value, SEPARATOR
                )));
            }
        }
        if self.processors == 0 {
            return Err(ParseError::Configuration("processors must be at least 1".to_string()));
        }
        if self.node_count == 0 {
            return Err(ParseError::Configuration("node_count must be at least 1".to_string()));
        }
        if !self.validity.is_valid() {
            return Err(ParseError::Configuration(
                "validity offsets must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parser for one record kind with its own checkpoint.
#[derive(Debug, Clone)]
pub struct BoincParser {
    kind: RecordKind,
    settings: ParserSettings,
    identity: JobIdentity,
    last_parsed_endtime: i64,
}

impl BoincParser {
    /// Parser with a known checkpoint (0 ingests everything).
    pub fn new(kind: RecordKind, settings: ParserSettings, checkpoint: i64) -> Result<Self> {
        settings.validate()?;
        info!(
            kind = %kind,
            "Site: {}; batch system: {}",
            settings.site_name,
            settings.machine_name
        );
        let identity = settings.identity();
        Ok(Self {
            kind,
            settings,
            identity,
            last_parsed_endtime: checkpoint,
        })
    }

    /// Parser whose checkpoint is read from `store` once, before any line is handled.
    pub fn with_store(
        kind: RecordKind,
        settings: ParserSettings,
        store: &dyn CheckpointStore,
    ) -> Result<Self> {
        settings.validate()?;
        let checkpoint = resolve_checkpoint(store, kind, &settings.identity())?;
        Self::new(kind, settings, checkpoint)
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    pub fn checkpoint(&self) -> i64 {
        self.last_parsed_endtime
    }

    /// Parses one accounting line. `Ok(None)` means the line is already ingested.
    pub fn parse(&self, line: &str) -> Result<Option<ParsedRecord>> {
        let raw = RawLine::tokenize(line);

        let end_time = raw.end_time()?;
        if end_time < self.last_parsed_endtime {
            trace!(end_time, checkpoint = self.last_parsed_endtime, "Skipping parsed line");
            return Ok(None);
        }

        let record = match self.kind {
            RecordKind::Batch => ParsedRecord::Execution(self.build_execution(&raw, end_time)?),
            RecordKind::Blah => ParsedRecord::Submission(self.build_submission(&raw, end_time)?),
        };
        Ok(Some(record))
    }

    fn build_execution(&self, raw: &RawLine<'_>, end_time: i64) -> Result<ExecutionRecord> {
        let cpu = raw.cpu_seconds()?;
        let job_name = self.identity.build(raw.end_time_token()?, raw.job_label()?);
        let runtime = raw.runtime_seconds()?;
        let start_time = end_time.checked_sub(runtime).ok_or_else(|| ParseError::Format {
            index: crate::tokenizer::RUNTIME,
            reason: format!("runtime {} overflows end time {}", runtime, end_time),
        })?;
        let processors = match self.settings.version {
            FormatVersion::Legacy => 1,
            FormatVersion::Current => self.settings.processors,
        };

        Ok(ExecutionRecord {
            site: self.settings.site_name.clone(),
            machine_name: self.settings.machine_name.clone(),
            infrastructure: self.settings.infrastructure.clone(),
            job_name,
            local_user_id: self.settings.local_user_id.clone(),
            local_user_group: String::new(),
            wall_duration: cpu,
            cpu_duration: cpu,
            start_time,
            stop_time: end_time,
            processors,
            node_count: self.settings.node_count,
        })
    }

    fn build_submission(&self, raw: &RawLine<'_>, end_time: i64) -> Result<SubmissionRecord> {
        let label = raw.job_label()?;
        let utc = TimestampParser::from_epoch(end_time)?;
        let window = self.settings.validity;
        let out_of_range = || ParseError::Format {
            index: 0,
            reason: format!("validity window around {} is out of range", end_time),
        };

        let (timestamp, global_job_id) = match self.settings.version {
            FormatVersion::Legacy => (SubmissionTimestamp::Iso(utc.naive_utc()), None),
            FormatVersion::Current => {
                (SubmissionTimestamp::Epoch(end_time), Some(label.to_string()))
            }
        };

        Ok(SubmissionRecord {
            timestamp,
            vo: self.settings.vo.clone(),
            ce: self.settings.machine_name.clone(),
            global_job_id,
            lrms_id: self.identity.build(raw.end_time_token()?, label),
            site: self.settings.site_name.clone(),
            valid_from: window.valid_from(utc).ok_or_else(out_of_range)?,
            valid_until: window.valid_until(utc).ok_or_else(out_of_range)?,
            processed: UNPROCESSED,
        })
    }
}
