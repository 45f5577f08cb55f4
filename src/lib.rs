//! APEL BOINC Parser Library
//!
//! Turns the per-job accounting lines written by a BOINC server into APEL accounting records,
//! skipping every line already present in the accounting database.
//!
//! ## Core Features
//!
//! - **Two record kinds from one log**: execution records for `EventRecords` and submission
//!   records for `BlahdRecords`
//! - **Incremental ingestion**: each parser starts from the latest end time already stored
//!   for this node, so re-reading a log never duplicates records
//! - **Versioned field rules**: the legacy and current job naming and timestamp layouts are
//!   both selectable
//!
//! ## Architecture Overview
//!
//! - [`tokenizer`] - positional tokens of one accounting line
//! - [`job_identity`] - job names scoped to the ingesting node
//! - [`checkpoint`] - high-water-mark query against the backing store
//! - [`parser`] - per-kind record construction
//! - [`ingest`] - line loop, error accounting and record sinks
//! - [`config`] - layered configuration with environment overrides
//! - [`logging`] - structured logging setup
//!
//! ## Example
//!
//! ```rust
//! use apel_boinc::{BoincParser, ParserSettings, RecordKind};
//!
//! # fn example() -> apel_boinc::error::Result<()> {
//! let settings = ParserSettings::new("MY-SITE", "boinc.example.org", "node1");
//! let parser = BoincParser::new(RecordKind::Batch, settings, 0)?;
//!
//! let record = parser.parse("1700000000 ue 12.5 ct 360 fe 0 nm JOBLABEL12345 et 300 es 0")?;
//! assert_eq!(record.unwrap().job_name(), "boinc.node1.1700000000.JOBLABEL12");
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod ingest;
pub mod job_identity;
pub mod logging;
pub mod models;
pub mod parser;
pub mod timestamp_parser;
pub mod tokenizer;
pub mod validity;

pub use checkpoint::{resolve_checkpoint, CheckpointStore, SqliteStore};
pub use error::ParseError;
pub use ingest::{IngestSummary, Ingestor};
pub use models::*;
pub use parser::{BoincParser, ParserSettings};
