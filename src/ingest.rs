//! Per-line ingestion loop
//!
//! Feeds lines from a reader through a [`BoincParser`] and hands every produced record to a
//! [`RecordSink`]. Malformed lines, including lines that are not valid UTF-8, are logged with
//! their line number and skipped. Lines ending before the checkpoint are counted but never
//! logged as failures. I/O and sink errors stop the run.

use crate::error::ParseError;
use crate::models::ParsedRecord;
use crate::parser::BoincParser;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Receives records as the ingest loop produces them.
pub trait RecordSink {
    fn accept(&mut self, record: ParsedRecord, line_number: usize) -> Result<()>;
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct CollectorSink {
    records: Vec<ParsedRecord>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_records(self) -> Vec<ParsedRecord> {
        self.records
    }
}

impl RecordSink for CollectorSink {
    fn accept(&mut self, record: ParsedRecord, _line_number: usize) -> Result<()> {
        self.records.push(record);
        Ok(())
    }
}

/// Writes one JSON object per record.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn accept(&mut self, record: ParsedRecord, _line_number: usize) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &record).context("Failed to serialize record")?;
        self.writer.write_all(b"\n").context("Failed to write record")?;
        Ok(())
    }
}

impl<F> RecordSink for F
where
    F: FnMut(ParsedRecord, usize) -> Result<()>,
{
    fn accept(&mut self, record: ParsedRecord, line_number: usize) -> Result<()> {
        self(record, line_number)
    }
}

/// Line counts for one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Non-blank lines read.
    pub lines: usize,
    pub emitted: usize,
    /// Lines ending before the checkpoint.
    pub skipped: usize,
    /// Lines rejected as malformed.
    pub failed: usize,
}

impl IngestSummary {
    pub fn merge(&mut self, other: IngestSummary) {
        self.lines += other.lines;
        self.emitted += other.emitted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

pub struct Ingestor<'p> {
    parser: &'p BoincParser,
}

impl<'p> Ingestor<'p> {
    pub fn new(parser: &'p BoincParser) -> Self {
        Self { parser }
    }

    pub fn ingest_reader<R: BufRead, S: RecordSink>(
        &self,
        mut reader: R,
        sink: &mut S,
    ) -> Result<IngestSummary> {
        let mut summary = IngestSummary::default();
        let mut buf = Vec::new();
        let mut line_number = 0;

        loop {
            buf.clear();
            line_number += 1;
            let read = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("Failed to read line {}", line_number))?;
            if read == 0 {
                break;
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line,
                Err(err) => {
                    summary.lines += 1;
                    summary.failed += 1;
                    warn!(line_number, error = %err, "Skipping line that is not valid UTF-8");
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            summary.lines += 1;

            match self.parser.parse(line) {
                Ok(Some(record)) => {
                    sink.accept(record, line_number)?;
                    summary.emitted += 1;
                }
                Ok(None) => summary.skipped += 1,
                Err(err @ ParseError::Format { .. }) => {
                    warn!(line_number, error = %err, line = %line.trim_end(), "Skipping malformed line");
                    summary.failed += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }

        debug!(
            kind = %self.parser.kind(),
            lines = summary.lines,
            emitted = summary.emitted,
            skipped = summary.skipped,
            failed = summary.failed,
            "Finished reading input"
        );
        Ok(summary)
    }

    pub fn ingest_file<S: RecordSink>(&self, path: &Path, sink: &mut S) -> Result<IngestSummary> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        let summary = self
            .ingest_reader(BufReader::new(file), sink)
            .with_context(|| format!("Failed to ingest {}", path.display()))?;

        info!(
            file = %path.display(),
            emitted = summary.emitted,
            skipped = summary.skipped,
            failed = summary.failed,
            "Parsed log file"
        );
        Ok(summary)
    }
}
