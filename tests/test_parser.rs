use apel_boinc::ingest::{CollectorSink, Ingestor};
use apel_boinc::models::{FormatVersion, ParsedRecord, RecordKind, SubmissionTimestamp};
use apel_boinc::{BoincParser, ParseError, ParserSettings};
use std::io::Cursor;

mod common;

const EXAMPLE: &str = "1700000000 ue 12.5 ct 360 fe 0 nm JOBLABEL12345 et 300 es 0";

fn settings() -> ParserSettings {
    ParserSettings::new("TEST-SITE", "boinc-ce.example.org", "node1")
}

#[test]
fn test_example_line_execution_record() {
    let parser = BoincParser::new(RecordKind::Batch, settings(), 0).unwrap();
    let record = parser.parse(EXAMPLE).unwrap().expect("record");

    let event = record.as_execution().unwrap();
    assert_eq!(event.wall_duration, 360);
    assert_eq!(event.cpu_duration, 360);
    assert_eq!(event.start_time, 1_699_999_700);
    assert_eq!(event.stop_time, 1_700_000_000);
    assert_eq!(event.job_name, "boinc.node1.1700000000.JOBLABEL12");
}

#[test]
fn test_example_line_above_checkpoint() {
    let parser = BoincParser::new(RecordKind::Batch, settings(), 1_700_000_001).unwrap();
    assert_eq!(parser.parse(EXAMPLE).unwrap(), None);

    let parser = BoincParser::new(RecordKind::Blah, settings(), 1_700_000_001).unwrap();
    assert_eq!(parser.parse(EXAMPLE).unwrap(), None);
}

#[test]
fn test_both_kinds_share_job_name() {
    let batch = BoincParser::new(RecordKind::Batch, settings(), 0).unwrap();
    let blah = BoincParser::new(RecordKind::Blah, settings(), 0).unwrap();

    for line in common::SAMPLE_LOG.lines() {
        let event = batch.parse(line).unwrap().unwrap();
        let submission = blah.parse(line).unwrap().unwrap();
        assert_eq!(event.job_name(), submission.job_name());
        assert_eq!(event.kind(), RecordKind::Batch);
        assert_eq!(submission.kind(), RecordKind::Blah);
    }
}

#[test]
fn test_sample_log_fields() {
    let parser = BoincParser::new(RecordKind::Batch, settings().with_processors(4), 0).unwrap();
    let mut sink = CollectorSink::new();
    let summary = Ingestor::new(&parser)
        .ingest_reader(Cursor::new(common::SAMPLE_LOG), &mut sink)
        .unwrap();
    assert_eq!(summary.emitted, 3);

    let records = sink.into_records();
    let second = records[1].as_execution().unwrap();
    assert_eq!(second.cpu_duration, 1201);
    assert_eq!(second.runtime(), 1250);
    assert_eq!(second.job_name, "boinc.node1.1700000060.wu_4711_0");
    assert_eq!(second.processors, 4);
}

#[test]
fn test_submission_window_contains_timestamp() {
    let parser = BoincParser::new(RecordKind::Blah, settings(), 0).unwrap();
    let record = parser.parse(EXAMPLE).unwrap().unwrap();
    let blah = record.as_submission().unwrap();

    let ts = blah.timestamp.to_utc().unwrap();
    assert!(blah.valid_from <= ts && ts <= blah.valid_until);
    assert_eq!(blah.timestamp, SubmissionTimestamp::Epoch(1_700_000_000));
}

#[test]
fn test_legacy_and_current_side_by_side() {
    let legacy = BoincParser::new(
        RecordKind::Blah,
        settings().with_version(FormatVersion::Legacy),
        0,
    )
    .unwrap();
    let current = BoincParser::new(RecordKind::Blah, settings(), 0).unwrap();

    let legacy = serde_json::to_value(legacy.parse(EXAMPLE).unwrap().unwrap()).unwrap();
    let current = serde_json::to_value(current.parse(EXAMPLE).unwrap().unwrap()).unwrap();

    assert_eq!(legacy["TimeStamp"], "2023-11-14T22:13:20");
    assert_eq!(current["TimeStamp"], 1_700_000_000);
    assert!(legacy.get("GlobalJobId").is_none());
    assert_eq!(current["GlobalJobId"], "JOBLABEL12345");
    assert_eq!(current["Processed"], 0);
    assert_eq!(current["ValidUntil"], "2023-12-12 22:13:20");
}

#[test]
fn test_malformed_lines() {
    let parser = BoincParser::new(RecordKind::Batch, settings(), 0).unwrap();

    let cases = [
        "",
        "1700000000 ue 12.5 ct",
        "1700000000 ue 12.5 ct 360 fe 0 nm LABEL et",
        "1700000000 ue 12.5 ct fast fe 0 nm LABEL et 300 es 0",
        "17e8 ue 12.5 ct 360 fe 0 nm LABEL et 300 es 0",
    ];
    for line in cases {
        match parser.parse(line) {
            Err(ParseError::Format { .. }) => {}
            other => panic!("expected format error for {:?}, got {:?}", line, other),
        }
    }
}

#[test]
fn test_reingesting_checkpointed_log_yields_nothing() {
    let first = BoincParser::new(RecordKind::Batch, settings(), 0).unwrap();
    let mut sink = CollectorSink::new();
    Ingestor::new(&first)
        .ingest_reader(Cursor::new(common::SAMPLE_LOG), &mut sink)
        .unwrap();
    let records = sink.into_records();
    let latest = records
        .iter()
        .filter_map(ParsedRecord::as_execution)
        .map(|r| r.stop_time)
        .max()
        .unwrap();

    // A line equal to the checkpoint is re-read, so the next run starts one second later.
    let second = BoincParser::new(RecordKind::Batch, settings(), latest + 1).unwrap();
    let mut sink = CollectorSink::new();
    let summary = Ingestor::new(&second)
        .ingest_reader(Cursor::new(common::SAMPLE_LOG), &mut sink)
        .unwrap();
    assert_eq!(summary.emitted, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.failed, 0);
}
