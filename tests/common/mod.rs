#![allow(dead_code)]

use anyhow::Result;
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};

pub const SAMPLE_LOG: &str = "\
1700000000 ue 12.5 ct 360 fe 0 nm JOBLABEL12345 et 300 es 0
1700000060 ue 3.0 ct 1200.6 fe 1e12 nm wu_4711_0 et 1250.9 es 0
1700000120 ue 3.0 ct 45 fe 1e9 nm short et 44 es 1
";

pub fn write_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(filename);
    fs::write(&path, content)?;
    Ok(path)
}

/// Creates an accounting database with empty `EventRecords` and `BlahdRecords` tables.
pub fn create_store(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("apel.sqlite");
    let conn = Connection::open(&path)?;
    conn.execute_batch(
        "CREATE TABLE EventRecords (
            JobName TEXT NOT NULL,
            EndTime TEXT
        );
        CREATE TABLE BlahdRecords (
            LrmsId TEXT NOT NULL,
            TimeStamp TEXT
        );",
    )?;
    Ok(path)
}

pub fn insert_event(store: &Path, job_name: &str, end_time: &str) -> Result<()> {
    let conn = Connection::open(store)?;
    conn.execute(
        "INSERT INTO EventRecords (JobName, EndTime) VALUES (?1, ?2)",
        params![job_name, end_time],
    )?;
    Ok(())
}

pub fn insert_blah(store: &Path, lrms_id: &str, timestamp: &str) -> Result<()> {
    let conn = Connection::open(store)?;
    conn.execute(
        "INSERT INTO BlahdRecords (LrmsId, TimeStamp) VALUES (?1, ?2)",
        params![lrms_id, timestamp],
    )?;
    Ok(())
}

/// Writes a config for site TEST-SITE on node1, optionally pointing at a database.
pub fn write_config(dir: &Path, db_path: Option<&Path>) -> Result<PathBuf> {
    let mut content = String::from(
        r#"[site]
site_name = "TEST-SITE"
machine_name = "boinc-ce.example.org"

[boinc]
hostname = "node1"
processors = 2

[logging]
level = "ERROR"
"#,
    );
    if let Some(db) = db_path {
        content.push_str(&format!("\n[db]\npath = {:?}\n", db.display().to_string()));
    }
    write_file(dir, "apel-boinc.toml", &content)
}
