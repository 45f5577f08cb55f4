//! High-water-mark resolution
//!
//! The checkpoint of a record kind is the latest end time already stored for jobs named by
//! this node. It is re-read from the backing store at parser setup instead of being kept in a
//! side file, so re-running over overlapping logs never emits a line that is already stored:
//! every line ending before the checkpoint is dropped by the parser.
//!
//! Two runs over the same source at the same time can both see the same checkpoint. Callers
//! serialise runs; nothing here locks.

use crate::error::{ParseError, Result};
use crate::job_identity::JobIdentity;
use crate::models::RecordKind;
use crate::timestamp_parser::TimestampParser;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The one query the resolver needs from a backing store.
pub trait CheckpointStore {
    /// `MAX(time_column)` over `table` rows whose `name_column` is `LIKE pattern`, as epoch
    /// seconds. `None` when no row matches.
    fn max_timestamp(
        &self,
        table: &str,
        time_column: &str,
        name_column: &str,
        pattern: &str,
    ) -> Result<Option<i64>>;
}

/// SQLite database holding `EventRecords` and `BlahdRecords`.
///
/// A connection is opened read-only for each query and dropped before returning.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            ParseError::BackingStore(format!("cannot open {}: {}", self.path.display(), e))
        })
    }
}

impl CheckpointStore for SqliteStore {
    fn max_timestamp(
        &self,
        table: &str,
        time_column: &str,
        name_column: &str,
        pattern: &str,
    ) -> Result<Option<i64>> {
        let query = format!(
            "SELECT MAX({time}) FROM {table} WHERE {name} LIKE ?1 ESCAPE '\\'",
            time = quote_identifier(time_column),
            table = quote_identifier(table),
            name = quote_identifier(name_column),
        );
        debug!(query = %query, pattern = %pattern, "Querying checkpoint");

        let conn = self.open()?;
        let value = conn.query_row(&query, [pattern], |row| {
            Ok(match row.get_ref(0)? {
                ValueRef::Null => StoredTime::Missing,
                ValueRef::Integer(secs) => StoredTime::Epoch(secs),
                ValueRef::Real(secs) => StoredTime::Epoch(secs.trunc() as i64),
                ValueRef::Text(bytes) => StoredTime::Text(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(_) => StoredTime::Unsupported,
            })
        })?;
        drop(conn);

        match value {
            StoredTime::Missing => Ok(None),
            StoredTime::Epoch(secs) => Ok(Some(secs)),
            StoredTime::Text(text) => TimestampParser::epoch_seconds(&text).map(Some),
            StoredTime::Unsupported => Err(ParseError::BackingStore(format!(
                "{}.{} holds a blob, expected a timestamp",
                table, time_column
            ))),
        }
    }
}

enum StoredTime {
    Missing,
    Epoch(i64),
    Text(String),
    Unsupported,
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Latest end time already ingested for `kind` by the node `identity` names; 0 when the
/// store has nothing for this node.
pub fn resolve_checkpoint(
    store: &dyn CheckpointStore,
    kind: RecordKind,
    identity: &JobIdentity,
) -> Result<i64> {
    let pattern = identity.like_pattern();
    let checkpoint = store
        .max_timestamp(kind.table(), kind.time_column(), kind.name_column(), &pattern)?
        .unwrap_or(0);

    info!(kind = %kind, pattern = %pattern, "last parsed endtime : {}", checkpoint);
    Ok(checkpoint)
}
