//! Job name construction
//!
//! Names have to fit the upstream `JobName`/`LrmsId` columns, so the current layout keeps only
//! the first [`MAX_LABEL_CHARS`] characters of the BOINC job label. Two jobs finishing in the
//! same second with the same label prefix collide; nothing here tries to prevent that.

use crate::models::FormatVersion;

pub const SEPARATOR: char = '.';
pub const MAX_LABEL_CHARS: usize = 10;

/// Builds job names for one ingesting node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobIdentity {
    prefix: String,
    hostname: String,
    version: FormatVersion,
}

impl JobIdentity {
    pub fn new(prefix: impl Into<String>, hostname: impl Into<String>, version: FormatVersion) -> Self {
        Self {
            prefix: prefix.into(),
            hostname: hostname.into(),
            version,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn build(&self, end_time: &str, label: &str) -> String {
        match self.version {
            FormatVersion::Current => {
                build_job_name(&self.prefix, &self.hostname, end_time, label)
            }
            FormatVersion::Legacy => build_legacy_job_name(&self.hostname, label),
        }
    }

    /// LIKE pattern matching every name this node produces in the current layout.
    ///
    /// `%`, `_` and the escape character itself are escaped with [`LIKE_ESCAPE`], so the
    /// pattern must be used with `ESCAPE '\'`.
    pub fn like_pattern(&self) -> String {
        format!(
            "{}{sep}{}{sep}%",
            escape_like(&self.prefix),
            escape_like(&self.hostname),
            sep = SEPARATOR
        )
    }
}

pub const LIKE_ESCAPE: char = '\\';

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// `<prefix>.<hostname>.<end_time>.<label[..10]>`
pub fn build_job_name(prefix: &str, hostname: &str, end_time: &str, label: &str) -> String {
    let short_label: String = label.chars().take(MAX_LABEL_CHARS).collect();
    let mut name = String::with_capacity(max_job_name_len(prefix, hostname, end_time));
    name.push_str(prefix);
    name.push(SEPARATOR);
    name.push_str(hostname);
    name.push(SEPARATOR);
    name.push_str(end_time);
    name.push(SEPARATOR);
    name.push_str(&short_label);
    name
}

/// `<hostname>.<label>`, the layout written before end times were part of the name.
pub fn build_legacy_job_name(hostname: &str, label: &str) -> String {
    format!("{}{}{}", hostname, SEPARATOR, label)
}

/// Upper bound, in characters, of a name produced by [`build_job_name`].
pub fn max_job_name_len(prefix: &str, hostname: &str, end_time: &str) -> usize {
    prefix.chars().count() + hostname.chars().count() + end_time.chars().count() + MAX_LABEL_CHARS + 3
}
