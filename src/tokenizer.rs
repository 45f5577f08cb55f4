//! Positional tokenizer for BOINC accounting lines
//!
//! A line looks like
//! `endtime ue <ue> ct <cputime> fe <flops> nm <jobname> et <runtime> es <exit_status>`
//! and is split on runs of whitespace. Nothing is validated up front: a short line or a
//! non-numeric token only fails when the field at that position is read.

use crate::error::{ParseError, Result};

pub const END_TIME: usize = 0;
pub const CPU_TIME: usize = 4;
pub const JOB_LABEL: usize = 8;
pub const RUNTIME: usize = 10;

/// Tokens of one accounting line, borrowed from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine<'a> {
    tokens: Vec<&'a str>,
}

impl<'a> RawLine<'a> {
    pub fn tokenize(line: &'a str) -> Self {
        Self {
            tokens: line.split_whitespace().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn field(&self, index: usize) -> Result<&'a str> {
        self.tokens
            .get(index)
            .copied()
            .ok_or_else(|| ParseError::missing_token(index, self.tokens.len()))
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        let token = self.field(index)?;
        token
            .parse::<i64>()
            .map_err(|_| ParseError::bad_number(index, token, "integer"))
    }

    pub fn float(&self, index: usize) -> Result<f64> {
        let token = self.field(index)?;
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ParseError::bad_number(index, token, "number")),
        }
    }

    /// End time of the job in epoch seconds.
    pub fn end_time(&self) -> Result<i64> {
        self.int(END_TIME)
    }

    /// Raw end time token, used verbatim inside job names.
    pub fn end_time_token(&self) -> Result<&'a str> {
        self.field(END_TIME)
    }

    pub fn job_label(&self) -> Result<&'a str> {
        self.field(JOB_LABEL)
    }

    /// CPU seconds rounded to the nearest whole second.
    pub fn cpu_seconds(&self) -> Result<i64> {
        self.whole_seconds(CPU_TIME, self.float(CPU_TIME)?.round())
    }

    /// Runtime seconds with the fractional part dropped.
    pub fn runtime_seconds(&self) -> Result<i64> {
        self.whole_seconds(RUNTIME, self.float(RUNTIME)?.trunc())
    }

    // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
    fn whole_seconds(&self, index: usize, value: f64) -> Result<i64> {
        if value >= i64::MIN as f64 && value < i64::MAX as f64 {
            Ok(value as i64)
        } else {
            Err(ParseError::bad_number(index, self.field(index)?, "number of seconds"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "1700000000 ue 12.5 ct 360 fe 0 nm JOBLABEL12345 et 300 es 0";

    #[test]
    fn test_tokenize_positions() {
        let raw = RawLine::tokenize(LINE);
        assert_eq!(raw.len(), 12);
        assert_eq!(raw.end_time().unwrap(), 1_700_000_000);
        assert_eq!(raw.cpu_seconds().unwrap(), 360);
        assert_eq!(raw.job_label().unwrap(), "JOBLABEL12345");
        assert_eq!(raw.runtime_seconds().unwrap(), 300);
    }

    #[test]
    fn test_tokenize_collapses_whitespace() {
        let raw = RawLine::tokenize("  1  ue\t2   ct 3 \n");
        assert_eq!(raw.len(), 5);
        assert_eq!(raw.field(2).unwrap(), "2");
    }

    #[test]
    fn test_blank_line_is_empty() {
        assert!(RawLine::tokenize("   \t ").is_empty());
    }

    #[test]
    fn test_short_line_fails_on_access() {
        let raw = RawLine::tokenize("1700000000 ue 12.5 ct 360");
        assert_eq!(raw.cpu_seconds().unwrap(), 360);
        let err = raw.job_label().unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("token 8"));
    }

    #[test]
    fn test_rounding_and_truncation() {
        let raw = RawLine::tokenize("10 ue 0 ct 2.5 fe 0 nm x et 99.99 es 0");
        assert_eq!(raw.cpu_seconds().unwrap(), 3);
        assert_eq!(raw.runtime_seconds().unwrap(), 99);
    }

    #[test]
    fn test_non_numeric_tokens() {
        let raw = RawLine::tokenize("later ue 0 ct abc fe 0 nm x et NaN es 0");
        assert!(raw.end_time().unwrap_err().is_format());
        assert!(raw.cpu_seconds().unwrap_err().is_format());
        assert!(raw.runtime_seconds().unwrap_err().is_format());

        let huge = RawLine::tokenize("10 ue 0 ct 1e300 fe 0 nm x et -1e300 es 0");
        assert!(huge.cpu_seconds().unwrap_err().is_format());
        assert!(huge.runtime_seconds().unwrap_err().is_format());

        let negative = RawLine::tokenize("10 ue 0 ct -1e300 fe 0 nm x et 1e19 es 0");
        assert!(negative.cpu_seconds().unwrap_err().is_format());
        assert!(negative.runtime_seconds().unwrap_err().is_format());
    }
}
