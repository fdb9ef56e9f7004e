use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::RunRecord;

/// Recoverable extraction failures. These never abort a run, the affected
/// field or line is dropped and counted in a [`SkipReport`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Could not parse '{0}' as a number")]
    Parse(String),
    #[error("Division by zero while computing {0}")]
    Division(&'static str),
    #[error("No user count in '{0}'")]
    MissingUsers(String),
}

/// Parses `"97.3%"` (or a bare `"97.3"`) into `97.3`
pub fn parse_percent(value: &str) -> Result<f64, ExtractError> {
    parse_finite(value.trim().trim_end_matches('%').trim_end(), value)
}

/// `nan` and `inf` are rejected like any other non-numeric cell
pub fn parse_number(value: &str) -> Result<f64, ExtractError> {
    parse_finite(value.trim(), value)
}

fn parse_finite(trimmed: &str, value: &str) -> Result<f64, ExtractError> {
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .ok_or_else(|| ExtractError::Parse(value.to_owned()))
}

/// `100 * ok / total`
pub fn success_rate(ok: u64, total: u64) -> Result<f64, ExtractError> {
    if total == 0 {
        return Err(ExtractError::Division("success rate"));
    }
    Ok(100.0 * ok as f64 / total as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// A numeric field could not be parsed
    BadField,
    /// A success rate had a zero denominator
    ZeroDenominator,
    /// The row or file had no usable user count
    MissingUsers,
    /// Filename matched neither topology token
    Unclassified,
    /// An operation line was too short or malformed
    RejectedLine,
    /// No `cycle_ok=` summary line in a file
    MissingSummary,
}

impl SkipReason {
    fn name(&self) -> &'static str {
        match self {
            SkipReason::BadField => "bad_field",
            SkipReason::ZeroDenominator => "zero_denominator",
            SkipReason::MissingUsers => "missing_users",
            SkipReason::Unclassified => "unclassified",
            SkipReason::RejectedLine => "rejected_line",
            SkipReason::MissingSummary => "missing_summary",
        }
    }
}

impl From<&ExtractError> for SkipReason {
    fn from(err: &ExtractError) -> Self {
        match err {
            ExtractError::Parse(_) => SkipReason::BadField,
            ExtractError::Division(_) => SkipReason::ZeroDenominator,
            ExtractError::MissingUsers(_) => SkipReason::MissingUsers,
        }
    }
}

/// Counts of data silently dropped during extraction
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipReport {
    counts: BTreeMap<SkipReason, usize>,
}

impl SkipReport {
    pub fn record(&mut self, reason: SkipReason) {
        *self.counts.entry(reason).or_default() += 1;
    }

    pub fn record_err(&mut self, err: &ExtractError) {
        self.record(err.into());
    }

    /// Keeps the value, or counts the error and yields `None`
    pub fn keep<T>(&mut self, res: Result<T, ExtractError>) -> Option<T> {
        match res {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!("Skipping field: {err}");
                self.record_err(&err);
                None
            }
        }
    }

    pub fn count(&self, reason: SkipReason) -> usize {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn merge(&mut self, other: &SkipReport) {
        for (reason, count) in &other.counts {
            *self.counts.entry(*reason).or_default() += count;
        }
    }
}

impl Display for SkipReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("nothing skipped");
        }
        let parts = self
            .counts
            .iter()
            .map(|(reason, count)| format!("{}={count}", reason.name()))
            .collect::<Vec<_>>();
        f.write_str(&parts.join(" "))
    }
}

/// Output of a source's extraction step
#[derive(Debug, Default, Clone)]
pub struct Dataset {
    pub records: Vec<RunRecord>,
    pub skipped: SkipReport,
}

impl Dataset {
    pub fn extend(&mut self, other: Dataset) {
        self.records.extend(other.records);
        self.skipped.merge(&other.skipped);
    }
}
