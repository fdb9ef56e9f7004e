use std::collections::{BTreeMap, HashMap};

use common::{
    extract::{SkipReason, SkipReport, parse_number, parse_percent},
    record::{LATENCY_STATS, OperationStats},
};
use eyre::Result;
use regex::Regex;
use tracing::debug;

/// Columns of the per-operation table printed after every stage, in order.
/// Logs without a header line are read with this layout.
pub const COLUMNS: [&str; 17] = [
    "metric", "total", "ok", "fail", "timeout", "ok_rate", "avg", "mean", "min", "max", "p95",
    "p99", "p99.9", "2xx", "3xx", "4xx", "5xx",
];

/// Shorter lines are truncated output and rejected
pub const MIN_TOKENS: usize = 14;

/// Maps column names to token positions
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    positions: HashMap<String, usize>,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(COLUMNS)
    }
}

impl Layout {
    fn new<'a>(columns: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            positions: columns
                .into_iter()
                .enumerate()
                .map(|(i, c)| (c.to_owned(), i))
                .collect(),
        }
    }

    /// A table header line, accepted only if it names every column an
    /// operation line needs
    pub fn from_header(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.peek() != Some(&"metric") {
            return None;
        }
        let layout = Self::new(tokens);
        ["ok_rate"]
            .iter()
            .chain(LATENCY_STATS.iter())
            .all(|c| layout.positions.contains_key(*c))
            .then_some(layout)
    }

    fn field<'a>(&self, tokens: &[&'a str], column: &str) -> Option<&'a str> {
        tokens.get(*self.positions.get(column)?).copied()
    }

    /// Parses one operation line. `None` if the line is too short or any
    /// required field is not numeric.
    pub fn parse_line(&self, line: &str) -> Option<OperationStats> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < MIN_TOKENS {
            return None;
        }

        let number = |column: &str| parse_number(self.field(&tokens, column)?).ok();
        let success_rate = parse_percent(self.field(&tokens, "ok_rate")?).ok()?;

        Some(OperationStats {
            name: tokens[0].to_owned(),
            success_rate,
            mean: number(LATENCY_STATS[0])?,
            min: number(LATENCY_STATS[1])?,
            max: number(LATENCY_STATS[2])?,
            p95: number(LATENCY_STATS[3])?,
            p99: number(LATENCY_STATS[4])?,
            p999: number(LATENCY_STATS[5])?,
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LogSummary {
    pub cycle_success_rate: Option<f64>,
    pub operations: BTreeMap<String, OperationStats>,
}

/// Extracts the cycle success rate and the final stats of each tracked
/// operation from one file's log text. The cycle rate comes from the first
/// `cycle_ok=` match, progress lines included. For operations later lines
/// override earlier ones; if the last line of an operation is malformed the
/// operation is absent.
pub fn parse_output(
    output: &str,
    operations: &[String],
    skipped: &mut SkipReport,
) -> Result<LogSummary> {
    let re_cycle = Regex::new(r"cycle_ok=(\d+)/(\d+) \(([\d.]+)%\)")?;

    let cycle_success_rate = re_cycle
        .captures(output)
        .and_then(|cap| cap.get(3)?.as_str().parse::<f64>().ok());
    if cycle_success_rate.is_none() {
        skipped.record(SkipReason::MissingSummary);
    }

    let mut layout = Layout::default();
    let mut last_lines: HashMap<&str, (&str, Layout)> = HashMap::new();
    for line in output.lines() {
        let line = line.trim();
        if let Some(header) = Layout::from_header(line) {
            layout = header;
            continue;
        }
        let Some(first) = line.split_whitespace().next() else {
            continue;
        };
        if let Some(op) = operations.iter().find(|op| op.as_str() == first) {
            last_lines.insert(op.as_str(), (line, layout.clone()));
        }
    }

    let mut summary = LogSummary {
        cycle_success_rate,
        ..Default::default()
    };
    for (op, (line, layout)) in last_lines {
        match layout.parse_line(line) {
            Some(stats) => {
                summary.operations.insert(op.to_owned(), stats);
            }
            None => {
                debug!("Rejecting {op} line: {line}");
                skipped.record(SkipReason::RejectedLine);
            }
        }
    }
    Ok(summary)
}
