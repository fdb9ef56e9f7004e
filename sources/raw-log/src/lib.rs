use std::{collections::BTreeMap, io::Read, path::PathBuf};

use common::{
    chart::ChartSpec,
    extract::{Dataset, ExtractError, SkipReason},
    record::{
        CYCLE_SUCCESS_RATE, LATENCY_STATS, RunRecord, Topology, latency_metric, ok_rate_metric,
    },
    series::Aggregation,
    source::{Source, success_chart},
    util::first_number,
};
use eyre::{Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use result::parse_output;

pub mod result;

/// Captured load generator output, one CSV row per chunk of a log file. Each
/// file is one run; runs are plotted in user order without averaging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLog {
    pub path: PathBuf,
    /// Operations whose final stats are extracted
    pub operations: Vec<String>,
}

impl Default for RawLog {
    fn default() -> Self {
        Self {
            path: PathBuf::from("full_experiment_records.csv"),
            operations: vec!["create_post".to_owned(), "list_posts".to_owned()],
        }
    }
}

#[derive(Debug, Deserialize)]
struct LogRow {
    filename: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// User count of a log file: the first number once the topology token is
/// removed, so `bench_3node_1500.log` is 1500 users.
pub fn users_from_filename(filename: &str, topology: Topology) -> Result<u32, ExtractError> {
    first_number(&filename.replace(topology.filename_token(), "_"))
        .filter(|users| *users > 0)
        .ok_or_else(|| ExtractError::MissingUsers(filename.to_owned()))
}

/// `create_post` is shortened to `create` in filenames and `Create` in labels
fn short_name(op: &str) -> (&str, String) {
    let short = op.split('_').next().unwrap_or(op);
    let mut chars = short.chars();
    let label = chars
        .next()
        .map(|c| c.to_uppercase().chain(chars).collect())
        .unwrap_or_default();
    (short, label)
}

/// Concatenates the rows of each file in table order, files sorted by name
pub fn collect_files<R: Read>(reader: R) -> Result<BTreeMap<String, String>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut files: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (i, row) in reader.deserialize::<LogRow>().enumerate() {
        let row = row.context(format!("Parse row {}", i + 1))?;
        let Some(filename) = row.filename.filter(|f| !f.trim().is_empty()) else {
            continue;
        };
        files
            .entry(filename)
            .or_default()
            .push(row.content.unwrap_or_default());
    }
    Ok(files
        .into_iter()
        .map(|(filename, chunks)| (filename, chunks.join("\n")))
        .collect())
}

/// Extracts one record per classified file
pub fn read_logs<R: Read>(reader: R, operations: &[String]) -> Result<Dataset> {
    let mut dataset = Dataset::default();
    for (filename, text) in collect_files(reader)? {
        let Some(topology) = Topology::from_filename(&filename) else {
            debug!("{filename} is neither single nor 3node, skipping");
            dataset.skipped.record(SkipReason::Unclassified);
            continue;
        };
        let users = match users_from_filename(&filename, topology) {
            Ok(users) => users,
            Err(err) => {
                debug!("Skipping {filename}: {err}");
                dataset.skipped.record_err(&err);
                continue;
            }
        };

        let summary = parse_output(&text, operations, &mut dataset.skipped)
            .context(format!("Parse {filename}"))?;
        let record = summary.operations.values().fold(
            RunRecord::new(users, topology).with_metric(CYCLE_SUCCESS_RATE, summary.cycle_success_rate),
            |record, stats| record.with_operation(stats),
        );
        dataset.records.push(record);
    }
    Ok(dataset)
}

#[typetag::serde]
impl Source for RawLog {
    fn name(&self) -> &'static str {
        "raw-log"
    }

    fn aggregation(&self) -> Aggregation {
        Aggregation::Ordered
    }

    fn load(&self) -> Result<Dataset> {
        let file = std::fs::File::open(&self.path)
            .context(format!("Open log records {}", self.path.display()))?;
        read_logs(file, &self.operations).context(format!("Read {}", self.path.display()))
    }

    fn charts(&self) -> Vec<ChartSpec> {
        let mut charts = LATENCY_STATS
            .iter()
            .cartesian_product(self.operations.iter())
            .map(|(stat, op)| {
                ChartSpec::latency(
                    latency_metric(op, stat),
                    format!("{op} {} (ms)", stat.to_uppercase()),
                )
            })
            .collect::<Vec<_>>();
        charts.extend(self.operations.iter().map(|op| {
            let (short, label) = short_name(op);
            success_chart(ok_rate_metric(op), &label, format!("{short}_success_rate.png"))
        }));
        charts.push(success_chart(
            CYCLE_SUCCESS_RATE,
            "Cycle",
            "cycle_success_rate.png",
        ));
        charts
    }
}
