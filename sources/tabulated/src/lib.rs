use std::{io::Read, path::PathBuf};

use common::{
    chart::ChartSpec,
    extract::Dataset,
    record::{CYCLE_SUCCESS_RATE, Topology},
    series::Aggregation,
    source::{Source, success_chart},
};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use row::TabulatedRow;

pub mod row;

/// Pre-aggregated per-run metrics, one CSV per topology. Repeated runs at the
/// same user count are averaged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tabulated {
    pub single: PathBuf,
    pub cluster: PathBuf,
}

impl Default for Tabulated {
    fn default() -> Self {
        Self {
            single: PathBuf::from("single_node_result.csv"),
            cluster: PathBuf::from("three_node_result.csv"),
        }
    }
}

const LATENCY_CHARTS: [(&str, &str); 6] = [
    ("create_post_mean", "Create Mean (ms)"),
    ("create_post_p95", "Create P95 (ms)"),
    ("create_post_p99", "Create P99 (ms)"),
    ("list_posts_mean", "List Mean (ms)"),
    ("list_posts_p95", "List P95 (ms)"),
    ("list_posts_p99", "List P99 (ms)"),
];

/// Reads every row of one topology's table. Broken CSV structure is fatal,
/// bad cells are skipped and counted.
pub fn read_rows<R: Read>(reader: R, topology: Topology) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut dataset = Dataset::default();
    for (i, row) in reader.deserialize::<TabulatedRow>().enumerate() {
        let row = row.context(format!("Parse row {}", i + 1))?;
        match row.into_record(topology, &mut dataset.skipped) {
            Ok(record) => dataset.records.push(record),
            Err(err) => {
                debug!("Dropping {topology} row {}: {err}", i + 1);
                dataset.skipped.record_err(&err);
            }
        }
    }
    Ok(dataset)
}

#[typetag::serde]
impl Source for Tabulated {
    fn name(&self) -> &'static str {
        "tabulated"
    }

    fn aggregation(&self) -> Aggregation {
        Aggregation::MeanStd
    }

    fn load(&self) -> Result<Dataset> {
        let mut dataset = Dataset::default();
        for (topology, path) in [
            (Topology::Single, &self.single),
            (Topology::ThreeNode, &self.cluster),
        ] {
            let file = std::fs::File::open(path)
                .context(format!("Open {topology} results {}", path.display()))?;
            let rows =
                read_rows(file, topology).context(format!("Read {}", path.display()))?;
            debug!("{}: {} runs", path.display(), rows.records.len());
            dataset.extend(rows);
        }
        Ok(dataset)
    }

    fn charts(&self) -> Vec<ChartSpec> {
        let mut charts = LATENCY_CHARTS
            .iter()
            .map(|(metric, label)| ChartSpec::latency(*metric, *label))
            .collect::<Vec<_>>();
        charts.push(success_chart(
            "create_post_ok_rate",
            "Create",
            "create_success.png",
        ));
        charts.push(success_chart("list_posts_ok_rate", "List", "list_success.png"));
        charts.push(success_chart(CYCLE_SUCCESS_RATE, "Cycle", "cycle_success.png"));
        charts
    }
}
