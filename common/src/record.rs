use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

/// Deployment configuration a run was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Topology {
    Single,
    ThreeNode,
}

impl Topology {
    pub const ALL: [Topology; 2] = [Topology::Single, Topology::ThreeNode];

    /// Legend label
    pub fn label(&self) -> &'static str {
        match self {
            Topology::Single => "Single",
            Topology::ThreeNode => "3-Node",
        }
    }

    /// Token that marks a raw log filename as belonging to this topology
    pub fn filename_token(&self) -> &'static str {
        match self {
            Topology::Single => "single",
            Topology::ThreeNode => "3node",
        }
    }

    /// Classifies a filename by substring token. `single` is checked first.
    pub fn from_filename(filename: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|topology| filename.contains(topology.filename_token()))
    }
}

impl Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Latency statistics in the order they are printed by the load generator.
pub const LATENCY_STATS: [&str; 6] = ["mean", "min", "max", "p95", "p99", "p99.9"];

pub const CYCLE_SUCCESS_RATE: &str = "cycle_success_rate";
pub const LOGIN_OK_RATE: &str = "login_ok_rate";

pub fn latency_metric(op: &str, stat: &str) -> String {
    format!("{op}_{stat}")
}

pub fn ok_rate_metric(op: &str) -> String {
    format!("{op}_ok_rate")
}

/// Final measurement for one operation of a run.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    pub name: String,
    pub success_rate: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
    pub p999: f64,
}

impl OperationStats {
    /// Latency values paired with their [`LATENCY_STATS`] names
    pub fn latencies(&self) -> [(&'static str, f64); 6] {
        [
            (LATENCY_STATS[0], self.mean),
            (LATENCY_STATS[1], self.min),
            (LATENCY_STATS[2], self.max),
            (LATENCY_STATS[3], self.p95),
            (LATENCY_STATS[4], self.p99),
            (LATENCY_STATS[5], self.p999),
        ]
    }
}

/// One benchmark execution. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub users: u32,
    pub topology: Topology,
    metrics: BTreeMap<String, f64>,
}

impl RunRecord {
    pub fn new(users: u32, topology: Topology) -> Self {
        Self {
            users,
            topology,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        if let Some(value) = value {
            self.metrics.insert(name.into(), value);
        }
        self
    }

    /// Flattens an operation's stats into `<op>_<stat>` and `<op>_ok_rate`
    pub fn with_operation(mut self, stats: &OperationStats) -> Self {
        for (stat, value) in stats.latencies() {
            self.metrics.insert(latency_metric(&stats.name, stat), value);
        }
        self.metrics
            .insert(ok_rate_metric(&stats.name), stats.success_rate);
        self
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_filenames() {
        assert_eq!(
            Topology::from_filename("bench_single_1000.csv"),
            Some(Topology::Single)
        );
        assert_eq!(
            Topology::from_filename("bench_3node_1500.log"),
            Some(Topology::ThreeNode)
        );
        assert_eq!(Topology::from_filename("bench_unknown.log"), None);
    }

    #[test]
    fn operation_is_flattened() {
        let stats = OperationStats {
            name: "create_post".to_owned(),
            success_rate: 98.5,
            mean: 12.3,
            min: 4.1,
            max: 55.0,
            p95: 20.1,
            p99: 30.2,
            p999: 40.3,
        };
        let record = RunRecord::new(100, Topology::Single).with_operation(&stats);
        assert_eq!(record.metric("create_post_mean"), Some(12.3));
        assert_eq!(record.metric("create_post_p99.9"), Some(40.3));
        assert_eq!(record.metric("create_post_ok_rate"), Some(98.5));
        assert_eq!(record.metric("list_posts_mean"), None);
    }

    #[test]
    fn missing_values_are_not_stored() {
        let record = RunRecord::new(10, Topology::ThreeNode)
            .with_metric(CYCLE_SUCCESS_RATE, None)
            .with_metric(LOGIN_OK_RATE, Some(99.0));
        assert_eq!(record.metric(CYCLE_SUCCESS_RATE), None);
        assert_eq!(record.metrics().len(), 1);
    }
}
