use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    record::{RunRecord, Topology},
    util::{mean, population_stddev},
};

/// How repeated runs at the same user count are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    /// Group by `users`, plot mean with population stddev error bars
    MeanStd,
    /// One point per record, sorted by `users`, duplicates kept
    Ordered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub users: u32,
    pub value: f64,
    pub stddev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub topology: Topology,
    pub points: Vec<Point>,
}

impl Series {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            points: Vec::new(),
        }
    }

    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.users as f64).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Error bar lengths, only when every point carries one
    pub fn yerr(&self) -> Option<Vec<f64>> {
        if self.points.is_empty() {
            return None;
        }
        self.points.iter().map(|p| p.stddev).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Builds the series of `metric` for one topology. Records without the metric
/// are skipped. The result is sorted ascending by `users` whatever the input
/// order.
pub fn build_series(
    records: &[RunRecord],
    topology: Topology,
    metric: &str,
    aggregation: Aggregation,
) -> Series {
    let values = records
        .iter()
        .filter(|r| r.topology == topology)
        .filter_map(|r| r.metric(metric).map(|value| (r.users, value)));

    let points = match aggregation {
        Aggregation::Ordered => values
            .sorted_by_key(|(users, _)| *users)
            .map(|(users, value)| Point {
                users,
                value,
                stddev: None,
            })
            .collect(),
        Aggregation::MeanStd => {
            let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
            for (users, value) in values {
                groups.entry(users).or_default().push(value);
            }
            groups
                .into_iter()
                .filter_map(|(users, values)| {
                    Some(Point {
                        users,
                        value: mean(&values)?,
                        stddev: population_stddev(&values),
                    })
                })
                .collect()
        }
    };

    Series { topology, points }
}

/// Single and 3-Node series for one metric
pub fn build_pair(
    records: &[RunRecord],
    metric: &str,
    aggregation: Aggregation,
) -> (Series, Series) {
    (
        build_series(records, Topology::Single, metric, aggregation),
        build_series(records, Topology::ThreeNode, metric, aggregation),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(users: u32, topology: Topology, value: Option<f64>) -> RunRecord {
        RunRecord::new(users, topology).with_metric("m", value)
    }

    #[test]
    fn mean_std_groups_by_users() {
        let records = vec![
            record(500, Topology::Single, Some(10.0)),
            record(500, Topology::Single, Some(20.0)),
            record(250, Topology::Single, Some(3.0)),
            record(500, Topology::ThreeNode, Some(99.0)),
        ];
        let series = build_series(&records, Topology::Single, "m", Aggregation::MeanStd);
        assert_eq!(
            series.points,
            vec![
                Point {
                    users: 250,
                    value: 3.0,
                    stddev: Some(0.0)
                },
                Point {
                    users: 500,
                    value: 15.0,
                    stddev: Some(5.0)
                },
            ]
        );
        assert_eq!(series.yerr(), Some(vec![0.0, 5.0]));
    }

    #[test]
    fn ordered_sorts_scrambled_input() {
        let records = vec![
            record(1500, Topology::ThreeNode, Some(3.0)),
            record(500, Topology::ThreeNode, Some(1.0)),
            record(2000, Topology::ThreeNode, None),
            record(1000, Topology::ThreeNode, Some(2.0)),
            record(1000, Topology::ThreeNode, Some(2.5)),
        ];
        let series = build_series(&records, Topology::ThreeNode, "m", Aggregation::Ordered);
        assert_eq!(series.xs(), vec![500.0, 1000.0, 1000.0, 1500.0]);
        assert_eq!(series.ys(), vec![1.0, 2.0, 2.5, 3.0]);
        assert_eq!(series.yerr(), None);
        assert!(series.xs().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn missing_metric_yields_empty_series() {
        let records = vec![record(100, Topology::Single, None)];
        let (single, cluster) = build_pair(&records, "m", Aggregation::MeanStd);
        assert!(single.is_empty());
        assert!(cluster.is_empty());
        assert_eq!(single.yerr(), None);
    }
}
