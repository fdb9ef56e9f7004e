use common::{
    extract::{ExtractError, SkipReport, parse_number, parse_percent, success_rate},
    record::{CYCLE_SUCCESS_RATE, LOGIN_OK_RATE, RunRecord, Topology},
};
use serde::Deserialize;

/// One pre-aggregated run as written by the load generator's summary export.
/// Every cell is read as text so a bad value only loses that field.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TabulatedRow {
    pub users: Option<String>,
    pub create_post_ok_rate: Option<String>,
    pub list_posts_ok_rate: Option<String>,
    pub login_ok_rate: Option<String>,
    pub cycle_ok_num: Option<String>,
    pub cycle_ok_den: Option<String>,
    pub create_post_mean: Option<String>,
    pub create_post_p95: Option<String>,
    pub create_post_p99: Option<String>,
    pub list_posts_mean: Option<String>,
    pub list_posts_p95: Option<String>,
    pub list_posts_p99: Option<String>,
}

fn present(cell: &Option<String>) -> Option<&str> {
    cell.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl TabulatedRow {
    fn users(&self) -> Result<u32, ExtractError> {
        let raw = present(&self.users).unwrap_or_default();
        raw.parse::<u32>()
            .ok()
            .filter(|users| *users > 0)
            .ok_or_else(|| ExtractError::MissingUsers(raw.to_owned()))
    }

    fn cycle_success_rate(&self) -> Option<Result<f64, ExtractError>> {
        let parse_count = |cell: &str| {
            cell.parse::<u64>()
                .map_err(|_| ExtractError::Parse(cell.to_owned()))
        };
        let ok = present(&self.cycle_ok_num)?;
        let total = present(&self.cycle_ok_den)?;
        Some(parse_count(ok).and_then(|ok| success_rate(ok, parse_count(total)?)))
    }

    /// Builds the run record. Without a user count the row cannot be grouped
    /// and is rejected; any other bad cell only drops that metric.
    pub fn into_record(
        self,
        topology: Topology,
        skipped: &mut SkipReport,
    ) -> Result<RunRecord, ExtractError> {
        let users = self.users()?;

        let percents = [
            ("create_post_ok_rate", &self.create_post_ok_rate),
            ("list_posts_ok_rate", &self.list_posts_ok_rate),
            (LOGIN_OK_RATE, &self.login_ok_rate),
        ];
        let latencies = [
            ("create_post_mean", &self.create_post_mean),
            ("create_post_p95", &self.create_post_p95),
            ("create_post_p99", &self.create_post_p99),
            ("list_posts_mean", &self.list_posts_mean),
            ("list_posts_p95", &self.list_posts_p95),
            ("list_posts_p99", &self.list_posts_p99),
        ];

        let mut record = RunRecord::new(users, topology);
        for (name, cell) in percents {
            let value = present(cell).and_then(|cell| skipped.keep(parse_percent(cell)));
            record = record.with_metric(name, value);
        }
        for (name, cell) in latencies {
            let value = present(cell).and_then(|cell| skipped.keep(parse_number(cell)));
            record = record.with_metric(name, value);
        }
        let cycle = self
            .cycle_success_rate()
            .and_then(|rate| skipped.keep(rate));
        Ok(record.with_metric(CYCLE_SUCCESS_RATE, cycle))
    }
}

#[cfg(test)]
mod tests {
    use common::extract::SkipReason;

    use super::*;

    fn cell(s: &str) -> Option<String> {
        Some(s.to_owned())
    }

    #[test]
    fn full_row() {
        let row = TabulatedRow {
            users: cell("500"),
            create_post_ok_rate: cell("97.3%"),
            list_posts_ok_rate: cell("100%"),
            login_ok_rate: cell("99.5%"),
            cycle_ok_num: cell("97"),
            cycle_ok_den: cell("100"),
            create_post_mean: cell("12.5"),
            list_posts_p99: cell("80"),
            ..Default::default()
        };
        let mut skipped = SkipReport::default();
        let record = row.into_record(Topology::Single, &mut skipped).unwrap();

        assert_eq!(record.users, 500);
        assert_eq!(record.metric("create_post_ok_rate"), Some(97.3));
        assert_eq!(record.metric("list_posts_ok_rate"), Some(100.0));
        assert_eq!(record.metric(LOGIN_OK_RATE), Some(99.5));
        assert_eq!(record.metric(CYCLE_SUCCESS_RATE), Some(97.0));
        assert_eq!(record.metric("create_post_mean"), Some(12.5));
        assert_eq!(record.metric("list_posts_p99"), Some(80.0));
        assert_eq!(record.metric("create_post_p95"), None);
        assert!(skipped.is_empty());
    }

    #[test]
    fn bad_cells_only_drop_their_field() {
        let row = TabulatedRow {
            users: cell("100"),
            create_post_ok_rate: cell("n/a%"),
            list_posts_ok_rate: cell("95%"),
            cycle_ok_num: cell("5"),
            cycle_ok_den: cell("0"),
            create_post_mean: cell("fast"),
            ..Default::default()
        };
        let mut skipped = SkipReport::default();
        let record = row.into_record(Topology::ThreeNode, &mut skipped).unwrap();

        assert_eq!(record.metric("create_post_ok_rate"), None);
        assert_eq!(record.metric("create_post_mean"), None);
        assert_eq!(record.metric(CYCLE_SUCCESS_RATE), None);
        assert_eq!(record.metric("list_posts_ok_rate"), Some(95.0));
        assert_eq!(skipped.count(SkipReason::BadField), 2);
        assert_eq!(skipped.count(SkipReason::ZeroDenominator), 1);
    }

    #[test]
    fn users_are_required() {
        let mut skipped = SkipReport::default();
        for users in [None, cell(""), cell("abc"), cell("0")] {
            let row = TabulatedRow {
                users,
                ..Default::default()
            };
            assert!(matches!(
                row.into_record(Topology::Single, &mut skipped),
                Err(ExtractError::MissingUsers(_))
            ));
        }
    }
}
