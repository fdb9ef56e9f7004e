use core::fmt::Debug;

use dyn_clone::{DynClone, clone_trait_object};
use eyre::Result;

use crate::{chart::ChartSpec, extract::Dataset, series::Aggregation};

/// An input format: how runs are extracted, how repeated runs are combined and
/// which charts are drawn from them.
#[typetag::serde(tag = "type")]
pub trait Source: Debug + DynClone {
    /// Name used to select the source on the command line
    fn name(&self) -> &'static str;
    fn aggregation(&self) -> Aggregation;
    /// Reads and extracts every run. Malformed rows and lines are skipped and
    /// counted, missing inputs or broken CSV are errors.
    fn load(&self) -> Result<Dataset>;
    /// The fixed chart list, in rendering order
    fn charts(&self) -> Vec<ChartSpec>;
}
clone_trait_object!(Source);

/// Success rate charts shared by every source
pub fn success_chart(
    metric: impl Into<String>,
    label: &str,
    filename: impl Into<String>,
) -> ChartSpec {
    ChartSpec::success(metric, format!("{label} Success Rate (%)"), filename)
}
