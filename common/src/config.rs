use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{chart::ChartStyle, source::Source};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the images are written to
    pub output_dir: PathBuf,
    /// Also write every chart's series to `<output_dir>/plot_data/<chart>.json`
    pub plot_data: bool,
    pub style: ChartStyle,
    /// Empty means the binary's built-in sources
    pub sources: Vec<Box<dyn Source>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            plot_data: false,
            style: ChartStyle::default(),
            sources: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = read_to_string(path).context(format!("Read config {}", path.display()))?;
        Self::parse(&data).context(format!("Parse config {}", path.display()))
    }

    pub fn parse(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(data)?)
    }

    pub fn plot_data_dir(&self) -> PathBuf {
        self.output_dir.join("plot_data")
    }
}
