use std::path::{Path, PathBuf};

use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::{record::Topology, series::Series};

/// One chart of a source's fixed chart list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub metric: String,
    pub y_label: String,
    pub filename: String,
    /// Success rate charts are clamped to the style's `success_ylim`
    pub is_success: bool,
}

impl ChartSpec {
    pub fn latency(metric: impl Into<String>, y_label: impl Into<String>) -> Self {
        let metric = metric.into();
        Self {
            filename: format!("{metric}.png"),
            metric,
            y_label: y_label.into(),
            is_success: false,
        }
    }

    pub fn success(
        metric: impl Into<String>,
        y_label: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            metric: metric.into(),
            y_label: y_label.into(),
            filename: filename.into(),
            is_success: true,
        }
    }

    /// Filename without extension, used for the plot data dump
    pub fn stem(&self) -> &str {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.filename)
    }
}

/// Line and marker settings of one topology's trace. Fields omitted from a
/// config override fall back to [`TraceStyle::default`], not to the
/// topology's own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceStyle {
    pub linestyle: String,
    pub marker: String,
    pub color: String,
    pub markersize: f64,
    pub linewidth: f64,
    pub capsize: f64,
}

impl TraceStyle {
    pub fn single() -> Self {
        Self {
            linestyle: "--".to_owned(),
            marker: "o".to_owned(),
            color: "0.15".to_owned(),
            ..Default::default()
        }
    }

    pub fn three_node() -> Self {
        Self {
            linestyle: "-".to_owned(),
            marker: "s".to_owned(),
            color: "0.6".to_owned(),
            ..Default::default()
        }
    }
}

impl Default for TraceStyle {
    fn default() -> Self {
        Self {
            linestyle: "-".to_owned(),
            marker: "o".to_owned(),
            color: "0.0".to_owned(),
            markersize: 3.5,
            linewidth: 1.0,
            capsize: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontStyle {
    pub family: String,
    pub size: f64,
    pub axes_label_size: f64,
    pub legend_size: f64,
    pub tick_label_size: f64,
    pub axes_linewidth: f64,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            family: "serif".to_owned(),
            size: 9.0,
            axes_label_size: 10.0,
            legend_size: 9.0,
            tick_label_size: 8.0,
            axes_linewidth: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridStyle {
    pub linestyle: String,
    pub major_linewidth: f64,
    pub minor_linewidth: f64,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            linestyle: ":".to_owned(),
            major_linewidth: 0.6,
            minor_linewidth: 0.4,
        }
    }
}

/// Visual conventions shared by every chart. Passed to the renderer rather
/// than installed as global drawing defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    /// Inches
    pub figsize: (f64, f64),
    pub dpi: u32,
    pub font: FontStyle,
    pub single: TraceStyle,
    pub three_node: TraceStyle,
    pub x_label: String,
    pub x_major_tick: f64,
    pub x_minor_tick: f64,
    pub grid: GridStyle,
    /// y bounds of success rate charts, headroom above 100 keeps markers visible
    pub success_ylim: (f64, f64),
    pub legend_frame: bool,
    pub layout_pad: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            figsize: (3.5, 2.6),
            dpi: 300,
            font: FontStyle::default(),
            single: TraceStyle::single(),
            three_node: TraceStyle::three_node(),
            x_label: "Users".to_owned(),
            x_major_tick: 500.0,
            x_minor_tick: 250.0,
            grid: GridStyle::default(),
            success_ylim: (0.0, 105.0),
            legend_frame: false,
            layout_pad: 0.8,
        }
    }
}

impl ChartStyle {
    pub fn trace(&self, topology: Topology) -> &TraceStyle {
        match topology {
            Topology::Single => &self.single,
            Topology::ThreeNode => &self.three_node,
        }
    }

    pub fn ylim(&self, spec: &ChartSpec) -> Option<(f64, f64)> {
        spec.is_success.then_some(self.success_ylim)
    }
}

/// Everything needed to draw one image
#[derive(Debug, Clone)]
pub struct Chart<'a> {
    pub spec: &'a ChartSpec,
    pub style: &'a ChartStyle,
    pub single: Series,
    pub three_node: Series,
    pub output: PathBuf,
}

impl Chart<'_> {
    /// Series in drawing order
    pub fn series(&self) -> [&Series; 2] {
        [&self.single, &self.three_node]
    }
}

/// Draws a [`Chart`] into `chart.output`. Exactly one file per call.
pub trait Renderer {
    fn name(&self) -> &'static str;
    fn render(&self, chart: &Chart<'_>) -> Result<()>;
}
