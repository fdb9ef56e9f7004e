use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    chart::{Chart, ChartSpec, Renderer},
    config::Config,
    extract::{Dataset, SkipReport},
    series::{Aggregation, Series, build_pair},
    source::Source,
};

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub source: String,
    pub records: usize,
    pub charts: Vec<PathBuf>,
    pub skipped: SkipReport,
}

#[derive(Serialize)]
struct PlotData<'a> {
    metric: &'a str,
    y_label: &'a str,
    series: [&'a Series; 2],
}

/// Extracts the source's runs and renders its whole chart list
pub fn run(source: &dyn Source, renderer: &dyn Renderer, config: &Config) -> Result<RunSummary> {
    let dataset = source
        .load()
        .context(format!("Load {} source", source.name()))?;
    info!(
        "{}: extracted {} runs ({})",
        source.name(),
        dataset.records.len(),
        dataset.skipped
    );
    if !dataset.skipped.is_empty() {
        warn!(
            "{}: dropped {} malformed or unclassified entries: {}",
            source.name(),
            dataset.skipped.total(),
            dataset.skipped
        );
    }

    let charts = render_charts(
        &dataset,
        &source.charts(),
        source.aggregation(),
        renderer,
        config,
    )?;

    Ok(RunSummary {
        source: source.name().to_owned(),
        records: dataset.records.len(),
        charts,
        skipped: dataset.skipped,
    })
}

pub fn render_charts(
    dataset: &Dataset,
    specs: &[ChartSpec],
    aggregation: Aggregation,
    renderer: &dyn Renderer,
    config: &Config,
) -> Result<Vec<PathBuf>> {
    if !config.output_dir.exists() {
        fs::create_dir_all(&config.output_dir)?;
    }

    let mut outputs = Vec::with_capacity(specs.len());
    for spec in specs {
        let (single, three_node) = build_pair(&dataset.records, &spec.metric, aggregation);
        debug!(
            "{}: {} single points, {} 3-node points",
            spec.metric,
            single.len(),
            three_node.len()
        );

        if config.plot_data {
            write_plot_data(&config.plot_data_dir(), spec, [&single, &three_node])?;
        }

        let chart = Chart {
            spec,
            style: &config.style,
            single,
            three_node,
            output: config.output_dir.join(&spec.filename),
        };
        renderer
            .render(&chart)
            .context(format!("Render {} with {}", spec.filename, renderer.name()))?;
        outputs.push(chart.output);
    }
    Ok(outputs)
}

fn write_plot_data(dir: &Path, spec: &ChartSpec, series: [&Series; 2]) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    let data = PlotData {
        metric: &spec.metric,
        y_label: &spec.y_label,
        series,
    };
    let path = dir.join(format!("{}.json", spec.stem()));
    fs::write(&path, serde_json::to_string(&data)?)
        .context(format!("Write plot data {}", path.display()))?;
    Ok(())
}
