use std::path::{Path, PathBuf};

use clap::Parser;
use common::{config::Config, matplotlib::Matplotlib, pipeline};
use eyre::Result;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod sources;

const DEFAULT_CONFIG: &str = "charts.yaml";
const MODULES: &[&str] = &["common", "tabulated", "raw_log"];

/// Single vs 3-Node latency and success rate charts from load test results
#[derive(Parser)]
struct Cli {
    /// YAML config, `charts.yaml` is used when present
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Only run the named sources (tabulated, raw-log)
    #[arg(short, long)]
    source: Vec<String>,
    /// Overrides the config's output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    #[arg(short, long)]
    log: Vec<String>,
}

fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("bench_charts={log_level}"));

    if !args.log.is_empty() {
        for log in &args.log {
            env_filter = env_filter.add_directive(log.parse()?);
        }
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    if let Err(err) = run(args) {
        error!("{err:#?}");
        return Err(err);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(DEFAULT_CONFIG),
        None => Ok(Config::default()),
    }
}

fn run(args: Cli) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }

    let renderer = Matplotlib;
    let mut total = 0;
    for source in sources::select(&config, &args.source)? {
        let summary = pipeline::run(source.as_ref(), &renderer, &config)?;
        info!(
            "{}: {} charts from {} runs, skipped: {}",
            summary.source,
            summary.charts.len(),
            summary.records,
            summary.skipped
        );
        total += summary.charts.len();
    }

    println!(
        "All graphs generated ({total} charts in {}).",
        config.output_dir.display()
    );
    Ok(())
}
