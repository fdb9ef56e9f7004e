use std::fs;

use eyre::{ContextCompat, Result, eyre};
use pyo3::{
    Bound, PyAny, PyResult, Python,
    types::{PyAnyMethods, PyDict, PyDictMethods, PyModule},
};
use tracing::debug;

use crate::{
    chart::{Chart, ChartStyle, Renderer, TraceStyle},
    series::Series,
};

/// Renders charts through the embedded Python interpreter's matplotlib
#[derive(Debug, Default, Clone)]
pub struct Matplotlib;

impl Matplotlib {
    /// Whether matplotlib can be imported by the embedded interpreter
    pub fn available() -> bool {
        Python::with_gil(|py| py.import("matplotlib").is_ok())
    }
}

impl Renderer for Matplotlib {
    fn name(&self) -> &'static str {
        "matplotlib"
    }

    fn render(&self, chart: &Chart<'_>) -> Result<()> {
        if let Some(parent) = chart.output.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }
        let output = chart
            .output
            .to_str()
            .wrap_err_with(|| format!("Invalid output path {:?}", chart.output))?;

        debug!("Rendering {output}");
        let result: PyResult<()> = Python::with_gil(|py| {
            let mpl = py.import("matplotlib")?;
            mpl.call_method1("use", ("Agg",))?;
            let plt = py.import("matplotlib.pyplot")?;
            let ticker = py.import("matplotlib.ticker")?;

            // rc_context restores the previous defaults on exit
            let rc = rc_params(py, chart.style)?;
            let ctx = plt.call_method1("rc_context", (rc,))?;
            ctx.call_method0("__enter__")?;
            let drawn = draw(py, &plt, &ticker, chart, output);
            ctx.call_method1("__exit__", (py.None(), py.None(), py.None()))?;
            drawn
        });
        result.map_err(|err| eyre!("Rendering {output}: {err}"))?;
        Ok(())
    }
}

fn rc_params<'py>(py: Python<'py>, style: &ChartStyle) -> PyResult<Bound<'py, PyDict>> {
    let rc = PyDict::new(py);
    rc.set_item("font.family", &style.font.family)?;
    rc.set_item("font.size", style.font.size)?;
    rc.set_item("axes.labelsize", style.font.axes_label_size)?;
    rc.set_item("legend.fontsize", style.font.legend_size)?;
    rc.set_item("xtick.labelsize", style.font.tick_label_size)?;
    rc.set_item("ytick.labelsize", style.font.tick_label_size)?;
    rc.set_item("axes.linewidth", style.font.axes_linewidth)?;
    Ok(rc)
}

fn draw(
    py: Python<'_>,
    plt: &Bound<'_, PyModule>,
    ticker: &Bound<'_, PyModule>,
    chart: &Chart<'_>,
    output: &str,
) -> PyResult<()> {
    let style = chart.style;
    let kwargs = PyDict::new(py);
    kwargs.set_item("figsize", style.figsize)?;
    let subplots = plt.call_method("subplots", (), Some(&kwargs))?;
    let (fig, ax): (Bound<'_, PyAny>, Bound<'_, PyAny>) = subplots.extract()?;

    // the figure is closed whatever happens while drawing
    let drawn = draw_axes(py, &fig, &ax, ticker, chart, output);
    plt.call_method1("close", (&fig,))?;
    drawn
}

fn draw_axes(
    py: Python<'_>,
    fig: &Bound<'_, PyAny>,
    ax: &Bound<'_, PyAny>,
    ticker: &Bound<'_, PyModule>,
    chart: &Chart<'_>,
    output: &str,
) -> PyResult<()> {
    let style = chart.style;
    for series in chart.series() {
        plot_series(py, ax, series, style.trace(series.topology))?;
    }

    ax.call_method1("set_xlabel", (&style.x_label,))?;
    ax.call_method1("set_ylabel", (&chart.spec.y_label,))?;

    let xaxis = ax.getattr("xaxis")?;
    let major = ticker.call_method1("MultipleLocator", (style.x_major_tick,))?;
    let minor = ticker.call_method1("MultipleLocator", (style.x_minor_tick,))?;
    xaxis.call_method1("set_major_locator", (major,))?;
    xaxis.call_method1("set_minor_locator", (minor,))?;

    for (which, linewidth) in [
        ("major", style.grid.major_linewidth),
        ("minor", style.grid.minor_linewidth),
    ] {
        let kwargs = PyDict::new(py);
        kwargs.set_item("which", which)?;
        kwargs.set_item("linestyle", &style.grid.linestyle)?;
        kwargs.set_item("linewidth", linewidth)?;
        ax.call_method("grid", (), Some(&kwargs))?;
    }

    if let Some((bottom, top)) = style.ylim(chart.spec) {
        ax.call_method1("set_ylim", (bottom, top))?;
    }

    let kwargs = PyDict::new(py);
    kwargs.set_item("frameon", style.legend_frame)?;
    ax.call_method("legend", (), Some(&kwargs))?;

    let kwargs = PyDict::new(py);
    kwargs.set_item("pad", style.layout_pad)?;
    fig.call_method("tight_layout", (), Some(&kwargs))?;

    let kwargs = PyDict::new(py);
    kwargs.set_item("dpi", style.dpi)?;
    kwargs.set_item("bbox_inches", "tight")?;
    kwargs.set_item("format", "png")?;
    fig.call_method("savefig", (output,), Some(&kwargs))?;
    Ok(())
}

fn plot_series(
    py: Python<'_>,
    ax: &Bound<'_, PyAny>,
    series: &Series,
    trace: &TraceStyle,
) -> PyResult<()> {
    let kwargs = trace_kwargs(py, series, trace)?;
    let method = if kwargs.contains("yerr")? {
        "errorbar"
    } else {
        "plot"
    };
    ax.call_method(method, (series.xs(), series.ys()), Some(&kwargs))?;
    Ok(())
}

/// Keyword arguments of one trace, with error bars when the series has them
fn trace_kwargs<'py>(
    py: Python<'py>,
    series: &Series,
    trace: &TraceStyle,
) -> PyResult<Bound<'py, PyDict>> {
    let kwargs = PyDict::new(py);
    kwargs.set_item("linestyle", &trace.linestyle)?;
    kwargs.set_item("marker", &trace.marker)?;
    kwargs.set_item("markersize", trace.markersize)?;
    kwargs.set_item("linewidth", trace.linewidth)?;
    kwargs.set_item("color", &trace.color)?;
    kwargs.set_item("label", series.topology.label())?;
    if let Some(yerr) = series.yerr() {
        kwargs.set_item("yerr", yerr)?;
        kwargs.set_item("capsize", trace.capsize)?;
    }
    Ok(kwargs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chart::ChartSpec,
        record::Topology,
        series::{Point, Series},
    };

    fn series(topology: Topology, stddev: Option<f64>) -> Series {
        Series {
            topology,
            points: (1..=4)
                .map(|i| Point {
                    users: i * 250,
                    value: 90.0 + i as f64,
                    stddev,
                })
                .collect(),
        }
    }

    #[test]
    fn renders_png() {
        if !Matplotlib::available() {
            eprintln!("matplotlib not importable, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let style = ChartStyle::default();
        let spec = ChartSpec::success("cycle_success_rate", "Cycle Success Rate (%)", "cycle.png");

        let chart = Chart {
            spec: &spec,
            style: &style,
            single: series(Topology::Single, Some(1.5)),
            three_node: series(Topology::ThreeNode, None),
            output: dir.path().join("nested").join(&spec.filename),
        };
        Matplotlib.render(&chart).unwrap();

        let bytes = fs::read(&chart.output).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    fn float_item(dict: &Bound<'_, PyDict>, key: &str) -> f64 {
        dict.get_item(key).unwrap().unwrap().extract::<f64>().unwrap()
    }

    fn str_item(dict: &Bound<'_, PyDict>, key: &str) -> String {
        dict.get_item(key).unwrap().unwrap().extract::<String>().unwrap()
    }

    #[test]
    fn rc_params_follow_style() {
        Python::with_gil(|py| {
            let rc = rc_params(py, &ChartStyle::default()).unwrap();
            assert_eq!(str_item(&rc, "font.family"), "serif");
            assert_eq!(float_item(&rc, "font.size"), 9.0);
            assert_eq!(float_item(&rc, "axes.labelsize"), 10.0);
            assert_eq!(float_item(&rc, "legend.fontsize"), 9.0);
            assert_eq!(float_item(&rc, "xtick.labelsize"), 8.0);
            assert_eq!(float_item(&rc, "ytick.labelsize"), 8.0);
            assert_eq!(float_item(&rc, "axes.linewidth"), 1.0);
        });
    }

    #[test]
    fn trace_kwargs_per_topology() {
        let style = ChartStyle::default();
        Python::with_gil(|py| {
            let single = series(Topology::Single, Some(1.5));
            let kwargs = trace_kwargs(py, &single, style.trace(Topology::Single)).unwrap();
            assert_eq!(str_item(&kwargs, "linestyle"), "--");
            assert_eq!(str_item(&kwargs, "marker"), "o");
            assert_eq!(str_item(&kwargs, "color"), "0.15");
            assert_eq!(str_item(&kwargs, "label"), "Single");
            assert_eq!(float_item(&kwargs, "markersize"), 3.5);
            assert_eq!(float_item(&kwargs, "linewidth"), 1.0);
            assert_eq!(float_item(&kwargs, "capsize"), 2.0);
            assert!(kwargs.contains("yerr").unwrap());

            let cluster = series(Topology::ThreeNode, None);
            let kwargs = trace_kwargs(py, &cluster, style.trace(Topology::ThreeNode)).unwrap();
            assert_eq!(str_item(&kwargs, "linestyle"), "-");
            assert_eq!(str_item(&kwargs, "marker"), "s");
            assert_eq!(str_item(&kwargs, "color"), "0.6");
            assert_eq!(str_item(&kwargs, "label"), "3-Node");
            assert!(!kwargs.contains("yerr").unwrap());
            assert!(!kwargs.contains("capsize").unwrap());
        });
    }

    #[test]
    fn renders_empty_series() {
        if !Matplotlib::available() {
            eprintln!("matplotlib not importable, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let style = ChartStyle::default();
        let spec = ChartSpec::latency("list_posts_p99", "List P99 (ms)");

        let chart = Chart {
            spec: &spec,
            style: &style,
            single: Series::new(Topology::Single),
            three_node: Series::new(Topology::ThreeNode),
            output: dir.path().join(&spec.filename),
        };
        Matplotlib.render(&chart).unwrap();
        assert!(chart.output.is_file());
    }
}
