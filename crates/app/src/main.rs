use std::{cell::RefCell, path::PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wasm_panel_core::{
    AppConfig, Arg, ControlState, FilterResponses, LivePanel, PlotConfig, Value, WasmApi, WasmPanelError,
};

fn main() -> wasm_panel_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Exports => run_exports(),
        Commands::Render {
            config,
            set,
            output,
            html,
        } => run_render(config, &set, output, html),
        Commands::Curve { config, set, points } => run_curve(config, &set, points),
    }
}

fn run_exports() -> wasm_panel_core::Result<()> {
    let api = pollster::block_on(WasmApi::load(FilterResponses::instantiate))?;
    for name in api.names() {
        println!("{name}");
    }
    Ok(())
}

fn run_render(
    config: Option<PathBuf>,
    edits: &[(String, String)],
    output: Option<PathBuf>,
    html: Option<PathBuf>,
) -> wasm_panel_core::Result<()> {
    let config = load_config(config)?;
    let latest = RefCell::new(String::new());
    let plot = config.plot.clone();

    let live = drive(&config, edits, |api, state, first| {
        let svg = draw(api, state, &plot)?;
        tracing::info!(first, bytes = svg.len(), "redrew filter response");
        *latest.borrow_mut() = svg;
        Ok(())
    })?;

    if let Some(path) = html {
        tracing::info!(?path, "writing control panel");
        std::fs::write(path, live.render_html())?;
    }

    let svg = latest.borrow();
    match output {
        Some(path) => {
            tracing::info!(?path, "writing plot");
            std::fs::write(path, svg.as_bytes())?;
        }
        None => println!("{svg}"),
    }
    Ok(())
}

fn run_curve(config: Option<PathBuf>, edits: &[(String, String)], points: u32) -> wasm_panel_core::Result<()> {
    let config = load_config(config)?;
    let curve = RefCell::new(Vec::new());

    drive(&config, edits, |api, state, _| {
        api.call(
            "responseCurve",
            [
                Arg::from(state.text("type")?),
                Arg::from(state.number("freq")?),
                Arg::from(state.number("octaves")?),
                Arg::from(state.number("db")?),
                Arg::from(f64::from(points)),
                Arg::callback(|value: Value| {
                    if let Some(array) = value.as_array() {
                        *curve.borrow_mut() = array.to_f64_vec();
                    }
                }),
            ],
        )?;
        Ok(())
    })?;

    let curve = curve.borrow();
    let last = curve.len().saturating_sub(1).max(1) as f64;
    for (index, db) in curve.iter().enumerate() {
        println!("{:.6}\t{db:.3}", 0.5 * index as f64 / last);
    }
    Ok(())
}

/// Runs the configured panel against the filter module and replays `edits`
/// as one control change each.
fn drive<H>(
    config: &AppConfig,
    edits: &[(String, String)],
    on_change: H,
) -> wasm_panel_core::Result<LivePanel<FilterResponses, H>>
where
    H: FnMut(&WasmApi<FilterResponses>, &ControlState, bool) -> wasm_panel_core::Result<()>,
{
    let panel = config.panel()?;
    tracing::info!(controls = config.controls.len(), "starting control panel");

    let mut live = pollster::block_on(panel.run(FilterResponses::instantiate, on_change))?;
    for (key, value) in edits {
        tracing::debug!(%key, %value, "applying edit");
        live.apply(key, value)?;
    }
    Ok(live)
}

fn draw(api: &WasmApi<FilterResponses>, state: &ControlState, plot: &PlotConfig) -> wasm_panel_core::Result<String> {
    let result = api.call(
        "filterGraph",
        [
            Arg::from(plot.width),
            Arg::from(plot.height),
            Arg::from(state.text("type")?),
            Arg::from(state.number("freq")?),
            Arg::from(state.flag("logFreq")?),
            Arg::from(state.number("octaves")?),
            Arg::from(state.number("db")?),
        ],
    )?;

    match result {
        Some(Value::Text(svg)) => Ok(svg),
        _ => Err(WasmPanelError::msg("filterGraph did not produce a plot")),
    }
}

fn load_config(path: Option<PathBuf>) -> wasm_panel_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn parse_edit(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive a compiled module from a control panel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the wrapped exports of the filter response module.
    Exports,
    /// Plot the filter response for the panel state after the given edits.
    Render {
        /// JSON panel configuration; the built-in filter controls when absent.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Control edit to apply, as KEY=VALUE. May be repeated.
        #[arg(short, long, value_parser = parse_edit)]
        set: Vec<(String, String)>,
        /// Where to write the SVG plot; stdout when absent.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write the control panel as an HTML table.
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Print the sampled response curve as frequency/dB pairs.
    Curve {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, value_parser = parse_edit)]
        set: Vec<(String, String)>,
        /// Number of evenly spaced points from DC to Nyquist.
        #[arg(short, long, default_value_t = 65)]
        points: u32,
    },
}
