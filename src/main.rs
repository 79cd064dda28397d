//! SVG Gauge CLI
//!
//! Command-line interface for rendering gauges to SVG files, exporting
//! animation frames and watching live host metrics.

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use svg_gauge::config::{get_config_path, load_options};
use svg_gauge::utils::parsing::{parse_assignment, parse_metric};
use svg_gauge::utils::SystemMetrics;
use svg_gauge::{Container, Gauge, GaugeOptions, ManualClock, SvgDocument};

// =============================================================================
// CLI Arguments
// =============================================================================

/// SVG Gauge Tool
#[derive(Parser, Debug)]
#[command(name = "svg-gauge-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a settled gauge to an SVG file
    Render {
        /// Gauge options JSON file (default: <config dir>/svg-gauge/gauge.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Value to display
        #[arg(long, allow_negative_numbers = true)]
        value: Option<f64>,

        /// Option override, e.g. --set max=250 --set donut=true
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Output file
        #[arg(short, long, default_value = "gauge.svg")]
        output: PathBuf,
    },

    /// Render every frame of a refresh animation
    Frames {
        /// Gauge options JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Option override, e.g. --set refreshAnimationType=bounce
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Starting value (default: the configured value)
        #[arg(long, allow_negative_numbers = true)]
        from: Option<f64>,

        /// Target value
        #[arg(long, allow_negative_numbers = true)]
        to: f64,

        /// Frames per second
        #[arg(long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..=240))]
        fps: u32,

        /// Directory for frame_0000.svg, frame_0001.svg, ...
        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Print the documented default options as JSON
    Defaults,

    /// Continuously render a host metric to an SVG file
    Monitor {
        /// Metric: cpu, memory, or temp
        #[arg(short, long, default_value = "cpu")]
        metric: String,

        /// Sampling interval in seconds
        #[arg(short, long, default_value = "1")]
        interval: u64,

        /// Animation frames per second
        #[arg(long, default_value = "20", value_parser = clap::value_parser!(u32).range(1..=120))]
        fps: u32,

        /// Gauge options JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file, rewritten every frame
        #[arg(short, long, default_value = "monitor.svg")]
        output: PathBuf,
    },
}

// =============================================================================
// Logging
// =============================================================================

/// Minimal stderr sink for the `log` facade.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    log::set_logger(&LOGGER).map_err(|e| anyhow!("Failed to install logger: {}", e))?;
    log::set_max_level(level);
    Ok(())
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    match args.command {
        Command::Render {
            config,
            value,
            set,
            output,
        } => cmd_render(config.as_deref(), value, &set, &output),
        Command::Frames {
            config,
            set,
            from,
            to,
            fps,
            out_dir,
        } => cmd_frames(config.as_deref(), &set, from, to, fps, &out_dir),
        Command::Defaults => cmd_defaults(),
        Command::Monitor {
            metric,
            interval,
            fps,
            config,
            output,
        } => cmd_monitor(&metric, interval, fps, config.as_deref(), &output),
    }
}

// =============================================================================
// Option Loading
// =============================================================================

/// Load options from `--config`, else the default config file, else
/// built-in defaults, then apply `--set` overrides.
fn load_gauge_options(config: Option<&Path>, set: &[String]) -> Result<GaugeOptions> {
    let mut options = match config {
        Some(path) => load_options(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => match get_config_path() {
            Ok(path) if path.exists() => load_options(&path)
                .with_context(|| format!("Failed to load options from {}", path.display()))?,
            _ => GaugeOptions::default(),
        },
    };

    if !set.is_empty() {
        let mut doc = serde_json::to_value(&options).context("Failed to serialize options")?;
        let Value::Object(map) = &mut doc else {
            return Err(anyhow!("Options did not serialize to an object"));
        };
        for assignment in set {
            let (key, value) = parse_assignment(assignment)?;
            log::debug!("Override {} = {}", key, value);
            map.insert(key, value);
        }
        options = serde_json::from_value(doc).context("Invalid --set override")?;
    }

    let id = options.id.clone().unwrap_or_else(|| "gauge".to_string());
    options.container = Some(Container::new(id));
    Ok(options)
}

fn write_svg(gauge: &Gauge<SvgDocument>, path: &Path) -> Result<()> {
    std::fs::write(path, gauge.surface().to_svg())
        .with_context(|| format!("Failed to write {}", path.display()))
}

// =============================================================================
// Commands
// =============================================================================

fn cmd_render(config: Option<&Path>, value: Option<f64>, set: &[String], output: &Path) -> Result<()> {
    let mut options = load_gauge_options(config, set)?;
    if value.is_some() {
        options.value = value;
    }
    options.start_animation_time = Some(0.0);

    let gauge = Gauge::new(options, SvgDocument::new()).context("Failed to build gauge")?;
    write_svg(&gauge, output)?;

    println!("✅ Rendered {} ({})", output.display(), gauge.value());
    Ok(())
}

fn cmd_frames(
    config: Option<&Path>,
    set: &[String],
    from: Option<f64>,
    to: f64,
    fps: u32,
    out_dir: &Path,
) -> Result<()> {
    let mut options = load_gauge_options(config, set)?;
    if from.is_some() {
        options.value = from;
    }
    options.start_animation_time = Some(0.0);

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let clock = ManualClock::new();
    let mut gauge = Gauge::with_clock(options, SvgDocument::new(), clock.clone())
        .context("Failed to build gauge")?;

    let frame_step = Duration::from_secs_f64(1.0 / fps as f64);
    let mut frame = 0u32;
    write_svg(&gauge, &out_dir.join(format!("frame_{:04}.svg", frame)))?;

    gauge.refresh(to, None, None, None).context("Refresh failed")?;
    while gauge.is_animating() {
        clock.advance(frame_step);
        gauge.tick();
        frame += 1;
        write_svg(&gauge, &out_dir.join(format!("frame_{:04}.svg", frame)))?;
    }

    println!(
        "🎞️  Wrote {} frames to {} ({:?} at {} fps)",
        frame + 1,
        out_dir.display(),
        clock.elapsed(),
        fps
    );
    Ok(())
}

fn cmd_defaults() -> Result<()> {
    let defaults = GaugeOptions::documented_defaults();
    println!("{}", serde_json::to_string_pretty(&defaults)?);
    Ok(())
}

fn cmd_monitor(
    metric_name: &str,
    interval: u64,
    fps: u32,
    config: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let metric = parse_metric(metric_name)?;
    let mut options = load_gauge_options(config, &[])?;
    options.title.get_or_insert_with(|| metric.title().to_string());
    options.symbol.get_or_insert_with(|| metric.symbol().to_string());
    options.max.get_or_insert(metric.max());

    let mut metrics = SystemMetrics::new();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    metrics.refresh(metric);
    options.value = metrics.sample(metric);

    let mut gauge = Gauge::new(options, SvgDocument::new()).context("Failed to build gauge")?;

    println!("📊 Monitoring {} -> {} (Ctrl+C to stop)", metric.title(), output.display());
    println!("   Sample interval: {} seconds", interval);
    println!();

    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let sample_every = Duration::from_secs(interval.max(1));
    let frame_every = Duration::from_secs_f64(1.0 / fps as f64);
    let mut last_sample = Instant::now();

    while running.load(Ordering::SeqCst) {
        if last_sample.elapsed() >= sample_every {
            last_sample = Instant::now();
            metrics.refresh(metric);
            match metrics.sample(metric) {
                Some(value) => {
                    gauge.refresh(value, None, None, None)?;
                    println!("   {}: {:.1}{}", metric.title(), value, metric.symbol());
                }
                None => log::warn!("{} is not available on this host", metric.title()),
            }
        }

        gauge.tick();
        write_svg(&gauge, output)?;
        std::thread::sleep(frame_every);
    }

    gauge.destroy();
    println!("\n👋 Monitor stopped.");
    Ok(())
}
