//! simviz CLI
//!
//! Feed, replay and serve live simulation sample streams.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, RecvTimeoutError};
use simviz_stream::{
    config::Config,
    stats::{create_shared_stats_with_persistence, ChannelSummary, StreamStats},
    store::{TimeSlider, TimeWindow},
    ValueComponent, ValueProbe, VERSION,
};
use std::f64::consts::TAU;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simviz")]
#[command(version = VERSION)]
#[command(about = "Streaming sample store for live simulation plots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the frame server (requires the server feature)
    Serve {
        /// Address to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to the configured port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Stream a synthetic oscillator through a probe and print readouts
    Demo {
        /// Number of plotted lines
        #[arg(long, default_value = "2")]
        lines: usize,

        /// Simulation steps per second of simulated time
        #[arg(long, default_value = "1000")]
        rate: f64,

        /// Oscillator frequency in Hz
        #[arg(long, default_value = "1.0")]
        frequency: f64,

        /// Low-pass time constant in seconds (defaults to the configured one)
        #[arg(long)]
        smoothing: Option<f64>,

        /// Stop after this many seconds of simulated time
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Feed a file of recorded frames through a store and summarize it
    Replay {
        /// File of back-to-back little-endian f32 frames
        file: PathBuf,

        /// Values per frame, excluding the timestamp
        #[arg(long)]
        dims: usize,

        /// Low-pass time constant in seconds (defaults to the configured one)
        #[arg(long)]
        smoothing: Option<f64>,
    },

    /// Show persisted stream statistics
    Stats,

    /// Show configuration
    Config,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { host, port } => cmd_serve(host, port),
        Commands::Demo {
            lines,
            rate,
            frequency,
            smoothing,
            duration,
        } => cmd_demo(lines, rate, frequency, smoothing, duration),
        Commands::Replay {
            file,
            dims,
            smoothing,
        } => cmd_replay(&file, dims, smoothing),
        Commands::Stats => cmd_stats(),
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "server")]
fn cmd_serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    use simviz_stream::server::{run, ServerConfig};

    let mut config = Config::load().unwrap_or_default();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    let server_config = ServerConfig::from_config(&config).context("invalid server address")?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let (addr, shutdown_tx) = run(server_config).await?;
        println!("simviz v{VERSION} serving on http://{addr}");
        println!("Press Ctrl+C to stop");

        tokio::signal::ctrl_c().await?;
        let _ = shutdown_tx.send(());
        // Let the graceful shutdown finish draining requests.
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok::<(), anyhow::Error>(())
    })
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_host: Option<String>, _port: Option<u16>) -> anyhow::Result<()> {
    anyhow::bail!("serve requires building with the server feature (cargo build --features server)")
}

fn cmd_demo(
    lines: usize,
    rate: f64,
    frequency: f64,
    smoothing: Option<f64>,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    if lines == 0 {
        anyhow::bail!("at least one line is required");
    }
    check_rate(rate)?;

    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        tracing::warn!("Could not create data directory: {e}");
    }
    let stats = create_shared_stats_with_persistence(config.stats_path());
    let smoothing = smoothing.unwrap_or(config.smoothing_constant);

    println!("simviz v{VERSION} demo");
    println!("  Lines: {lines}");
    println!("  Step: {:.4}s", 1.0 / rate);
    println!("  Smoothing constant: {smoothing}s");
    println!("  Shown/kept: {}s / {}s", config.shown_duration, config.kept_duration);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let mut probe = ValueProbe::new("oscillator", lines);
    let mut component = ValueComponent::new(1, probe.label(), lines, smoothing)
        .with_stats(stats.clone())
        .with_redraw_debounce(config.redraw_debounce);
    let mut slider = TimeSlider::new(config.shown_duration, config.kept_duration);

    // Simulation thread: steps in real time and ships frames over a channel.
    let (tx, rx) = bounded::<Vec<u8>>(10_000);
    let producer = {
        let running = running.clone();
        thread::spawn(move || -> anyhow::Result<()> {
            let dt = 1.0 / rate;
            let start = Instant::now();
            let mut step: u64 = 0;
            while running.load(Ordering::SeqCst) {
                let t = step as f64 * dt;
                if duration.is_some_and(|d| t > d) {
                    break;
                }
                let values: Vec<f64> = (0..lines)
                    .map(|i| (TAU * frequency * t + i as f64 * TAU / lines as f64).sin() + noise(step, i))
                    .collect();
                probe.gather(t, &values)?;
                for frame in probe.drain() {
                    if tx.send(frame).is_err() {
                        return Ok(());
                    }
                }
                step += 1;

                let target = step_deadline(step, dt)?;
                if let Some(wait) = target.checked_sub(start.elapsed()) {
                    thread::sleep(wait);
                }
            }
            Ok(())
        })
    };

    let mut redraw_due: Option<Instant> = None;
    let mut last_trim = Instant::now();
    let mut last_print = Instant::now();

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(5)) {
            Ok(frame) => {
                if component.on_message(&frame) > 0 {
                    if let Some(t) = component.last_time() {
                        slider.advance(t);
                    }
                    if redraw_due.is_none() && component.redraw().is_pending() {
                        redraw_due = Some(Instant::now() + component.redraw().debounce());
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if last_trim.elapsed() >= config.trim_interval {
            component.trim(&slider);
            last_trim = Instant::now();
        }

        if redraw_due.is_some_and(|due| Instant::now() >= due) {
            redraw_due = None;
            let frame = component.update(&slider);
            if last_print.elapsed() >= Duration::from_millis(250) {
                let readout = frame
                    .latest
                    .unwrap_or_default()
                    .iter()
                    .map(|v| format!("{v:+.3}"))
                    .collect::<Vec<_>>()
                    .join("  ");
                println!(
                    "t={:.3}s  shown={}  stored={}  [{}]",
                    slider.last_time(),
                    frame.traces.first().map_or(0, |t| t.points.len()),
                    component.store().len(),
                    readout
                );
                last_print = Instant::now();
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    drop(rx);
    match producer.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("simulation thread panicked"),
    }

    println!();
    println!("{}", stats.summary());
    if let Err(e) = stats.save() {
        tracing::warn!("Could not save stream stats: {e}");
    }
    Ok(())
}

fn check_rate(rate: f64) -> anyhow::Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        anyhow::bail!("rate must be a positive number");
    }
    step_deadline(1, 1.0 / rate).context("rate is too small")?;
    Ok(())
}

/// Wall-clock offset at which simulation step `step` is due.
fn step_deadline(step: u64, dt: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(step as f64 * dt)
        .with_context(|| format!("step {step} at {dt}s per step does not fit a duration"))
}

/// Small deterministic jitter so smoothing has something to do.
fn noise(step: u64, line: usize) -> f64 {
    let x = step
        .wrapping_mul(6364136223846793005)
        .wrapping_add((line as u64).wrapping_mul(1442695040888963407));
    ((x >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 0.2
}

fn cmd_replay(file: &Path, dims: usize, smoothing: Option<f64>) -> anyhow::Result<()> {
    if dims == 0 {
        anyhow::bail!("--dims must be at least 1");
    }
    let config = Config::load().unwrap_or_default();
    let smoothing = smoothing.unwrap_or(config.smoothing_constant);

    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let stats = Arc::new(StreamStats::new());
    let mut component = ValueComponent::new(1, file.display().to_string(), dims, smoothing)
        .with_stats(stats.clone());

    let stored = component
        .try_on_message(&bytes)
        .with_context(|| format!("decoding {}", file.display()))?;

    let mut slider = TimeSlider::new(config.shown_duration, config.kept_duration);
    if let Some(t) = component.last_time() {
        slider.advance(t);
    }
    let frame = component.update(&slider);

    println!("Replayed {} ({stored} samples)", file.display());
    println!(
        "Window: {:.3}s .. {:.3}s",
        slider.first_shown_time(),
        slider.window_end()
    );
    println!();
    for (line, summary) in frame.summaries.iter().enumerate() {
        print_summary(line, summary, frame.traces[line].color.to_css());
    }
    println!();
    println!("{}", stats.summary());
    Ok(())
}

fn print_summary(line: usize, summary: &ChannelSummary, color: String) {
    println!(
        "  line {line} {color}: n={} mean={:+.4} sd={:.4} min={:+.4} max={:+.4}",
        summary.count, summary.mean, summary.std_dev, summary.min, summary.max
    );
}

fn cmd_stats() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();
    let stats = StreamStats::with_persistence(config.stats_path());
    println!("{}", stats.summary());
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("simviz Configuration");
    println!("====================");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
