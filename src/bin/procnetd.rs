//! procnetd - Network statistics exporter daemon.
//!
//! Collects network protocol and socket statistics from the /proc filesystem
//! and writes them in Prometheus text format, either to stdout or atomically
//! to a textfile for a node-exporter style textfile collector to pick up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

use procnet::collector::{Collector, NetStatCollector, RealFs, SockStatCollector};

/// Network statistics exporter daemon.
#[derive(Parser)]
#[command(name = "procnetd", about = "Network statistics exporter daemon", version)]
struct Args {
    /// Collection interval in seconds.
    #[arg(short, long, default_value = "10")]
    interval: u64,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Output file for the text exposition. Writes to stdout if omitted.
    #[arg(short, long)]
    output: Option<String>,

    /// Collect once and exit.
    #[arg(long)]
    once: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("procnetd={}", level).parse().unwrap())
        .add_directive(format!("procnet={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Runs one cycle over all collectors.
///
/// A failure in one collector is logged and does not affect the others.
/// Returns the gathered metric families sorted by name for deterministic
/// output.
fn gather(collectors: &mut [Box<dyn Collector>]) -> Vec<MetricFamily> {
    let mut mfs = Vec::new();
    for collector in collectors.iter_mut() {
        if let Err(e) = collector.update(&mut mfs) {
            error!("{} collector failed: {}", collector.name(), e);
        }
    }
    mfs.sort_by(|a, b| a.get_name().cmp(b.get_name()));
    mfs
}

/// Encodes metric families in the Prometheus text exposition format.
fn encode(mfs: &[MetricFamily]) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(mfs, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Writes the exposition to the output file via a temporary sibling and
/// rename, so readers never observe a partial file.
fn write_textfile(path: &str, exposition: &str) -> std::io::Result<()> {
    let tmp_path = format!("{}.tmp", path);
    std::fs::write(&tmp_path, exposition)?;
    std::fs::rename(&tmp_path, path)
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("procnetd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, proc={}, output={}",
        args.interval,
        args.proc_path,
        args.output.as_deref().unwrap_or("stdout")
    );

    let mut collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(NetStatCollector::new(RealFs::new(), &args.proc_path)),
        Box::new(SockStatCollector::new(RealFs::new(), &args.proc_path)),
    ];

    let interval = Duration::from_secs(args.interval);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        error!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting collection loop");

    let mut cycle_count: u64 = 0;
    while running.load(Ordering::SeqCst) {
        let mfs = gather(&mut collectors);
        cycle_count += 1;
        debug!("Cycle #{}: {} metric families", cycle_count, mfs.len());

        match encode(&mfs) {
            Ok(exposition) => match args.output {
                Some(ref path) => {
                    if let Err(e) = write_textfile(path, &exposition) {
                        error!("Failed to write {}: {}", path, e);
                    }
                }
                None => print!("{}", exposition),
            },
            Err(e) => error!("Failed to encode metrics: {}", e),
        }

        if args.once {
            break;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutdown complete");
}
