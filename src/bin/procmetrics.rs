//! procmetrics - prints resource usage metrics of its own process.
//!
//! Usage:
//!   procmetrics                 # print the metrics once
//!   procmetrics --fds           # also print descriptor metrics
//!   procmetrics -i 10           # print every 10 seconds until Ctrl-C

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "linux")]
use procmetrics::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use procmetrics::collector::mock::MockFs;
use procmetrics::collector::{FileSystem, ProcessMetrics};
use procmetrics::util::start_time;

/// Prints resource usage metrics of the current process.
#[derive(Parser)]
#[command(name = "procmetrics", about = "Process resource usage metrics", version)]
struct Args {
    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Also print process_max_fds and process_open_fds.
    /// Enumerating descriptors is expensive when many are open.
    #[arg(long)]
    fds: bool,

    /// Repeat every INTERVAL seconds until interrupted.
    /// Prints once when omitted.
    #[arg(short, long, value_name = "INTERVAL")]
    interval: Option<u64>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs go to stderr so stdout carries only metric lines.
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

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("procmetrics={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn write_sample<F: FileSystem, W: Write>(
    metrics: &ProcessMetrics<F>,
    fds: bool,
    out: &mut W,
) -> io::Result<()> {
    metrics.write_process_metrics(out)?;
    if fds {
        metrics.write_fd_metrics(out)?;
    }
    out.flush()
}

fn run<F: FileSystem>(metrics: ProcessMetrics<F>, args: &Args) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let Some(interval) = args.interval else {
        return write_sample(&metrics, args.fds, &mut out);
    };
    let interval = Duration::from_secs(interval.max(1));

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut samples: u64 = 0;
    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        write_sample(&metrics, args.fds, &mut out)?;
        samples += 1;
        debug!("Sample #{} written in {:?}", samples, started.elapsed());

        // Sleep in short steps so Ctrl-C is handled promptly
        while running.load(Ordering::SeqCst) && started.elapsed() < interval {
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    info!("Stopped after {} samples", samples);
    Ok(())
}

fn main() -> ExitCode {
    let start_time_seconds = start_time::init();
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    debug!(
        "procmetrics {} starting: proc={}, fds={}, interval={:?}, start_time={}",
        env!("CARGO_PKG_VERSION"),
        args.proc_path,
        args.fds,
        args.interval,
        start_time_seconds
    );

    #[cfg(target_os = "linux")]
    let metrics = ProcessMetrics::new(RealFs::new(), &args.proc_path);
    #[cfg(not(target_os = "linux"))]
    let metrics = {
        warn!("/proc is not available on this platform, no metrics will be printed");
        ProcessMetrics::new(MockFs::new(), &args.proc_path)
    };

    match run(metrics, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("cannot write metrics: {}", e);
            ExitCode::FAILURE
        }
    }
}
