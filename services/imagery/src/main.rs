//! Satellite imagery export service.
//!
//! Locates the segment files of one scan (one name prefix per band),
//! runs the decode/composite/encode pipeline, and writes one BMP per
//! segment.

mod discover;
mod sink;
mod time;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use compositor::{process_scan, OutputFormat, ScanOptions};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sink::BmpDirectory;

#[derive(Parser, Debug)]
#[command(name = "imagery")]
#[command(about = "Reconstructs viewable images from satellite scan segments")]
struct Args {
    /// Directory holding the scan's segment files
    #[arg(short, long, env = "IMAGERY_DATA_DIR", default_value = ".")]
    dir: PathBuf,

    /// File name prefix per band to combine (repeat for multi-band color)
    #[arg(short, long, required = true)]
    prefix: Vec<String>,

    /// Output directory for the per-segment rasters
    #[arg(short, long, env = "IMAGERY_OUT_DIR", default_value = ".")]
    out: PathBuf,

    /// Name stem for output files
    #[arg(long, default_value = "scan")]
    stem: String,

    /// Keep one sample in this many along each axis
    #[arg(long, default_value_t = 1)]
    decimate: usize,

    /// Write 8-bit grayscale instead of color (single band, no
    /// colorimetry)
    #[arg(long)]
    grayscale: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(dir = %args.dir.display(), bands = args.prefix.len(), "starting scan export");

    let mut sources = Vec::new();
    for prefix in &args.prefix {
        let paths = discover::segment_files(&args.dir, prefix)?;
        if paths.is_empty() {
            bail!("no segment files match prefix {:?} in {}", prefix, args.dir.display());
        }
        info!(prefix = %prefix, segments = paths.len(), "found band files");
        for path in paths {
            let file =
                File::open(&path).with_context(|| format!("opening {}", path.display()))?;
            sources.push(BufReader::with_capacity(1 << 20, file));
        }
    }

    let format = if args.grayscale {
        OutputFormat::Grayscale8
    } else {
        OutputFormat::Bgr24
    };
    let options = ScanOptions {
        decimate: args.decimate,
        format,
        ..Default::default()
    };

    let sinks = BmpDirectory::new(args.out.clone(), &args.stem);
    let results = process_scan(sources, &sinks, options).await;

    let mut failures = 0usize;
    for result in &results {
        match result {
            Ok(report) => {
                let observed = time::mjd_to_datetime(report.observation_start_mjd)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string());
                info!(
                    segment = report.segment,
                    satellite = %report.satellite,
                    observed = %observed,
                    size = format!("{}x{}", report.width, report.height),
                    bytes = report.bytes_written,
                    path = %sinks.path_for(report.segment).display(),
                    "segment exported"
                );
            }
            Err(err) => {
                warn!(error = %err, "scan task failed");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} scan tasks failed", failures, results.len());
    }
    info!(segments = results.len(), "scan export complete");
    Ok(())
}
