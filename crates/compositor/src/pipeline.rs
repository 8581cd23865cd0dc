//! Per-scan task orchestration.
//!
//! Decoding and compositing fan out per segment: one blocking task per
//! segment file while headers are decoded, then one blocking composite
//! task plus one async sink-drain task per segment, joined at the end of
//! the scan. Segments are independent: a failing segment reports its own
//! error after the join and neither cancels nor corrupts its siblings.

use std::collections::BTreeMap;
use std::io::Read;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::task;
use tracing::{info, warn};

use hsd_parser::{decode, DecodedFile};

use crate::bmp::BmpEncoder;
use crate::compositor::{DecodeInstructions, OutputFormat, SegmentCompositor};
use crate::error::CompositeError;
use crate::pipe::bounded_pipe;

/// Provides the output byte sink for each segment of a scan. Sinks are
/// created lazily, once the segment's number is known from its header.
#[async_trait]
pub trait SinkFactory: Send + Sync {
    type Sink: AsyncWrite + Unpin + Send;

    async fn create(&self, segment: u8) -> std::io::Result<Self::Sink>;
}

/// Scan-wide processing options.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Decimation stride along both axes.
    pub decimate: usize,
    pub format: OutputFormat,
    /// Bound of the per-segment byte pipe, in 64 KiB chunks.
    pub pipe_chunks: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            decimate: 1,
            format: OutputFormat::Bgr24,
            // 16 MiB in-flight per segment
            pipe_chunks: 256,
        }
    }
}

/// Successful outcome for one segment.
#[derive(Debug, Clone)]
pub struct SegmentReport {
    pub segment: u8,
    pub width: usize,
    pub height: usize,
    pub bytes_written: u64,
    pub satellite: String,
    /// Scan start time as a Modified Julian Date, as carried in the
    /// header.
    pub observation_start_mjd: f64,
}

/// Failure of one unit of scan work, identifying where it happened.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A source failed header decode before its segment number was known.
    #[error("source {index} failed to decode: {source}")]
    Decode {
        index: usize,
        #[source]
        source: CompositeError,
    },

    /// A segment's composite/encode task failed.
    #[error("segment {segment} failed: {source}")]
    Segment {
        segment: u8,
        #[source]
        source: CompositeError,
    },
}

/// Decode, composite, and encode one scan.
///
/// `sources` holds every segment file of the scan, all bands being
/// combined, in any order; files are grouped by the segment sequence
/// number read from their headers. One raster is written per segment
/// through `sinks`. The returned vector carries one entry per failed
/// source plus one entry per segment group, in segment order; the join
/// point completes only when every task has finished or failed.
pub async fn process_scan<R, F>(
    sources: Vec<R>,
    sinks: &F,
    options: ScanOptions,
) -> Vec<Result<SegmentReport, ScanError>>
where
    R: Read + Send + 'static,
    F: SinkFactory,
{
    // Parallel header decode, one blocking task per file
    let handles: Vec<_> = sources
        .into_iter()
        .map(|source| task::spawn_blocking(move || decode(source)))
        .collect();

    let mut results = Vec::new();
    let mut groups: BTreeMap<u8, Vec<DecodedFile>> = BTreeMap::new();
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(file)) => {
                groups
                    .entry(file.segment.sequence_number)
                    .or_default()
                    .push(file);
            }
            Ok(Err(err)) => {
                warn!(index, error = %err, "segment file failed to decode");
                results.push(Err(ScanError::Decode {
                    index,
                    source: err.into(),
                }));
            }
            Err(join_err) => {
                results.push(Err(ScanError::Decode {
                    index,
                    source: CompositeError::TaskPanicked(join_err.to_string()),
                }));
            }
        }
    }

    // One composite+encode task per segment, joined together
    let segment_futures = groups.into_iter().map(|(segment, files)| async move {
        info!(segment, bands = files.len(), "compositing segment");
        match run_segment(sinks, segment, files, options).await {
            Ok(report) => {
                info!(
                    segment,
                    width = report.width,
                    height = report.height,
                    bytes = report.bytes_written,
                    "segment written"
                );
                Ok(report)
            }
            Err(source) => {
                warn!(segment, error = %source, "segment failed");
                Err(ScanError::Segment { segment, source })
            }
        }
    });
    results.extend(join_all(segment_futures).await);

    results
}

async fn run_segment<F: SinkFactory>(
    sinks: &F,
    segment: u8,
    files: Vec<DecodedFile>,
    options: ScanOptions,
) -> Result<SegmentReport, CompositeError> {
    let first = &files[0];
    let instructions =
        DecodeInstructions::from_geometry(first.data.columns, first.data.lines, options.decimate)?;
    let format = options.format;
    let satellite = first.basic.satellite_name();
    let observation_start_mjd = first.basic.observation_start_time;

    // Constructed before any pixel work so colorimetry and grouping
    // errors surface without touching the sink
    let mut compositor = SegmentCompositor::new(files, instructions, format)?;

    let mut sink = sinks
        .create(segment)
        .await
        .map_err(CompositeError::SinkWrite)?;
    let (writer, reader) = bounded_pipe(options.pipe_chunks);

    let producer = task::spawn_blocking(move || -> Result<(usize, usize), CompositeError> {
        let width = compositor.output_width();
        let height = compositor.output_height();
        let mut encoder =
            BmpEncoder::new(writer, width as u32, height as u32, format.bits_per_pixel())?;
        let mut row = Vec::new();
        for _ in 0..height {
            compositor.next_row(&mut row)?;
            encoder.write_row(&row)?;
        }
        encoder
            .finish()?
            .finish()
            .map_err(CompositeError::SinkWrite)?;
        Ok((width, height))
    });

    let (produced, drained) = tokio::join!(producer, reader.copy_to(&mut sink));

    // A sink failure is the root cause when both halves report: the
    // producer only sees it as a broken pipe
    let bytes_written = drained.map_err(CompositeError::SinkWrite)?;
    let (width, height) = match produced {
        Ok(result) => result?,
        Err(join_err) => return Err(CompositeError::TaskPanicked(join_err.to_string())),
    };

    Ok(SegmentReport {
        segment,
        width,
        height,
        bytes_written,
        satellite,
        observation_start_mjd,
    })
}
