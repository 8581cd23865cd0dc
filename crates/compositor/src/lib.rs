//! Segment compositing and streaming raster output.
//!
//! Turns decoded segment files into calibrated raster images: raw counts
//! are masked and normalized per band, multiplied by the band's display
//! color, blended across bands, decimated to the target resolution, and
//! streamed to a BMP sink through a bounded byte pipe so whole-image
//! buffering never happens. Scan-level orchestration fans out one task
//! per segment and isolates per-segment failures.

mod bmp;
mod calibration;
mod compositor;
mod error;
pub mod pipe;
mod pipeline;

pub use bmp::BmpEncoder;
pub use calibration::PixelCalibration;
pub use compositor::{DecodeInstructions, OutputFormat, SegmentCompositor};
pub use error::{CompositeError, Result};
pub use pipeline::{process_scan, ScanError, ScanOptions, SegmentReport, SinkFactory};
