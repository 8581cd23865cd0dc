//! Segment/band compositing.
//!
//! Walks the pixel streams of one segment's bands in lockstep, calibrates
//! and color-blends retained samples, and discards decimated samples
//! positionally. Rows come out one at a time in raster order; the full
//! composite is never materialized.

use colorimetry::{micrometers_to_nanometers, wavelength_to_rgb, Rgb};
use hsd_parser::DecodedFile;
use tracing::debug;

use crate::calibration::PixelCalibration;
use crate::error::{CompositeError, Result};

/// Caller-supplied downsampling for one segment; not part of the wire
/// format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeInstructions {
    /// Stride along both axes: 1 keeps every sample, D keeps one in D.
    pub decimate: usize,
    pub target_width: usize,
    pub target_height: usize,
}

impl DecodeInstructions {
    /// Derive target dimensions from a segment's raster geometry.
    pub fn from_geometry(columns: u16, lines: u16, decimate: usize) -> Result<Self> {
        if decimate == 0 {
            return Err(CompositeError::InvalidInstructions(
                "decimate factor must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            decimate,
            target_width: columns as usize / decimate,
            target_height: lines as usize / decimate,
        })
    }
}

/// Output pixel layout produced by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One intensity byte per pixel; band colors are not applied.
    Grayscale8,
    /// Three bytes per pixel in the raster file's B, G, R order.
    Bgr24,
}

impl OutputFormat {
    pub fn bits_per_pixel(self) -> u16 {
        match self {
            OutputFormat::Grayscale8 => 8,
            OutputFormat::Bgr24 => 24,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            OutputFormat::Grayscale8 => 1,
            OutputFormat::Bgr24 => 3,
        }
    }
}

/// One contributing band: its pixel stream plus precomputed calibration
/// and display color.
#[derive(Debug)]
struct BandLayer {
    file: DecodedFile,
    calibration: PixelCalibration,
    color: Rgb,
}

/// Composites the bands of one segment into output rows.
///
/// All files must describe the same segment of the same scan; each band's
/// stream is consumed exactly once, in lockstep with the others.
#[derive(Debug)]
pub struct SegmentCompositor {
    layers: Vec<BandLayer>,
    instructions: DecodeInstructions,
    format: OutputFormat,
    columns: usize,
    rows_produced: usize,
}

impl SegmentCompositor {
    /// Build a compositor over one segment's band files.
    ///
    /// Resolves each band's display color up front (Bgr24 only) so that
    /// colorimetry misses fail before any pixel work. Grayscale output
    /// skips color resolution entirely, which keeps near-infrared
    /// single-band output possible.
    pub fn new(
        files: Vec<DecodedFile>,
        instructions: DecodeInstructions,
        format: OutputFormat,
    ) -> Result<Self> {
        let first = files.first().ok_or(CompositeError::EmptyComposite)?;
        let sequence = first.segment.sequence_number;
        let total = first.segment.total_segments;
        let columns = first.data.columns;
        let lines = first.data.lines;

        if instructions.decimate == 0
            || instructions.target_width * instructions.decimate > columns as usize
            || instructions.target_height * instructions.decimate > lines as usize
        {
            return Err(CompositeError::InvalidInstructions(format!(
                "{}x{} at stride {} does not fit a {}x{} raster",
                instructions.target_width,
                instructions.target_height,
                instructions.decimate,
                columns,
                lines,
            )));
        }

        for file in &files {
            if file.segment.sequence_number != sequence || file.segment.total_segments != total {
                return Err(CompositeError::SegmentMismatch(format!(
                    "segment {}/{} grouped with segment {}/{}",
                    file.segment.sequence_number, file.segment.total_segments, sequence, total,
                )));
            }
            if file.data.columns != columns || file.data.lines != lines {
                return Err(CompositeError::SegmentMismatch(format!(
                    "band {} raster {}x{} differs from {}x{}",
                    file.calibration.band_number,
                    file.data.columns,
                    file.data.lines,
                    columns,
                    lines,
                )));
            }
        }

        let layers = files
            .into_iter()
            .map(|file| {
                let calibration = PixelCalibration::from_block(&file.calibration);
                let color = match format {
                    OutputFormat::Bgr24 => wavelength_to_rgb(micrometers_to_nanometers(
                        file.calibration.central_wavelength,
                    ))?,
                    // Unused in grayscale; white keeps the math uniform
                    OutputFormat::Grayscale8 => Rgb {
                        r: 1.0,
                        g: 1.0,
                        b: 1.0,
                    },
                };
                Ok(BandLayer {
                    file,
                    calibration,
                    color,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            segment = sequence,
            bands = layers.len(),
            columns,
            lines,
            decimate = instructions.decimate,
            "compositor ready"
        );

        Ok(Self {
            layers,
            instructions,
            format,
            columns: columns as usize,
            rows_produced: 0,
        })
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    pub fn output_width(&self) -> usize {
        self.instructions.target_width
    }

    pub fn output_height(&self) -> usize {
        self.instructions.target_height
    }

    pub fn segment_number(&self) -> u8 {
        self.layers[0].file.segment.sequence_number
    }

    /// Global output rows covered by this segment:
    /// `[target_height * (sequence - 1), target_height * sequence)`.
    pub fn row_range(&self) -> std::ops::Range<usize> {
        let height = self.instructions.target_height;
        let sequence = self.segment_number() as usize;
        height * (sequence - 1)..height * sequence
    }

    /// Rows not yet produced.
    pub fn rows_remaining(&self) -> usize {
        self.instructions.target_height - self.rows_produced
    }

    /// Produce the next output row into `row`, replacing its contents.
    ///
    /// Row bytes follow the output format (1 or 3 bytes per pixel). Each
    /// retained sample consumes `decimate` raw samples along the column
    /// axis, and each produced row consumes `decimate` raw rows; skipped
    /// samples are discarded without inspection. Reading past a band's
    /// declared extent is fatal for the segment.
    pub fn next_row(&mut self, row: &mut Vec<u8>) -> Result<()> {
        let decimate = self.instructions.decimate;
        let width = self.instructions.target_width;
        let band_count = self.layers.len() as f64;

        row.clear();
        row.reserve(width * self.format.bytes_per_pixel());

        for _ in 0..width {
            let mut sum_r = 0.0;
            let mut sum_g = 0.0;
            let mut sum_b = 0.0;
            for layer in &mut self.layers {
                let raw = layer.file.pixels.next_sample()?;
                if let Some(intensity) = layer.calibration.calibrate(raw) {
                    let intensity = intensity.clamp(0.0, 1.0);
                    sum_r += layer.color.r * intensity;
                    sum_g += layer.color.g * intensity;
                    sum_b += layer.color.b * intensity;
                }
                layer.file.pixels.skip_samples(decimate as u64 - 1)?;
            }

            let r = sum_r / band_count;
            let g = sum_g / band_count;
            let b = sum_b / band_count;

            match self.format {
                OutputFormat::Grayscale8 => {
                    // Channels are equal in grayscale mode; any one is the
                    // averaged intensity
                    row.push(channel_byte(r));
                }
                OutputFormat::Bgr24 => {
                    row.push(channel_byte(b));
                    row.push(channel_byte(g));
                    row.push(channel_byte(r));
                }
            }
        }

        // Skip the unread remainder of each band's raw row, then the
        // decimated raw rows
        let consumed = width * decimate;
        let row_remainder = self.columns - consumed;
        let skip = row_remainder as u64 + (decimate as u64 - 1) * self.columns as u64;
        if skip > 0 {
            for layer in &mut self.layers {
                layer.file.pixels.skip_samples(skip)?;
            }
        }

        self.rows_produced += 1;
        Ok(())
    }
}

/// Scale a [0, 1] channel to a byte, clamping the top end.
#[inline]
fn channel_byte(value: f64) -> u8 {
    (value * 255.0).min(255.0) as u8
}
