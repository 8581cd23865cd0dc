//! HSD header block definitions and parsing.
//!
//! A segment file carries eleven header blocks in a fixed order, followed
//! by the raw pixel payload. Fixed-size blocks are decoded field by field;
//! the three variable-length blocks carry a count-prefixed entry list and
//! a trailing spare region whose size is fixed per block type, independent
//! of the count. Parsing trusts this fixed schema: each block's
//! self-reported number is validated against the expected sequence, while
//! declared block lengths are stored but not used to drive decoding.

use std::io::Read;

use bytes::Bytes;

use crate::error::{DecodeError, Result};
use crate::reader::FieldReader;

/// Read and validate a block's leading number, returning the declared
/// 2-byte length that follows it.
fn block_header<R: Read>(r: &mut FieldReader<R>, expected: u8) -> Result<u16> {
    let number = r.read_u8()?;
    if number != expected {
        return Err(DecodeError::malformed(
            expected,
            format!("expected block number {}, got {}", expected, number),
        ));
    }
    r.read_u16()
}

/// Block 1: file-level metadata.
///
/// The byte order flag lives at byte offset 5 of this block and governs
/// every multi-byte field in the file, including the five bytes that
/// precede it.
#[derive(Debug, Clone)]
pub struct BasicInfo {
    pub block_length: u16,
    pub total_header_blocks: u16,
    pub byte_order: u8,
    pub satellite: Bytes,
    pub processing_center: Bytes,
    pub observation_area: Bytes,
    pub observation_area_info: Bytes,
    pub observation_timeline: u16,
    /// Modified Julian Date.
    pub observation_start_time: f64,
    pub observation_end_time: f64,
    pub file_creation_time: f64,
    pub total_header_length: u32,
    pub total_data_length: u32,
    pub quality_flags: [u8; 4],
    pub file_format_version: Bytes,
    pub file_name: Bytes,
    pub spare: Bytes,
}

impl BasicInfo {
    pub(crate) fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        let block_length = block_header(r, 1)?;
        let total_header_blocks = r.read_u16()?;
        let byte_order = r.read_u8()?;
        Ok(Self {
            block_length,
            total_header_blocks,
            byte_order,
            satellite: r.read_bytes(16)?,
            processing_center: r.read_bytes(16)?,
            observation_area: r.read_bytes(4)?,
            observation_area_info: r.read_bytes(2)?,
            observation_timeline: r.read_u16()?,
            observation_start_time: r.read_f64()?,
            observation_end_time: r.read_f64()?,
            file_creation_time: r.read_f64()?,
            total_header_length: r.read_u32()?,
            total_data_length: r.read_u32()?,
            quality_flags: [r.read_u8()?, r.read_u8()?, r.read_u8()?, r.read_u8()?],
            file_format_version: r.read_bytes(32)?,
            file_name: r.read_bytes(128)?,
            spare: r.read_bytes(40)?,
        })
    }

    /// Satellite name with trailing padding removed.
    pub fn satellite_name(&self) -> String {
        trim_padded(&self.satellite)
    }

    /// Source file name with trailing padding removed.
    pub fn source_file_name(&self) -> String {
        trim_padded(&self.file_name)
    }

    /// Observation area code (e.g. a full-disk scan) without padding.
    pub fn observation_area_code(&self) -> String {
        trim_padded(&self.observation_area)
    }
}

/// Block 2: raster geometry for this segment.
#[derive(Debug, Clone)]
pub struct DataInfo {
    pub block_length: u16,
    pub bits_per_pixel: u16,
    pub columns: u16,
    pub lines: u16,
    pub compression_flag: u8,
    pub spare: Bytes,
}

impl DataInfo {
    pub(crate) fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        Ok(Self {
            block_length: block_header(r, 2)?,
            bits_per_pixel: r.read_u16()?,
            columns: r.read_u16()?,
            lines: r.read_u16()?,
            compression_flag: r.read_u8()?,
            spare: r.read_bytes(40)?,
        })
    }
}

/// Block 3: projection constants. Opaque pass-through; fields round-trip
/// exactly but are not computed on here.
#[derive(Debug, Clone)]
pub struct ProjectionInfo {
    pub block_length: u16,
    pub sub_longitude: f64,
    pub cfac: u32,
    pub lfac: u32,
    pub coff: f32,
    pub loff: f32,
    pub distance_from_earth_center: f64,
    pub earth_equatorial_radius: f64,
    pub earth_polar_radius: f64,
    pub ratio_diff: f64,
    pub ratio_polar: f64,
    pub ratio_equatorial: f64,
    pub sd_coefficient: f64,
    pub resampling_types: u16,
    pub resampling_size: u16,
    pub spare: Bytes,
}

impl ProjectionInfo {
    pub(crate) fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        Ok(Self {
            block_length: block_header(r, 3)?,
            sub_longitude: r.read_f64()?,
            cfac: r.read_u32()?,
            lfac: r.read_u32()?,
            coff: r.read_f32()?,
            loff: r.read_f32()?,
            distance_from_earth_center: r.read_f64()?,
            earth_equatorial_radius: r.read_f64()?,
            earth_polar_radius: r.read_f64()?,
            ratio_diff: r.read_f64()?,
            ratio_polar: r.read_f64()?,
            ratio_equatorial: r.read_f64()?,
            sd_coefficient: r.read_f64()?,
            resampling_types: r.read_u16()?,
            resampling_size: r.read_u16()?,
            spare: r.read_bytes(40)?,
        })
    }
}

/// A position vector (sun or moon), in the navigation block's frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        Ok(Self {
            x: r.read_f64()?,
            y: r.read_f64()?,
            z: r.read_f64()?,
        })
    }
}

/// Block 4: navigation constants. Opaque pass-through.
#[derive(Debug, Clone)]
pub struct NavigationInfo {
    pub block_length: u16,
    pub navigation_time: f64,
    pub ssp_longitude: f64,
    pub ssp_latitude: f64,
    pub distance_to_satellite: f64,
    pub nadir_longitude: f64,
    pub nadir_latitude: f64,
    pub sun_position: Position,
    pub moon_position: Position,
    pub spare: Bytes,
}

impl NavigationInfo {
    pub(crate) fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        Ok(Self {
            block_length: block_header(r, 4)?,
            navigation_time: r.read_f64()?,
            ssp_longitude: r.read_f64()?,
            ssp_latitude: r.read_f64()?,
            distance_to_satellite: r.read_f64()?,
            nadir_longitude: r.read_f64()?,
            nadir_latitude: r.read_f64()?,
            sun_position: Position::parse(r)?,
            moon_position: Position::parse(r)?,
            spare: r.read_bytes(40)?,
        })
    }
}

/// Band-specific tail of the calibration block, selected solely by band
/// number: bands below 7 are visible/near-visible, the rest infrared.
#[derive(Debug, Clone)]
pub enum BandCalibration {
    Visible {
        albedo: f64,
        update_time: f64,
        calibrated_slope: f64,
        calibrated_intercept: f64,
        spare: Bytes,
    },
    /// The infrared sub-record's field layout is not confirmed; it is
    /// carried as an opaque fixed-size region.
    Infrared { raw: Bytes },
}

/// Block 5: radiometric calibration for this band.
#[derive(Debug, Clone)]
pub struct CalibrationInfo {
    pub block_length: u16,
    pub band_number: u16,
    /// Central wavelength in micrometers.
    pub central_wavelength: f64,
    pub valid_bits_per_pixel: u16,
    pub error_pixel_count: u16,
    pub outside_scan_count: u16,
    pub radiance_slope: f64,
    pub radiance_intercept: f64,
    pub band: BandCalibration,
}

impl CalibrationInfo {
    pub(crate) fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        let block_length = block_header(r, 5)?;
        let band_number = r.read_u16()?;
        let central_wavelength = r.read_f64()?;
        let valid_bits_per_pixel = r.read_u16()?;
        let error_pixel_count = r.read_u16()?;
        let outside_scan_count = r.read_u16()?;
        let radiance_slope = r.read_f64()?;
        let radiance_intercept = r.read_f64()?;
        let band = if band_number < 7 {
            BandCalibration::Visible {
                albedo: r.read_f64()?,
                update_time: r.read_f64()?,
                calibrated_slope: r.read_f64()?,
                calibrated_intercept: r.read_f64()?,
                spare: r.read_bytes(80)?,
            }
        } else {
            BandCalibration::Infrared {
                raw: r.read_bytes(112)?,
            }
        };
        Ok(Self {
            block_length,
            band_number,
            central_wavelength,
            valid_bits_per_pixel,
            error_pixel_count,
            outside_scan_count,
            radiance_slope,
            radiance_intercept,
            band,
        })
    }

    /// Central wavelength rounded to the nearest nanometer.
    pub fn wavelength_nanometers(&self) -> u32 {
        (self.central_wavelength * 1000.0).round() as u32
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.band, BandCalibration::Visible { .. })
    }
}

/// Block 6: inter-satellite calibration coefficients. Opaque pass-through.
#[derive(Debug, Clone)]
pub struct InterCalibrationInfo {
    pub block_length: u16,
    pub gsics_intercept: f64,
    pub gsics_slope: f64,
    pub gsics_quadratic: f64,
    pub radiance_bias: f64,
    pub radiance_uncertainty: f64,
    pub radiance_standard_scene: f64,
    pub correction_start: f64,
    pub correction_end: f64,
    pub calibration_upper_limit: f32,
    pub calibration_lower_limit: f32,
    pub gsics_file_name: Bytes,
    pub spare: Bytes,
}

impl InterCalibrationInfo {
    pub(crate) fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        Ok(Self {
            block_length: block_header(r, 6)?,
            gsics_intercept: r.read_f64()?,
            gsics_slope: r.read_f64()?,
            gsics_quadratic: r.read_f64()?,
            radiance_bias: r.read_f64()?,
            radiance_uncertainty: r.read_f64()?,
            radiance_standard_scene: r.read_f64()?,
            correction_start: r.read_f64()?,
            correction_end: r.read_f64()?,
            calibration_upper_limit: r.read_f32()?,
            calibration_lower_limit: r.read_f32()?,
            gsics_file_name: r.read_bytes(128)?,
            spare: r.read_bytes(56)?,
        })
    }
}

/// Block 7: where this segment sits in the full scan.
#[derive(Debug, Clone)]
pub struct SegmentInfo {
    pub block_length: u16,
    pub total_segments: u8,
    /// 1-based position along the line axis.
    pub sequence_number: u8,
    pub first_line_number: u16,
    pub spare: Bytes,
}

impl SegmentInfo {
    pub(crate) fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        let block_length = block_header(r, 7)?;
        let total_segments = r.read_u8()?;
        let sequence_number = r.read_u8()?;
        let info = Self {
            block_length,
            total_segments,
            sequence_number,
            first_line_number: r.read_u16()?,
            spare: r.read_bytes(40)?,
        };
        if info.sequence_number < 1 || info.sequence_number > info.total_segments {
            return Err(DecodeError::malformed(
                7,
                format!(
                    "segment sequence {} outside 1..={}",
                    info.sequence_number, info.total_segments
                ),
            ));
        }
        Ok(info)
    }
}

/// One entry of the navigation correction list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationCorrection {
    pub line_number_after_rotation: u16,
    pub column_shift: f32,
    pub line_shift: f32,
}

/// Block 8: count-prefixed navigation corrections.
#[derive(Debug, Clone)]
pub struct NavigationCorrectionInfo {
    pub block_length: u16,
    pub center_column_of_rotation: f32,
    pub center_line_of_rotation: f32,
    pub rotational_correction: f64,
    pub corrections: Vec<NavigationCorrection>,
    pub spare: Bytes,
}

impl NavigationCorrectionInfo {
    pub(crate) fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        let block_length = block_header(r, 8)?;
        let center_column_of_rotation = r.read_f32()?;
        let center_line_of_rotation = r.read_f32()?;
        let rotational_correction = r.read_f64()?;
        let count = r.read_u16()?;
        let mut corrections = Vec::with_capacity(count as usize);
        for _ in 0..count {
            corrections.push(NavigationCorrection {
                line_number_after_rotation: r.read_u16()?,
                column_shift: r.read_f32()?,
                line_shift: r.read_f32()?,
            });
        }
        Ok(Self {
            block_length,
            center_column_of_rotation,
            center_line_of_rotation,
            rotational_correction,
            corrections,
            spare: r.read_bytes(40)?,
        })
    }
}

/// One entry of the per-line observation time list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationTime {
    pub line_number: u16,
    /// Modified Julian Date.
    pub observation_time: f64,
}

/// Block 9: count-prefixed per-line observation times.
#[derive(Debug, Clone)]
pub struct ObservationTimeInfo {
    pub block_length: u16,
    pub observations: Vec<ObservationTime>,
    pub spare: Bytes,
}

impl ObservationTimeInfo {
    pub(crate) fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        let block_length = block_header(r, 9)?;
        let count = r.read_u16()?;
        let mut observations = Vec::with_capacity(count as usize);
        for _ in 0..count {
            observations.push(ObservationTime {
                line_number: r.read_u16()?,
                observation_time: r.read_f64()?,
            });
        }
        Ok(Self {
            block_length,
            observations,
            spare: r.read_bytes(40)?,
        })
    }
}

/// One entry of the error pixel list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorEntry {
    pub line_number: u16,
    pub error_pixels: u16,
}

/// Block 10: count-prefixed per-line error pixel counts.
///
/// Unlike every other block, the declared length field here is 4 bytes
/// wide.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub block_length: u32,
    pub errors: Vec<ErrorEntry>,
    pub spare: Bytes,
}

impl ErrorInfo {
    pub(crate) fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        let number = r.read_u8()?;
        if number != 10 {
            return Err(DecodeError::malformed(
                10,
                format!("expected block number 10, got {}", number),
            ));
        }
        let block_length = r.read_u32()?;
        let count = r.read_u16()?;
        let mut errors = Vec::with_capacity(count as usize);
        for _ in 0..count {
            errors.push(ErrorEntry {
                line_number: r.read_u16()?,
                error_pixels: r.read_u16()?,
            });
        }
        Ok(Self {
            block_length,
            errors,
            spare: r.read_bytes(40)?,
        })
    }
}

/// Block 11: reserved trailing block.
#[derive(Debug, Clone)]
pub struct SpareInfo {
    pub block_length: u16,
    pub spare: Bytes,
}

impl SpareInfo {
    pub(crate) fn parse<R: Read>(r: &mut FieldReader<R>) -> Result<Self> {
        Ok(Self {
            block_length: block_header(r, 11)?,
            spare: r.read_bytes(256)?,
        })
    }
}

fn trim_padded(bytes: &Bytes) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\0', ' '])
        .to_string()
}
