//! Top-level segment file decoding.

use std::io::{Cursor, Read};

use tracing::debug;

use crate::blocks::{
    BasicInfo, CalibrationInfo, DataInfo, ErrorInfo, InterCalibrationInfo, NavigationCorrectionInfo,
    NavigationInfo, ObservationTimeInfo, ProjectionInfo, SegmentInfo, SpareInfo,
};
use crate::error::Result;
use crate::reader::{ByteOrder, FieldReader, PixelStream};

/// Byte offset of the order flag within the basic information block.
const BYTE_ORDER_OFFSET: usize = 5;

/// A fully decoded segment header plus its lazily-consumed pixel stream.
///
/// One instance per segment file, exclusively owned by the task that
/// decoded it. The pixel stream is read-once and forward-only.
#[derive(Debug)]
pub struct DecodedFile {
    pub basic: BasicInfo,
    pub data: DataInfo,
    pub projection: ProjectionInfo,
    pub navigation: NavigationInfo,
    pub calibration: CalibrationInfo,
    pub inter_calibration: InterCalibrationInfo,
    pub segment: SegmentInfo,
    pub navigation_correction: NavigationCorrectionInfo,
    pub observation_time: ObservationTimeInfo,
    pub error_info: ErrorInfo,
    pub spare: SpareInfo,
    pub pixels: PixelStream,
}

impl DecodedFile {
    /// Raster extent declared by the data block, in samples.
    pub fn sample_count(&self) -> u64 {
        self.data.columns as u64 * self.data.lines as u64
    }
}

/// Decode a segment file's header blocks from a sequential byte source.
///
/// The byte order flag is peeked from a buffered fixed-size prefix before
/// anything else is parsed; the resolved order then governs the whole
/// file, including the prefix bytes themselves, which are re-read through
/// an in-memory cursor chained ahead of the live source. Header errors
/// surface here, before any pixel work begins. The pixel payload is not
/// materialized; it remains in the source behind the returned
/// `PixelStream`.
pub fn decode<R: Read + Send + 'static>(mut source: R) -> Result<DecodedFile> {
    // Buffer through the order flag, then inspect it. The flag is a single
    // byte, so it reads the same under either order.
    let mut prefix = [0u8; BYTE_ORDER_OFFSET + 1];
    source
        .read_exact(&mut prefix)
        .map_err(crate::reader::map_read_err)?;
    let order = ByteOrder::from_flag(prefix[BYTE_ORDER_OFFSET])?;

    let chained = Cursor::new(prefix.to_vec()).chain(source);
    let mut reader = FieldReader::new(chained, order);

    let basic = BasicInfo::parse(&mut reader)?;
    let data = DataInfo::parse(&mut reader)?;
    let projection = ProjectionInfo::parse(&mut reader)?;
    let navigation = NavigationInfo::parse(&mut reader)?;
    let calibration = CalibrationInfo::parse(&mut reader)?;
    let inter_calibration = InterCalibrationInfo::parse(&mut reader)?;
    let segment = SegmentInfo::parse(&mut reader)?;
    let navigation_correction = NavigationCorrectionInfo::parse(&mut reader)?;
    let observation_time = ObservationTimeInfo::parse(&mut reader)?;
    let error_info = ErrorInfo::parse(&mut reader)?;
    let spare = SpareInfo::parse(&mut reader)?;

    debug!(
        satellite = %basic.satellite_name(),
        band = calibration.band_number,
        segment = segment.sequence_number,
        columns = data.columns,
        lines = data.lines,
        byte_order = ?order,
        "decoded segment header"
    );

    let samples = data.columns as u64 * data.lines as u64;
    let pixels = PixelStream::new(Box::new(reader.into_inner()), order, samples);

    Ok(DecodedFile {
        basic,
        data,
        projection,
        navigation,
        calibration,
        inter_calibration,
        segment,
        navigation_correction,
        observation_time,
        error_info,
        spare,
        pixels,
    })
}
