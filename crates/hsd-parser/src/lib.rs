//! Himawari Standard Data (HSD) segment file decoder.
//!
//! Parses the fixed, versioned binary header of one segment file (eleven
//! blocks with runtime-determined byte order, a band-dependent calibration
//! sub-record, and three count-prefixed variable-length blocks) and
//! exposes the trailing raster payload as a forward-only pixel stream so
//! multi-gigabyte imagery never has to be resident in memory.

pub mod blocks;
mod decode;
mod error;
mod reader;

pub use blocks::{
    BandCalibration, BasicInfo, CalibrationInfo, DataInfo, ErrorEntry, ErrorInfo,
    InterCalibrationInfo, NavigationCorrection, NavigationCorrectionInfo, NavigationInfo,
    ObservationTime, ObservationTimeInfo, Position, ProjectionInfo, SegmentInfo, SpareInfo,
};
pub use decode::{decode, DecodedFile};
pub use error::{DecodeError, Result};
pub use reader::{ByteOrder, PixelStream};
