//! Error types for compositing and encoding.

use thiserror::Error;

/// Result type alias for composite operations.
pub type Result<T> = std::result::Result<T, CompositeError>;

/// Errors from the composite/encode path of one segment.
#[derive(Debug, Error)]
pub enum CompositeError {
    /// Header or pixel stream decoding failed (includes reads past the
    /// declared raster extent).
    #[error(transparent)]
    Decode(#[from] hsd_parser::DecodeError),

    /// A band's central wavelength has no display color.
    #[error(transparent)]
    Colorimetry(#[from] colorimetry::ColorimetryError),

    /// Downstream I/O failed while encoding.
    #[error("sink write failed: {0}")]
    SinkWrite(#[source] std::io::Error),

    /// The files handed to one compositor do not describe the same
    /// segment.
    #[error("segment mismatch: {0}")]
    SegmentMismatch(String),

    /// A compositor was constructed with no bands.
    #[error("no bands to composite")]
    EmptyComposite,

    /// Decode instructions are unusable for the segment geometry.
    #[error("invalid decode instructions: {0}")]
    InvalidInstructions(String),

    /// A worker task died without reporting a result.
    #[error("segment task panicked: {0}")]
    TaskPanicked(String),
}
