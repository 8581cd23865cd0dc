//! Error types for HSD decoding.

use thiserror::Error;

/// Result type alias for decode operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors that can occur while decoding a segment file.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Fewer bytes were available than the schema requires.
    #[error("truncated input: unexpected end of data")]
    TruncatedInput,

    /// A header block disagreed with the fixed schema.
    #[error("malformed header in block {block}: {detail}")]
    MalformedHeader { block: u8, detail: String },

    /// A pixel read past the raster extent declared in the data block.
    #[error("pixel stream exhausted: read past declared raster extent")]
    PixelStreamExhausted,

    /// Underlying I/O failure other than a short read.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub(crate) fn malformed(block: u8, detail: impl Into<String>) -> Self {
        DecodeError::MalformedHeader {
            block,
            detail: detail.into(),
        }
    }
}
