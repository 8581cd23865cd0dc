//! Byte-order-aware reading over a sequential source.
//!
//! HSD files declare their own byte order in the basic information block;
//! every multi-byte field of the file, header and pixel data alike, is
//! decoded with the declared order. `FieldReader` wraps a `Read` with the
//! resolved order; `PixelStream` exposes the trailing raster payload as a
//! forward-only sample source.

use std::io::Read;

use bytes::Bytes;

use crate::error::{DecodeError, Result};

/// Byte order declared by a segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Resolve the order from the basic block's flag byte (0 = little,
    /// 1 = big). Any other value is a malformed header.
    pub fn from_flag(flag: u8) -> Result<Self> {
        match flag {
            0 => Ok(ByteOrder::Little),
            1 => Ok(ByteOrder::Big),
            other => Err(DecodeError::malformed(
                1,
                format!("byte order flag must be 0 or 1, got {}", other),
            )),
        }
    }

    #[inline]
    pub fn u16(self, b: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(b),
            ByteOrder::Big => u16::from_be_bytes(b),
        }
    }

    #[inline]
    pub fn u32(self, b: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        }
    }

    #[inline]
    pub fn f32(self, b: [u8; 4]) -> f32 {
        match self {
            ByteOrder::Little => f32::from_le_bytes(b),
            ByteOrder::Big => f32::from_be_bytes(b),
        }
    }

    #[inline]
    pub fn f64(self, b: [u8; 8]) -> f64 {
        match self {
            ByteOrder::Little => f64::from_le_bytes(b),
            ByteOrder::Big => f64::from_be_bytes(b),
        }
    }
}

/// Sequential field reader with a resolved byte order.
///
/// Short reads surface as `TruncatedInput`; other I/O failures pass
/// through as `Io`.
pub(crate) struct FieldReader<R> {
    inner: R,
    order: ByteOrder,
}

impl<R: Read> FieldReader<R> {
    pub fn new(inner: R, order: ByteOrder) -> Self {
        Self { inner, order }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(map_read_err)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.order.u16(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.order.u32(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.order.f32(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.order.f64(self.read_array()?))
    }

    /// Read an exact number of raw bytes (fixed strings, spare regions,
    /// opaque sub-records).
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(map_read_err)?;
        Ok(Bytes::from(buf))
    }
}

pub(crate) fn map_read_err(err: std::io::Error) -> DecodeError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        DecodeError::TruncatedInput
    } else {
        DecodeError::Io(err)
    }
}

/// Forward-only stream of raw u16 samples trailing the header.
///
/// Owned exclusively by the task that decoded the segment. Tracks the
/// declared raster extent; any read or skip beyond it fails with
/// `PixelStreamExhausted` rather than repeating or zero-filling.
pub struct PixelStream {
    inner: Box<dyn Read + Send>,
    order: ByteOrder,
    remaining: u64,
}

impl PixelStream {
    pub(crate) fn new(inner: Box<dyn Read + Send>, order: ByteOrder, samples: u64) -> Self {
        Self {
            inner,
            order,
            remaining: samples,
        }
    }

    /// Samples left before the declared extent is exhausted.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Read the next raw sample in the file's byte order.
    pub fn next_sample(&mut self) -> Result<u16> {
        if self.remaining == 0 {
            return Err(DecodeError::PixelStreamExhausted);
        }
        let mut pair = [0u8; 2];
        self.inner.read_exact(&mut pair).map_err(map_read_err)?;
        self.remaining -= 1;
        Ok(self.order.u16(pair))
    }

    /// Discard `count` samples without decoding them.
    pub fn skip_samples(&mut self, count: u64) -> Result<()> {
        if count > self.remaining {
            return Err(DecodeError::PixelStreamExhausted);
        }
        let mut scratch = [0u8; 8192];
        let mut left = count * 2;
        while left > 0 {
            let take = left.min(scratch.len() as u64) as usize;
            self.inner
                .read_exact(&mut scratch[..take])
                .map_err(map_read_err)?;
            left -= take as u64;
        }
        self.remaining -= count;
        Ok(())
    }
}

impl std::fmt::Debug for PixelStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelStream")
            .field("order", &self.order)
            .field("remaining", &self.remaining)
            .finish()
    }
}
