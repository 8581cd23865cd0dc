//! Streaming BMP encoding.
//!
//! Writes the raster file incrementally as rows arrive from the
//! compositor; never holds more than one padded row. Rows are written
//! top-down in production order with a positive height field, which
//! deviates from the bottom-up convention many raster viewers assume.
//! Callers that need bottom-up order must reverse rows themselves.

use std::io::Write;

use crate::error::{CompositeError, Result};

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;

/// Fixed resolution written to the info header, both axes (72 DPI).
const PIXELS_PER_METER: i32 = 2835;

/// Incremental BMP writer over an arbitrary byte sink.
///
/// The header (and, for 8-bit output, a 256-entry grayscale palette) is
/// written at construction; each `write_row` call appends one row padded
/// with zeros to a 4-byte boundary. `finish` verifies the declared row
/// count was delivered.
pub struct BmpEncoder<W: Write> {
    sink: W,
    width: u32,
    height: u32,
    row_bytes: usize,
    padding: usize,
    rows_written: u32,
}

impl<W: Write> BmpEncoder<W> {
    /// Write the headers and return an encoder ready for rows.
    ///
    /// `bits_per_pixel` must be 8 (palettized grayscale) or 24 (BGR).
    pub fn new(mut sink: W, width: u32, height: u32, bits_per_pixel: u16) -> Result<Self> {
        if bits_per_pixel != 8 && bits_per_pixel != 24 {
            return Err(CompositeError::InvalidInstructions(format!(
                "unsupported bits per pixel: {}",
                bits_per_pixel
            )));
        }

        let row_bytes = width as usize * bits_per_pixel as usize / 8;
        let row_size = (bits_per_pixel as u32 * width + 31) / 32 * 4;
        let palette_size: u32 = if bits_per_pixel == 8 { 256 * 4 } else { 0 };
        let pixel_offset = FILE_HEADER_SIZE + INFO_HEADER_SIZE + palette_size;
        let image_size = row_size * height;
        let file_size = pixel_offset + image_size;
        let palette_entries: u32 = if bits_per_pixel == 8 { 256 } else { 0 };

        let write = |sink: &mut W| -> std::io::Result<()> {
            // File header
            sink.write_all(b"BM")?;
            sink.write_all(&file_size.to_le_bytes())?;
            sink.write_all(&0u32.to_le_bytes())?;
            sink.write_all(&pixel_offset.to_le_bytes())?;

            // Info header
            sink.write_all(&INFO_HEADER_SIZE.to_le_bytes())?;
            sink.write_all(&(width as i32).to_le_bytes())?;
            sink.write_all(&(height as i32).to_le_bytes())?;
            sink.write_all(&1u16.to_le_bytes())?;
            sink.write_all(&bits_per_pixel.to_le_bytes())?;
            sink.write_all(&0u32.to_le_bytes())?;
            sink.write_all(&image_size.to_le_bytes())?;
            sink.write_all(&PIXELS_PER_METER.to_le_bytes())?;
            sink.write_all(&PIXELS_PER_METER.to_le_bytes())?;
            sink.write_all(&palette_entries.to_le_bytes())?;
            sink.write_all(&0u32.to_le_bytes())?;

            if bits_per_pixel == 8 {
                for value in 0..=255u8 {
                    sink.write_all(&[value, value, value, 0])?;
                }
            }
            Ok(())
        };
        write(&mut sink).map_err(CompositeError::SinkWrite)?;

        Ok(Self {
            sink,
            width,
            height,
            row_bytes,
            padding: (row_size as usize) - row_bytes,
            rows_written: 0,
        })
    }

    /// Append one row of pixel bytes (unpadded, production order).
    pub fn write_row(&mut self, row: &[u8]) -> Result<()> {
        debug_assert_eq!(row.len(), self.row_bytes, "row width mismatch");
        if self.rows_written == self.height {
            return Err(CompositeError::InvalidInstructions(format!(
                "more than {} rows written",
                self.height
            )));
        }
        self.sink.write_all(row).map_err(CompositeError::SinkWrite)?;
        if self.padding > 0 {
            let zeros = [0u8; 3];
            self.sink
                .write_all(&zeros[..self.padding])
                .map_err(CompositeError::SinkWrite)?;
        }
        self.rows_written += 1;
        Ok(())
    }

    /// Flush and return the sink, verifying the image is complete.
    pub fn finish(mut self) -> Result<W> {
        if self.rows_written != self.height {
            return Err(CompositeError::InvalidInstructions(format!(
                "{} of {} rows written",
                self.rows_written, self.height
            )));
        }
        self.sink.flush().map_err(CompositeError::SinkWrite)?;
        Ok(self.sink)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal header parse used to verify what the encoder wrote.
    fn parse_header(bytes: &[u8]) -> (u32, i32, i32, u16, u32, u32) {
        assert_eq!(&bytes[0..2], b"BM");
        let file_size = u32::from_le_bytes(bytes[2..6].try_into().unwrap());
        let offset = u32::from_le_bytes(bytes[10..14].try_into().unwrap());
        let width = i32::from_le_bytes(bytes[18..22].try_into().unwrap());
        let height = i32::from_le_bytes(bytes[22..26].try_into().unwrap());
        let bpp = u16::from_le_bytes(bytes[28..30].try_into().unwrap());
        let compression = u32::from_le_bytes(bytes[30..34].try_into().unwrap());
        assert_eq!(compression, 0);
        (file_size, width, height, bpp, offset, file_size - offset)
    }

    #[test]
    fn test_round_trip_24bpp_header() {
        let mut encoder = BmpEncoder::new(Vec::new(), 3, 2, 24).unwrap();
        // 3 pixels * 3 bytes = 9 bytes, padded to 12
        encoder.write_row(&[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        encoder.write_row(&[9; 9]).unwrap();
        let bytes = encoder.finish().unwrap();

        let (file_size, width, height, bpp, offset, image_size) = parse_header(&bytes);
        assert_eq!(width, 3);
        assert_eq!(height, 2);
        assert_eq!(bpp, 24);
        assert_eq!(offset, 54);
        assert_eq!(image_size, 24); // two 12-byte padded rows
        assert_eq!(file_size as usize, bytes.len());
        // Row padding bytes are zero
        assert_eq!(&bytes[54 + 9..54 + 12], &[0, 0, 0]);
    }

    #[test]
    fn test_8bpp_palette_offsets() {
        let mut encoder = BmpEncoder::new(Vec::new(), 4, 1, 8).unwrap();
        encoder.write_row(&[0, 64, 128, 255]).unwrap();
        let bytes = encoder.finish().unwrap();

        let (file_size, _, _, bpp, offset, _) = parse_header(&bytes);
        assert_eq!(bpp, 8);
        // Pixel data sits after the 1024-byte grayscale palette
        assert_eq!(offset, 54 + 1024);
        assert_eq!(file_size as usize, bytes.len());
        // Palette entry 128 is (128, 128, 128, 0)
        let entry = &bytes[54 + 128 * 4..54 + 128 * 4 + 4];
        assert_eq!(entry, &[128, 128, 128, 0]);
    }

    #[test]
    fn test_rows_written_top_down() {
        let mut encoder = BmpEncoder::new(Vec::new(), 1, 2, 8).unwrap();
        encoder.write_row(&[10]).unwrap();
        encoder.write_row(&[20]).unwrap();
        let bytes = encoder.finish().unwrap();
        let offset = 54 + 1024;
        // First produced row lands first in the file
        assert_eq!(bytes[offset], 10);
        assert_eq!(bytes[offset + 4], 20);
    }

    #[test]
    fn test_finish_rejects_incomplete_image() {
        let mut encoder = BmpEncoder::new(Vec::new(), 2, 3, 24).unwrap();
        encoder.write_row(&[0; 6]).unwrap();
        assert!(encoder.finish().is_err());
    }

    #[test]
    fn test_unsupported_depth_rejected() {
        assert!(BmpEncoder::new(Vec::new(), 2, 2, 16).is_err());
    }
}
