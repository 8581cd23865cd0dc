//! Synthetic HSD segment file builder.
//!
//! Serializes the eleven header blocks and a raster payload in either
//! byte order, with every field controllable from tests. Defaults model a
//! small visible-band segment.

/// Byte order to serialize with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Builder for one synthetic segment file.
///
/// ```
/// use test_utils::SegmentFileBuilder;
///
/// let bytes = SegmentFileBuilder::new()
///     .columns(8)
///     .lines(4)
///     .band_number(2)
///     .pixel_fill(100)
///     .build();
/// assert_eq!(bytes.len() % 2, 1); // odd header length, even payload
/// ```
#[derive(Debug, Clone)]
pub struct SegmentFileBuilder {
    endianness: Endianness,
    satellite: String,
    processing_center: String,
    observation_area: String,
    observation_timeline: u16,
    observation_start_time: f64,
    observation_end_time: f64,
    file_creation_time: f64,
    file_name: String,
    bits_per_pixel: u16,
    columns: u16,
    lines: u16,
    band_number: u16,
    central_wavelength: f64,
    valid_bits_per_pixel: u16,
    error_pixel_count: u16,
    outside_scan_count: u16,
    total_segments: u8,
    sequence_number: u8,
    first_line_number: u16,
    navigation_corrections: u16,
    observation_times: u16,
    error_entries: u16,
    pixels: Option<Vec<u16>>,
    pixel_fill: u16,
    truncate_at: Option<usize>,
}

impl Default for SegmentFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentFileBuilder {
    pub fn new() -> Self {
        Self {
            endianness: Endianness::Little,
            satellite: "Himawari-9".to_string(),
            processing_center: "MSC".to_string(),
            observation_area: "FLDK".to_string(),
            observation_timeline: 1340,
            observation_start_time: 60248.5696,
            observation_end_time: 60248.5700,
            file_creation_time: 60248.5747,
            file_name: "synthetic.DAT".to_string(),
            bits_per_pixel: 16,
            columns: 4,
            lines: 2,
            band_number: 1,
            central_wavelength: 0.47,
            valid_bits_per_pixel: 11,
            error_pixel_count: 65535,
            outside_scan_count: 65534,
            total_segments: 1,
            sequence_number: 1,
            first_line_number: 1,
            navigation_corrections: 0,
            observation_times: 0,
            error_entries: 0,
            pixels: None,
            pixel_fill: 0,
            truncate_at: None,
        }
    }

    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn satellite(mut self, name: &str) -> Self {
        self.satellite = name.to_string();
        self
    }

    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = name.to_string();
        self
    }

    pub fn columns(mut self, columns: u16) -> Self {
        self.columns = columns;
        self
    }

    pub fn lines(mut self, lines: u16) -> Self {
        self.lines = lines;
        self
    }

    pub fn band_number(mut self, band: u16) -> Self {
        self.band_number = band;
        self
    }

    pub fn central_wavelength(mut self, micrometers: f64) -> Self {
        self.central_wavelength = micrometers;
        self
    }

    pub fn valid_bits_per_pixel(mut self, bits: u16) -> Self {
        self.valid_bits_per_pixel = bits;
        self
    }

    pub fn sentinels(mut self, error_pixel: u16, outside_scan: u16) -> Self {
        self.error_pixel_count = error_pixel;
        self.outside_scan_count = outside_scan;
        self
    }

    pub fn segments(mut self, total: u8, sequence: u8) -> Self {
        self.total_segments = total;
        self.sequence_number = sequence;
        self
    }

    pub fn first_line_number(mut self, line: u16) -> Self {
        self.first_line_number = line;
        self
    }

    pub fn navigation_corrections(mut self, count: u16) -> Self {
        self.navigation_corrections = count;
        self
    }

    pub fn observation_times(mut self, count: u16) -> Self {
        self.observation_times = count;
        self
    }

    pub fn error_entries(mut self, count: u16) -> Self {
        self.error_entries = count;
        self
    }

    /// Explicit raster payload, row-major. Length must be columns × lines.
    pub fn pixels(mut self, pixels: Vec<u16>) -> Self {
        self.pixels = Some(pixels);
        self
    }

    /// Fill the whole raster with one raw value.
    pub fn pixel_fill(mut self, value: u16) -> Self {
        self.pixel_fill = value;
        self
    }

    /// Cut the serialized file at a byte offset (truncation tests).
    pub fn truncate_at(mut self, offset: usize) -> Self {
        self.truncate_at = Some(offset);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut w = Writer::new(self.endianness);

        // Block 1: basic information (282 bytes)
        w.u8(1);
        w.u16(282);
        w.u16(11);
        w.u8(match self.endianness {
            Endianness::Little => 0,
            Endianness::Big => 1,
        });
        w.padded(&self.satellite, 16);
        w.padded(&self.processing_center, 16);
        w.padded(&self.observation_area, 4);
        w.padded("RT", 2);
        w.u16(self.observation_timeline);
        w.f64(self.observation_start_time);
        w.f64(self.observation_end_time);
        w.f64(self.file_creation_time);
        let header_length = self.header_length();
        w.u32(header_length);
        w.u32(self.columns as u32 * self.lines as u32 * 2);
        w.u8(0);
        w.u8(0);
        w.u8(77);
        w.u8(1);
        w.padded("1.3", 32);
        w.padded(&self.file_name, 128);
        w.zeros(40);

        // Block 2: data information (50 bytes)
        w.u8(2);
        w.u16(50);
        w.u16(self.bits_per_pixel);
        w.u16(self.columns);
        w.u16(self.lines);
        w.u8(0);
        w.zeros(40);

        // Block 3: projection information (127 bytes)
        w.u8(3);
        w.u16(127);
        w.f64(140.7);
        w.u32(20466275);
        w.u32(20466275);
        w.f32(5500.5);
        w.f32(5500.5);
        w.f64(42164.0);
        w.f64(6378.1370);
        w.f64(6356.7523);
        w.f64(0.00669438);
        w.f64(0.99330562);
        w.f64(1.006739501);
        w.f64(1737122264.0);
        w.u16(4);
        w.u16(2);
        w.zeros(40);

        // Block 4: navigation information (139 bytes)
        w.u8(4);
        w.u16(139);
        w.f64(60248.5698);
        w.f64(140.65);
        w.f64(-0.05);
        w.f64(42165.3);
        w.f64(140.68);
        w.f64(-0.04);
        for v in [-13210.9, 132534.6, 57456.3] {
            w.f64(v);
        }
        for v in [-321407.4, 172329.8, 68516.1] {
            w.f64(v);
        }
        w.zeros(40);

        // Block 5: calibration information (147 bytes either branch)
        w.u8(5);
        w.u16(147);
        w.u16(self.band_number);
        w.f64(self.central_wavelength);
        w.u16(self.valid_bits_per_pixel);
        w.u16(self.error_pixel_count);
        w.u16(self.outside_scan_count);
        w.f64(0.3655);
        w.f64(-7.3112);
        if self.band_number < 7 {
            w.f64(0.0008741);
            w.f64(60240.0);
            w.f64(0.3655);
            w.f64(-7.3112);
            w.zeros(80);
        } else {
            w.zeros(112);
        }

        // Block 6: inter-calibration information (259 bytes)
        w.u8(6);
        w.u16(259);
        for _ in 0..8 {
            w.f64(0.0);
        }
        w.f32(0.0);
        w.f32(0.0);
        w.zeros(128);
        w.zeros(56);

        // Block 7: segment information (47 bytes)
        w.u8(7);
        w.u16(47);
        w.u8(self.total_segments);
        w.u8(self.sequence_number);
        w.u16(self.first_line_number);
        w.zeros(40);

        // Block 8: navigation correction (61 + 10n bytes)
        w.u8(8);
        w.u16(61 + 10 * self.navigation_corrections);
        w.f32(5500.5);
        w.f32(0.0);
        w.f64(0.0);
        w.u16(self.navigation_corrections);
        for i in 0..self.navigation_corrections {
            w.u16(i + 1);
            w.f32(0.25);
            w.f32(-0.25);
        }
        w.zeros(40);

        // Block 9: observation time (45 + 10n bytes)
        w.u8(9);
        w.u16(45 + 10 * self.observation_times);
        w.u16(self.observation_times);
        for i in 0..self.observation_times {
            w.u16(i * 100 + 1);
            w.f64(self.observation_start_time + i as f64 * 1e-5);
        }
        w.zeros(40);

        // Block 10: error information (47 + 4n bytes, 4-byte length field)
        w.u8(10);
        w.u32(47 + 4 * self.error_entries as u32);
        w.u16(self.error_entries);
        for i in 0..self.error_entries {
            w.u16(i + 1);
            w.u16(3);
        }
        w.zeros(40);

        // Block 11: spare (259 bytes)
        w.u8(11);
        w.u16(259);
        w.zeros(256);

        // Raster payload
        let sample_count = self.columns as usize * self.lines as usize;
        match &self.pixels {
            Some(pixels) => {
                assert_eq!(pixels.len(), sample_count, "pixel payload size mismatch");
                for &p in pixels {
                    w.u16(p);
                }
            }
            None => {
                for _ in 0..sample_count {
                    w.u16(self.pixel_fill);
                }
            }
        }

        let mut bytes = w.finish();
        if let Some(offset) = self.truncate_at {
            bytes.truncate(offset);
        }
        bytes
    }

    fn header_length(&self) -> u32 {
        282 + 50
            + 127
            + 139
            + 147
            + 259
            + 47
            + (61 + 10 * self.navigation_corrections as u32)
            + (45 + 10 * self.observation_times as u32)
            + (47 + 4 * self.error_entries as u32)
            + 259
    }
}

struct Writer {
    buf: Vec<u8>,
    endianness: Endianness,
}

impl Writer {
    fn new(endianness: Endianness) -> Self {
        Self {
            buf: Vec::new(),
            endianness,
        }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        match self.endianness {
            Endianness::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            Endianness::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    fn u32(&mut self, v: u32) {
        match self.endianness {
            Endianness::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            Endianness::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    fn f32(&mut self, v: f32) {
        match self.endianness {
            Endianness::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            Endianness::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    fn f64(&mut self, v: f64) {
        match self.endianness {
            Endianness::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
            Endianness::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
        }
    }

    fn padded(&mut self, s: &str, len: usize) {
        let bytes = s.as_bytes();
        assert!(bytes.len() <= len, "string longer than field");
        self.buf.extend_from_slice(bytes);
        self.buf.extend(std::iter::repeat(0u8).take(len - bytes.len()));
    }

    fn zeros(&mut self, len: usize) {
        self.buf.extend(std::iter::repeat(0u8).take(len));
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}
