//! Compositor behavior over synthetic segment files.

use std::io::Cursor;

use compositor::{CompositeError, DecodeInstructions, OutputFormat, SegmentCompositor};
use hsd_parser::{decode, DecodedFile};
use test_utils::SegmentFileBuilder;

fn decoded(builder: SegmentFileBuilder) -> DecodedFile {
    decode(Cursor::new(builder.build())).unwrap()
}

/// The byte the compositor writes for a clamped [0, 1] channel.
fn channel_byte(value: f64) -> u8 {
    (value * 255.0).min(255.0) as u8
}

#[test]
fn test_three_band_uniform_average() {
    // 11 valid bits: full scale 2046, so raw 1023 calibrates to exactly 0.5
    let bands = [(1u16, 0.47), (2, 0.51), (3, 0.64)];
    let files: Vec<DecodedFile> = bands
        .iter()
        .map(|&(band, wavelength)| {
            decoded(
                SegmentFileBuilder::new()
                    .columns(2)
                    .lines(1)
                    .band_number(band)
                    .central_wavelength(wavelength)
                    .valid_bits_per_pixel(11)
                    .pixel_fill(1023),
            )
        })
        .collect();

    let instructions = DecodeInstructions::from_geometry(2, 1, 1).unwrap();
    let mut compositor =
        SegmentCompositor::new(files, instructions, OutputFormat::Bgr24).unwrap();

    let mut row = Vec::new();
    compositor.next_row(&mut row).unwrap();
    assert_eq!(row.len(), 2 * 3);

    // Uniform averaging: each channel is the mean of the three band
    // colors at half intensity
    let colors: Vec<_> = [470u32, 510, 640]
        .iter()
        .map(|&nm| colorimetry::wavelength_to_rgb(nm).unwrap())
        .collect();
    let expected_r = channel_byte(colors.iter().map(|c| c.r * 0.5).sum::<f64>() / 3.0);
    let expected_g = channel_byte(colors.iter().map(|c| c.g * 0.5).sum::<f64>() / 3.0);
    let expected_b = channel_byte(colors.iter().map(|c| c.b * 0.5).sum::<f64>() / 3.0);
    assert_eq!(&row[..3], &[expected_b, expected_g, expected_r]);
    assert_eq!(&row[3..], &[expected_b, expected_g, expected_r]);
}

#[test]
fn test_sentinel_pixels_render_black() {
    let file = decoded(
        SegmentFileBuilder::new()
            .columns(4)
            .lines(1)
            .band_number(3)
            .central_wavelength(0.64)
            .valid_bits_per_pixel(11)
            .sentinels(2047, 2048)
            .pixels(vec![2047, 2048, 0, 2046]),
    );

    let instructions = DecodeInstructions::from_geometry(4, 1, 1).unwrap();
    let mut compositor =
        SegmentCompositor::new(vec![file], instructions, OutputFormat::Bgr24).unwrap();
    let mut row = Vec::new();
    compositor.next_row(&mut row).unwrap();

    // Both sentinels and raw zero are black; full scale carries the band
    // color
    assert_eq!(&row[..3], &[0, 0, 0]);
    assert_eq!(&row[3..6], &[0, 0, 0]);
    assert_eq!(&row[6..9], &[0, 0, 0]);
    let red = colorimetry::wavelength_to_rgb(640).unwrap();
    assert_eq!(
        &row[9..12],
        &[
            channel_byte(red.b),
            channel_byte(red.g),
            channel_byte(red.r)
        ]
    );
}

#[test]
fn test_decimation_keeps_one_in_d_per_axis() {
    // 4x4 raster, factor 2: retained samples are rows 0 and 2, columns 0
    // and 2
    let pixels: Vec<u16> = (0..16).map(|i| i * 100).collect();
    let file = decoded(
        SegmentFileBuilder::new()
            .columns(4)
            .lines(4)
            .valid_bits_per_pixel(11)
            .pixels(pixels),
    );

    let instructions = DecodeInstructions::from_geometry(4, 4, 2).unwrap();
    assert_eq!(instructions.target_width, 2);
    assert_eq!(instructions.target_height, 2);

    let mut compositor =
        SegmentCompositor::new(vec![file], instructions, OutputFormat::Grayscale8).unwrap();

    let expected = |raw: u16| channel_byte((raw as f64 / 2046.0).clamp(0.0, 1.0));
    let mut row = Vec::new();
    compositor.next_row(&mut row).unwrap();
    assert_eq!(row, vec![expected(0), expected(200)]);
    compositor.next_row(&mut row).unwrap();
    assert_eq!(row, vec![expected(800), expected(1000)]);
    assert_eq!(compositor.rows_remaining(), 0);
}

#[test]
fn test_segment_tiling_covers_contiguous_ranges() {
    let mut covered = Vec::new();
    for sequence in 1..=4u8 {
        let file = decoded(
            SegmentFileBuilder::new()
                .columns(8)
                .lines(8)
                .segments(4, sequence),
        );
        let instructions = DecodeInstructions::from_geometry(8, 8, 2).unwrap();
        let compositor =
            SegmentCompositor::new(vec![file], instructions, OutputFormat::Grayscale8).unwrap();
        let range = compositor.row_range();
        assert_eq!(range, 4 * (sequence as usize - 1)..4 * sequence as usize);
        covered.extend(range);
    }
    // No gap, no overlap across the scan
    assert_eq!(covered, (0..16).collect::<Vec<_>>());
}

#[test]
fn test_read_past_extent_is_fatal() {
    let file = decoded(SegmentFileBuilder::new().columns(2).lines(1));
    let instructions = DecodeInstructions::from_geometry(2, 1, 1).unwrap();
    let mut compositor =
        SegmentCompositor::new(vec![file], instructions, OutputFormat::Grayscale8).unwrap();

    let mut row = Vec::new();
    compositor.next_row(&mut row).unwrap();
    // The raster is fully consumed; another row must fail, not repeat or
    // zero-fill
    let err = compositor.next_row(&mut row).unwrap_err();
    assert!(matches!(
        err,
        CompositeError::Decode(hsd_parser::DecodeError::PixelStreamExhausted)
    ));
}

#[test]
fn test_mismatched_segments_rejected() {
    let a = decoded(SegmentFileBuilder::new().segments(2, 1));
    let b = decoded(SegmentFileBuilder::new().segments(2, 2));
    let instructions = DecodeInstructions::from_geometry(4, 2, 1).unwrap();
    let err = SegmentCompositor::new(vec![a, b], instructions, OutputFormat::Bgr24).unwrap_err();
    assert!(matches!(err, CompositeError::SegmentMismatch(_)));
}

#[test]
fn test_unknown_wavelength_fails_before_pixels() {
    // Band 5 sits in the near infrared; it has a visible-layout
    // calibration block but no display color
    let file = decoded(
        SegmentFileBuilder::new()
            .band_number(5)
            .central_wavelength(1.61),
    );
    let instructions = DecodeInstructions::from_geometry(4, 2, 1).unwrap();
    let err =
        SegmentCompositor::new(vec![file], instructions, OutputFormat::Bgr24).unwrap_err();
    assert!(matches!(err, CompositeError::Colorimetry(_)));

    // Grayscale output needs no color and accepts the same band
    let file = decoded(
        SegmentFileBuilder::new()
            .band_number(5)
            .central_wavelength(1.61),
    );
    assert!(SegmentCompositor::new(vec![file], instructions, OutputFormat::Grayscale8).is_ok());
}

#[test]
fn test_empty_composite_rejected() {
    let instructions = DecodeInstructions::from_geometry(4, 2, 1).unwrap();
    let err = SegmentCompositor::new(vec![], instructions, OutputFormat::Bgr24).unwrap_err();
    assert!(matches!(err, CompositeError::EmptyComposite));
}
