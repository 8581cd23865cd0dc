//! End-to-end scan processing with in-memory sinks.

use std::collections::HashMap;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use compositor::{process_scan, OutputFormat, ScanError, ScanOptions, SinkFactory};
use test_utils::SegmentFileBuilder;
use tokio::io::AsyncWrite;

/// AsyncWrite sink appending into a shared buffer.
struct MemorySink(Arc<Mutex<Vec<u8>>>);

impl AsyncWrite for MemorySink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Keeps one buffer per segment so tests can inspect what was written.
#[derive(Default)]
struct MemorySinkFactory {
    files: Mutex<HashMap<u8, Arc<Mutex<Vec<u8>>>>>,
}

impl MemorySinkFactory {
    fn bytes(&self, segment: u8) -> Vec<u8> {
        self.files.lock().unwrap()[&segment].lock().unwrap().clone()
    }
}

#[async_trait]
impl SinkFactory for MemorySinkFactory {
    type Sink = MemorySink;

    async fn create(&self, segment: u8) -> std::io::Result<MemorySink> {
        let buf = Arc::new(Mutex::new(Vec::new()));
        self.files.lock().unwrap().insert(segment, buf.clone());
        Ok(MemorySink(buf))
    }
}

fn band_file(band: u16, wavelength: f64, segment: u8) -> Cursor<Vec<u8>> {
    Cursor::new(
        SegmentFileBuilder::new()
            .columns(4)
            .lines(2)
            .band_number(band)
            .central_wavelength(wavelength)
            .segments(2, segment)
            .pixel_fill(512)
            .build(),
    )
}

#[tokio::test]
async fn test_multiband_scan_writes_one_raster_per_segment() {
    let mut sources = Vec::new();
    for segment in [1u8, 2] {
        for (band, wavelength) in [(1u16, 0.47), (2, 0.51), (3, 0.64)] {
            sources.push(band_file(band, wavelength, segment));
        }
    }

    let sinks = MemorySinkFactory::default();
    let results = process_scan(sources, &sinks, ScanOptions::default()).await;

    assert_eq!(results.len(), 2);
    for result in &results {
        let report = result.as_ref().unwrap();
        assert_eq!(report.width, 4);
        assert_eq!(report.height, 2);
    }

    for segment in [1u8, 2] {
        let bytes = sinks.bytes(segment);
        assert_eq!(&bytes[..2], b"BM");
        // 24 bpp, 4 px wide: 12-byte rows, no padding; 54-byte header
        assert_eq!(bytes.len(), 54 + 2 * 12);
        let width = i32::from_le_bytes(bytes[18..22].try_into().unwrap());
        let height = i32::from_le_bytes(bytes[22..26].try_into().unwrap());
        assert_eq!((width, height), (4, 2));
    }
}

#[tokio::test]
async fn test_grayscale_single_band_scan() {
    let sources = vec![Cursor::new(
        SegmentFileBuilder::new()
            .columns(4)
            .lines(2)
            .band_number(4)
            .central_wavelength(0.86)
            .pixel_fill(1000)
            .build(),
    )];

    let sinks = MemorySinkFactory::default();
    let options = ScanOptions {
        format: OutputFormat::Grayscale8,
        ..Default::default()
    };
    let results = process_scan(sources, &sinks, options).await;

    assert_eq!(results.len(), 1);
    let report = results[0].as_ref().unwrap();
    assert_eq!(report.segment, 1);

    let bytes = sinks.bytes(1);
    let bpp = u16::from_le_bytes(bytes[28..30].try_into().unwrap());
    assert_eq!(bpp, 8);
    // Grayscale palette precedes pixel data
    let offset = u32::from_le_bytes(bytes[10..14].try_into().unwrap());
    assert_eq!(offset, 54 + 1024);
}

#[tokio::test]
async fn test_failed_segment_does_not_block_siblings() {
    // Segment 2's pixel payload is cut short mid-raster
    let good = |segment| {
        Cursor::new(
            SegmentFileBuilder::new()
                .columns(4)
                .lines(2)
                .segments(2, segment)
                .pixel_fill(100)
                .build(),
        )
    };
    let full = SegmentFileBuilder::new()
        .columns(4)
        .lines(2)
        .segments(2, 2)
        .pixel_fill(100)
        .build();
    let truncated = Cursor::new(full[..full.len() - 10].to_vec());

    let sinks = MemorySinkFactory::default();
    let results = process_scan(vec![good(1), truncated], &sinks, ScanOptions::default()).await;

    assert_eq!(results.len(), 2);
    let ok: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    assert_eq!(ok.len(), 1);
    assert_eq!(ok[0].as_ref().unwrap().segment, 1);

    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    match failure {
        ScanError::Segment { segment, .. } => assert_eq!(*segment, 2),
        other => panic!("expected segment failure, got {:?}", other),
    }

    // The healthy segment's raster is complete
    assert_eq!(sinks.bytes(1).len(), 54 + 2 * 12);
}

#[tokio::test]
async fn test_undecodable_source_reports_its_index() {
    let mut corrupt = SegmentFileBuilder::new().build();
    corrupt[282] = 9; // break the second block's number

    let sinks = MemorySinkFactory::default();
    let results = process_scan(
        vec![
            Cursor::new(SegmentFileBuilder::new().build()),
            Cursor::new(corrupt),
        ],
        &sinks,
        ScanOptions::default(),
    )
    .await;

    assert_eq!(results.len(), 2);
    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    match failure {
        ScanError::Decode { index, .. } => assert_eq!(*index, 1),
        other => panic!("expected decode failure, got {:?}", other),
    }
    // The valid source still produced its raster
    assert!(results.iter().any(|r| r.is_ok()));
}

#[tokio::test]
async fn test_infrared_band_has_no_display_color() {
    let sources = vec![Cursor::new(
        SegmentFileBuilder::new()
            .band_number(5)
            .central_wavelength(1.61)
            .build(),
    )];

    let sinks = MemorySinkFactory::default();
    let results = process_scan(sources, &sinks, ScanOptions::default()).await;

    let failure = results[0].as_ref().unwrap_err();
    match failure {
        ScanError::Segment { segment, source } => {
            assert_eq!(*segment, 1);
            assert!(matches!(
                source,
                compositor::CompositeError::Colorimetry(_)
            ));
        }
        other => panic!("expected segment failure, got {:?}", other),
    }
}
