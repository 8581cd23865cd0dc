//! Per-segment output files.

use std::path::PathBuf;

use async_trait::async_trait;
use compositor::SinkFactory;
use tokio::fs::File;

/// Writes each segment's raster to `<out_dir>/<stem>_S<segment>.bmp`.
pub struct BmpDirectory {
    out_dir: PathBuf,
    stem: String,
}

impl BmpDirectory {
    pub fn new(out_dir: PathBuf, stem: impl Into<String>) -> Self {
        Self {
            out_dir,
            stem: stem.into(),
        }
    }

    pub fn path_for(&self, segment: u8) -> PathBuf {
        self.out_dir
            .join(format!("{}_S{:02}.bmp", self.stem, segment))
    }
}

#[async_trait]
impl SinkFactory for BmpDirectory {
    type Sink = File;

    async fn create(&self, segment: u8) -> std::io::Result<File> {
        File::create(self.path_for(segment)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_path_layout() {
        let sinks = BmpDirectory::new(PathBuf::from("/tmp/out"), "HS_TEST_0030");
        assert_eq!(
            sinks.path_for(3),
            PathBuf::from("/tmp/out/HS_TEST_0030_S03.bmp")
        );
    }
}
