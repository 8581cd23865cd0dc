//! Bounded byte pipe between the compositor and the file sink.
//!
//! The producer side is synchronous (`std::io::Write`, used from a
//! blocking task); the consumer side drains asynchronously to an
//! `AsyncWrite`. The bounded channel between them is the sole
//! backpressure mechanism: a full channel blocks the producer, an empty
//! one parks the consumer, so memory stays bounded when encoding outruns
//! the disk or vice versa.

use std::io::{self, Write};

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Bytes accumulated before a chunk is pushed through the channel.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Create a bounded pipe holding at most `capacity_chunks` in-flight
/// chunks (`capacity_chunks × CHUNK_SIZE` bytes, plus one partial chunk
/// in the producer).
pub fn bounded_pipe(capacity_chunks: usize) -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel(capacity_chunks.max(1));
    (
        PipeWriter {
            tx: Some(tx),
            buf: Vec::with_capacity(CHUNK_SIZE),
        },
        PipeReader { rx },
    )
}

/// Producer half. Must be used from a blocking context, never from an
/// async task.
pub struct PipeWriter {
    tx: Option<mpsc::Sender<Bytes>>,
    buf: Vec<u8>,
}

impl PipeWriter {
    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(
            &mut self.buf,
            Vec::with_capacity(CHUNK_SIZE),
        ));
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "pipe already closed"))?;
        tx.blocking_send(chunk)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe consumer dropped"))
    }

    /// Flush the partial chunk and close the channel, letting the
    /// consumer run dry and finish.
    pub fn finish(mut self) -> io::Result<()> {
        self.send_buffered()?;
        self.tx = None;
        Ok(())
    }
}

impl Write for PipeWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut rest = data;
        while !rest.is_empty() {
            let room = CHUNK_SIZE - self.buf.len();
            let take = room.min(rest.len());
            self.buf.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.buf.len() == CHUNK_SIZE {
                self.send_buffered()?;
            }
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        // Best-effort delivery of the tail if finish() was skipped by an
        // error path; the consumer still observes channel closure.
        let _ = self.send_buffered();
        self.tx = None;
    }
}

/// Consumer half.
pub struct PipeReader {
    rx: mpsc::Receiver<Bytes>,
}

impl PipeReader {
    /// Drain every chunk to `sink`, returning the byte count written.
    ///
    /// Completes when the producer closes its half; fails on the first
    /// sink error.
    pub async fn copy_to<W: AsyncWrite + Unpin>(mut self, sink: &mut W) -> io::Result<u64> {
        let mut written = 0u64;
        while let Some(chunk) = self.rx.recv().await {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pipe_transfers_all_bytes() {
        let (mut writer, reader) = bounded_pipe(4);
        let payload: Vec<u8> = (0..200_000).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();

        let producer = tokio::task::spawn_blocking(move || {
            writer.write_all(&payload).unwrap();
            writer.finish().unwrap();
        });

        let mut sink = Vec::new();
        let written = reader.copy_to(&mut sink).await.unwrap();
        producer.await.unwrap();

        assert_eq!(written, expected.len() as u64);
        assert_eq!(sink, expected);
    }

    #[tokio::test]
    async fn test_producer_blocks_until_consumer_drains() {
        // Capacity of one chunk: the producer cannot run ahead of the
        // consumer by more than the channel bound
        let (mut writer, reader) = bounded_pipe(1);

        let producer = tokio::task::spawn_blocking(move || {
            writer.write_all(&vec![7u8; CHUNK_SIZE * 8]).unwrap();
            writer.finish().unwrap();
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!producer.is_finished(), "producer ran unbounded");

        let mut sink = Vec::new();
        reader.copy_to(&mut sink).await.unwrap();
        producer.await.unwrap();
        assert_eq!(sink.len(), CHUNK_SIZE * 8);
    }

    #[tokio::test]
    async fn test_dropped_reader_fails_producer() {
        let (mut writer, reader) = bounded_pipe(1);
        drop(reader);

        let result = tokio::task::spawn_blocking(move || {
            writer.write_all(&vec![0u8; CHUNK_SIZE * 2])
        })
        .await
        .unwrap();
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }
}
