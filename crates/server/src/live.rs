//! Live tail engine: polls an open log file for appended lines and delivers
//! them to one viewer in batches.
//!
//! Lines are flushed as one `log_batch` when the buffer reaches
//! `batch_max_lines`, when the oldest buffered line has waited
//! `batch_interval`, or as soon as a read finds nothing new. With nothing
//! buffered and nothing to read, the engine sleeps `poll_interval`.
//! Reaching end-of-file only means "caught up"; the loop ends when the
//! viewer goes away or the server shuts down.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ezviewer_core::config::StreamSettings;
use ezviewer_core::reader::decode_line;
use ezviewer_core::StreamMessage;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A line that grows past this many bytes without a newline is delivered as
/// it stands, and the rest continues as the next line.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct BatchPolicy {
    pub max_lines: usize,
    pub interval: Duration,
    pub poll_interval: Duration,
}

impl From<&StreamSettings> for BatchPolicy {
    fn from(settings: &StreamSettings) -> Self {
        Self {
            max_lines: settings.batch_max_lines.max(1),
            interval: settings.batch_interval(),
            poll_interval: settings.poll_interval(),
        }
    }
}

/// Why a live tail stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailEnd {
    Disconnected,
    Shutdown,
    Failed,
}

pub struct LiveTail {
    path: PathBuf,
    reader: BufReader<File>,
    /// Bytes consumed so far, including an unterminated fragment.
    offset: u64,
    /// Bytes of a line whose newline has not been written yet.
    partial: Vec<u8>,
    buffer: Vec<String>,
    batch_started: Option<Instant>,
    policy: BatchPolicy,
}

impl LiveTail {
    /// Open a private handle on `path`, positioned at its current end.
    pub async fn open_at_end(path: &Path, policy: BatchPolicy) -> io::Result<Self> {
        let mut file = File::open(path).await?;
        let offset = file.seek(SeekFrom::End(0)).await?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            offset,
            partial: Vec::new(),
            buffer: Vec::with_capacity(policy.max_lines),
            batch_started: None,
            policy,
        })
    }

    /// Byte offset where live data starts (or has reached).
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Next complete line, or `None` when caught up with the writer.
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        let room = MAX_LINE_BYTES.saturating_sub(self.partial.len()) as u64;
        let n = (&mut self.reader)
            .take(room)
            .read_until(b'\n', &mut self.partial)
            .await?;
        self.offset += n as u64;
        if self.partial.last() == Some(&b'\n') || self.partial.len() >= MAX_LINE_BYTES {
            let line = decode_line(&self.partial);
            self.partial.clear();
            return Ok(Some(line));
        }
        Ok(None)
    }

    /// Restart from the top when the file shrank below our offset.
    async fn check_truncation(&mut self) -> io::Result<()> {
        let file_size = tokio::fs::metadata(&self.path).await?.len();
        if file_size < self.offset {
            info!(
                "File truncated ({}B < {}B offset), resetting: {}",
                file_size,
                self.offset,
                self.path.display()
            );
            self.reader.seek(SeekFrom::Start(0)).await?;
            self.offset = 0;
            self.partial.clear();
        }
        Ok(())
    }

    /// Send buffered lines as one batch. `false` when the viewer is gone.
    async fn flush(&mut self, tx: &mpsc::Sender<StreamMessage>) -> bool {
        self.batch_started = None;
        if self.buffer.is_empty() {
            return true;
        }
        let lines = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.policy.max_lines));
        debug!("flushing {} live lines from {}", lines.len(), self.path.display());
        tx.send(StreamMessage::batch(lines)).await.is_ok()
    }

    pub async fn run(
        mut self,
        tx: &mpsc::Sender<StreamMessage>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> TailEnd {
        loop {
            if *shutdown.borrow() {
                return TailEnd::Shutdown;
            }

            let line = match self.next_line().await {
                Ok(line) => line,
                Err(e) => {
                    warn!("Error tailing {}: {}", self.path.display(), e);
                    let _ = self.flush(tx).await;
                    let _ = tx.send(StreamMessage::error(&e)).await;
                    return TailEnd::Failed;
                }
            };

            match line {
                Some(line) => {
                    self.buffer.push(line);
                    let started = *self.batch_started.get_or_insert_with(Instant::now);
                    if (self.buffer.len() >= self.policy.max_lines
                        || started.elapsed() >= self.policy.interval)
                        && !self.flush(tx).await
                    {
                        return TailEnd::Disconnected;
                    }
                }
                None if !self.buffer.is_empty() => {
                    if !self.flush(tx).await {
                        return TailEnd::Disconnected;
                    }
                }
                None => {
                    if let Err(e) = self.check_truncation().await {
                        warn!("Cannot stat {}: {}", self.path.display(), e);
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(self.policy.poll_interval) => {}
                        _ = tx.closed() => return TailEnd::Disconnected,
                        _ = shutdown.changed() => return TailEnd::Shutdown,
                    }
                }
            }
        }
    }
}
