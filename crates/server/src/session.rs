//! One viewer connection: metadata, history, live marker, then live tail.
//!
//! The session only talks to an `mpsc::Sender<StreamMessage>`; the WebSocket
//! glue in `ws.rs` owns the socket. A closed channel means the viewer left.

use std::path::{Path, PathBuf};

use ezviewer_core::config::StreamSettings;
use ezviewer_core::metrics::file_metadata_until;
use ezviewer_core::reader::tail_lines_until;
use ezviewer_core::{FileMetadata, Registry, StreamMessage};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::live::{BatchPolicy, LiveTail, TailEnd};

/// First line written into a tracked file that does not exist yet.
pub const CREATED_FILE_LINE: &str = "[System] Log file created.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    AliasNotFound,
    Disconnected,
    Shutdown,
    Failed,
}

impl From<TailEnd> for SessionEnd {
    fn from(end: TailEnd) -> Self {
        match end {
            TailEnd::Disconnected => Self::Disconnected,
            TailEnd::Shutdown => Self::Shutdown,
            TailEnd::Failed => Self::Failed,
        }
    }
}

/// Run a streaming session for `alias` until the viewer disconnects.
pub async fn run_session(
    alias: &str,
    registry: &Registry,
    settings: &StreamSettings,
    tx: mpsc::Sender<StreamMessage>,
    mut shutdown: watch::Receiver<bool>,
) -> SessionEnd {
    let path = match resolve_alias(alias, registry).await {
        Ok(Some(path)) => path,
        Ok(None) => {
            info!("Streaming request for unknown alias: {}", alias);
            let _ = tx.send(StreamMessage::alias_not_found(alias)).await;
            return SessionEnd::AliasNotFound;
        }
        Err(e) => {
            warn!("Registry unavailable for {}: {:#}", alias, e);
            let _ = tx.send(StreamMessage::error(format!("{e:#}"))).await;
            return SessionEnd::Failed;
        }
    };

    if let Err(e) = ensure_log_file(&path).await {
        warn!("Cannot create {}: {}", path.display(), e);
        let _ = tx.send(StreamMessage::error(&e)).await;
        return SessionEnd::Failed;
    }

    // Live reading starts where the history read stops.
    let live = match LiveTail::open_at_end(&path, BatchPolicy::from(settings)).await {
        Ok(live) => live,
        Err(e) => {
            warn!("Cannot open {}: {}", path.display(), e);
            let _ = tx.send(StreamMessage::error(&e)).await;
            return SessionEnd::Failed;
        }
    };
    let cutover = live.offset();

    let (meta, history) = {
        let path = path.clone();
        let history_lines = settings.history_lines;
        match tokio::task::spawn_blocking(move || {
            let meta = file_metadata_until(&path, cutover)?;
            let history = tail_lines_until(&path, history_lines, cutover)?;
            Ok::<_, ezviewer_core::reader::ReadError>((meta, history))
        })
        .await
        {
            Ok(Ok(read)) => read,
            Ok(Err(e)) => {
                warn!("History read failed for {}: {}", alias, e);
                let _ = tx.send(StreamMessage::error(&e)).await;
                (FileMetadata::empty(), Vec::new())
            }
            Err(e) => {
                warn!("History task failed for {}: {}", alias, e);
                return SessionEnd::Failed;
            }
        }
    };

    if tx.send(StreamMessage::metadata(&meta)).await.is_err() {
        return SessionEnd::Disconnected;
    }
    for chunk in history.chunks(settings.history_chunk_lines.max(1)) {
        if tx.send(StreamMessage::batch(chunk.to_vec())).await.is_err() {
            return SessionEnd::Disconnected;
        }
        tokio::task::yield_now().await;
    }
    if tx.send(StreamMessage::live_start()).await.is_err() {
        return SessionEnd::Disconnected;
    }

    info!(
        "Live tail started: {} ({} history lines, offset {})",
        alias,
        history.len(),
        cutover
    );
    live.run(&tx, &mut shutdown).await.into()
}

async fn resolve_alias(alias: &str, registry: &Registry) -> anyhow::Result<Option<PathBuf>> {
    let registry = registry.clone();
    let alias = alias.to_string();
    Ok(tokio::task::spawn_blocking(move || registry.get(&alias)).await??)
}

/// Create a missing log file (and its directory) with a single notice line.
async fn ensure_log_file(path: &Path) -> std::io::Result<()> {
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, format!("{CREATED_FILE_LINE}\n")).await?;
    info!("Created missing log file: {}", path.display());
    Ok(())
}
