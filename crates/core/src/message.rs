//! Messages sent to a viewer over its streaming connection.
//!
//! One JSON object per frame:
//! ```json
//! {"type":"metadata","size":2048,"lines":32,"size_human":"2.0 KB"}
//! {"type":"log_batch","data":["line1","line2"]}
//! {"type":"sys","msg":"__LIVE_START__"}
//! ```

use serde::{Deserialize, Serialize};

use crate::metrics::FileMetadata;

/// Marks the end of history; everything after it is live data.
pub const LIVE_START_MARKER: &str = "__LIVE_START__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Metadata {
        size: u64,
        lines: u64,
        size_human: String,
    },
    LogBatch {
        data: Vec<String>,
    },
    Sys {
        msg: String,
    },
}

impl StreamMessage {
    pub fn metadata(meta: &FileMetadata) -> Self {
        Self::Metadata {
            size: meta.size_bytes,
            lines: meta.line_count,
            size_human: meta.size_human.clone(),
        }
    }

    pub fn batch(data: Vec<String>) -> Self {
        Self::LogBatch { data }
    }

    pub fn live_start() -> Self {
        Self::Sys {
            msg: LIVE_START_MARKER.to_string(),
        }
    }

    pub fn error(msg: impl std::fmt::Display) -> Self {
        Self::Sys {
            msg: format!("Error: {msg}"),
        }
    }

    pub fn alias_not_found(alias: &str) -> Self {
        Self::error(format_args!("{alias} not found"))
    }

    pub fn to_json(&self) -> String {
        // Only strings and integers inside; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
