//! Backward pagination over a log file by line number.
//!
//! A viewer first receives the live tail; scrolling further back asks for
//! the page that ends just before the oldest line it already shows.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::metrics::file_metadata;
use crate::reader::{range_lines, ReadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// First page of the file.
    Top,
    /// Page ending right before `before_line`.
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub direction: Direction,
    #[serde(default)]
    pub before_line: u64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub lines: Vec<String>,
    pub start_line: u64,
    pub end_line: u64,
    pub has_more: bool,
    pub total_lines: u64,
}

/// Serve one page of `path`.
pub fn read_page(path: &Path, req: &PageRequest) -> Result<HistoryPage, ReadError> {
    let total_lines = file_metadata(path)?.line_count;
    match req.direction {
        Direction::Top => {
            let lines = range_lines(path, 1, req.count)?;
            let end_line = req.count.min(total_lines);
            Ok(HistoryPage {
                lines,
                start_line: 1,
                end_line,
                has_more: end_line < total_lines,
                total_lines,
            })
        }
        Direction::Up if req.before_line <= 1 => Ok(HistoryPage {
            lines: Vec::new(),
            start_line: 0,
            end_line: 0,
            has_more: false,
            total_lines,
        }),
        Direction::Up => {
            let start_line = req.before_line.saturating_sub(req.count).max(1);
            let lines = range_lines(path, start_line, req.before_line - start_line)?;
            Ok(HistoryPage {
                lines,
                start_line,
                end_line: req.before_line - 1,
                has_more: start_line > 1,
                total_lines,
            })
        }
    }
}
