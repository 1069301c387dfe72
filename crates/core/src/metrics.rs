use serde::Serialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::reader::ReadError;

const SCAN_BUF_SIZE: usize = 64 * 1024;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Size and line count of a log file at the moment it was measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct FileMetadata {
    pub size_bytes: u64,
    pub line_count: u64,
    pub size_human: String,
}

impl FileMetadata {
    /// Metadata of a file that does not exist (or is empty).
    pub fn empty() -> Self {
        Self {
            size_bytes: 0,
            line_count: 0,
            size_human: human_size(0),
        }
    }
}

/// Measure `path`. A missing file reports zero bytes and zero lines.
///
/// The line count is a full scan of the file. A final fragment without a
/// trailing newline counts as a line, matching what the readers return.
pub fn file_metadata(path: &Path) -> Result<FileMetadata, ReadError> {
    file_metadata_until(path, u64::MAX)
}

/// Measure only the first `limit` bytes of `path`.
///
/// Pairs with [`tail_lines_until`](crate::reader::tail_lines_until): both
/// describe the file as it was at one byte offset, so a viewer can number
/// the history it received even while the file keeps growing.
pub fn file_metadata_until(path: &Path, limit: u64) -> Result<FileMetadata, ReadError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(FileMetadata::empty());
        }
        Err(e) => return Err(ReadError::io(path, e)),
    };
    let size_bytes = file
        .metadata()
        .map_err(|e| ReadError::io(path, e))?
        .len()
        .min(limit);
    let line_count = count_lines(file.take(size_bytes)).map_err(|e| ReadError::io(path, e))?;

    Ok(FileMetadata {
        size_bytes,
        line_count,
        size_human: human_size(size_bytes),
    })
}

fn count_lines(mut reader: impl Read) -> io::Result<u64> {
    let mut buf = vec![0u8; SCAN_BUF_SIZE];
    let mut newlines = 0u64;
    let mut last_byte = None;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        newlines += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
        last_byte = Some(buf[n - 1]);
    }
    match last_byte {
        Some(b'\n') | None => Ok(newlines),
        Some(_) => Ok(newlines + 1),
    }
}

/// Format a byte count for display: `512 B`, `2.0 KB`, `12.3 MB`, `1.50 GB`.
pub fn human_size(bytes: u64) -> String {
    let b = bytes as f64;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KB", b / KIB as f64)
    } else if bytes < GIB {
        format!("{:.1} MB", b / MIB as f64)
    } else {
        format!("{:.2} GB", b / GIB as f64)
    }
}
