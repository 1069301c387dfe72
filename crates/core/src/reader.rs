//! Line readers over plain log files.
//!
//! Lines are split on `\n`; a trailing `\r` is dropped and invalid UTF-8 is
//! replaced rather than rejected. A final fragment without a newline is a
//! line of its own. A missing file reads as empty; any other I/O failure is
//! returned so callers can tell "nothing there" from "could not read".

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

const TAIL_CHUNK_SIZE: u64 = 64 * 1024;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl ReadError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Decode one raw line, dropping its `\n` / `\r\n` terminator.
pub fn decode_line(mut raw: &[u8]) -> String {
    if let Some(rest) = raw.strip_suffix(b"\n") {
        raw = rest;
    }
    if let Some(rest) = raw.strip_suffix(b"\r") {
        raw = rest;
    }
    String::from_utf8_lossy(raw).into_owned()
}

fn open(path: &Path) -> Result<Option<File>, ReadError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ReadError::io(path, e)),
    }
}

/// Last `n` lines of `path`, oldest first.
///
/// Reads backwards from the end in fixed chunks and stops once `n` line
/// boundaries are in hand, so the cost depends on the size of the tail and
/// not on the size of the file.
pub fn tail_lines(path: &Path, n: usize) -> Result<Vec<String>, ReadError> {
    tail_lines_until(path, n, u64::MAX)
}

/// Last `n` lines among the first `limit` bytes of `path`.
///
/// A streaming session records where live tailing starts and reads history
/// only up to that offset, so bytes appended in between are neither lost nor
/// delivered twice.
pub fn tail_lines_until(path: &Path, n: usize, limit: u64) -> Result<Vec<String>, ReadError> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let Some(file) = open(path)? else {
        return Ok(Vec::new());
    };
    tail_from(file, n, limit).map_err(|e| ReadError::io(path, e))
}

fn tail_from<R: Read + Seek>(mut file: R, n: usize, limit: u64) -> io::Result<Vec<String>> {
    let size = file.seek(SeekFrom::End(0))?.min(limit);
    if size == 0 {
        return Ok(Vec::new());
    }

    // `buf` always holds the bytes in `offset..size`.
    let mut buf: Vec<u8> = Vec::new();
    let mut offset = size;
    let mut newlines = 0usize;
    loop {
        let read_size = TAIL_CHUNK_SIZE.min(offset);
        offset -= read_size;
        file.seek(SeekFrom::Start(offset))?;
        let mut chunk = vec![0u8; read_size as usize];
        file.read_exact(&mut chunk)?;

        newlines += chunk.iter().filter(|&&b| b == b'\n').count();
        chunk.append(&mut buf);
        buf = chunk;

        // The file's own final newline terminates the last line; it does not
        // separate two lines.
        let separators = if buf.last() == Some(&b'\n') {
            newlines - 1
        } else {
            newlines
        };
        if offset == 0 || separators >= n {
            break;
        }
    }

    let body = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
    let mut pieces: Vec<&[u8]> = body.split(|&b| b == b'\n').collect();
    if offset > 0 {
        // First piece starts mid-line.
        pieces.remove(0);
    }
    let skip = pieces.len().saturating_sub(n);
    Ok(pieces[skip..].iter().map(|raw| decode_line(raw)).collect())
}

/// Lines `[start_line, start_line + count)` of `path`, 1-indexed. A
/// `start_line` of 0 is read as 1.
///
/// Line boundaries are not indexed, so this is a forward scan that stops as
/// soon as the last requested line has been read.
pub fn range_lines(path: &Path, start_line: u64, count: u64) -> Result<Vec<String>, ReadError> {
    let start_line = start_line.max(1);
    if count == 0 {
        return Ok(Vec::new());
    }
    let Some(file) = open(path)? else {
        return Ok(Vec::new());
    };
    range_from(file, start_line, count).map_err(|e| ReadError::io(path, e))
}

fn range_from<R: Read>(file: R, start_line: u64, count: u64) -> io::Result<Vec<String>> {
    let end_line = start_line.saturating_add(count);
    let mut reader = BufReader::new(file);
    let mut lines = Vec::new();
    let mut line_no = 0u64;
    let mut raw = Vec::new();
    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        line_no += 1;
        if line_no >= start_line && line_no < end_line {
            lines.push(decode_line(&raw));
        }
        if line_no + 1 >= end_line {
            break;
        }
    }
    Ok(lines)
}
