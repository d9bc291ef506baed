//! Lazy line stream over a zstd-compressed JSONL archive.
//!
//! Memory use is one compressed input buffer inside the decoder, one
//! decompressed read chunk, and the current line, regardless of archive size.

use crate::config::ImportOptions;
use crate::util::open_with_backoff;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use thiserror::Error;
use zstd::stream::read::Decoder;

/// A failure that ends the stream of one archive (the run itself continues).
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot open {}: {source}", .path.display())]
    Open { path: PathBuf, #[source] source: io::Error },

    #[error("cannot initialise zstd decoder for {}: {source}", .path.display())]
    Decoder { path: PathBuf, #[source] source: io::Error },

    #[error("decode error in {}: {source}", .path.display())]
    Decode { path: PathBuf, #[source] source: io::Error },
}

/// A `Read` wrapper that counts compressed bytes read.
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

type ArchiveDecoder = Decoder<'static, BufReader<CountingReader<File>>>;

/// Trimmed, non-empty text lines of one archive, decoded incrementally.
///
/// Invalid UTF-8 sequences are dropped from the line rather than failing it.
/// After a decode error is yielded the iterator is exhausted.
pub struct ArchiveLines {
    path: PathBuf,
    reader: BufReader<ArchiveDecoder>,
    counter: Arc<AtomicU64>,
    buf: Vec<u8>,
    done: bool,
}

impl ArchiveLines {
    pub fn open(path: &Path, opts: &ImportOptions) -> Result<Self, ArchiveError> {
        let file = open_with_backoff(path, 16, 50)
            .map_err(|source| ArchiveError::Open { path: path.to_path_buf(), source })?;
        let counter = Arc::new(AtomicU64::new(0));
        let counting = CountingReader { inner: file, counter: counter.clone() };

        let decoder_err = |source| ArchiveError::Decoder { path: path.to_path_buf(), source };
        let mut decoder = Decoder::new(counting).map_err(decoder_err)?;
        decoder.window_log_max(opts.window_log_max).map_err(decoder_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::with_capacity(opts.read_buffer_bytes.max(1024), decoder),
            counter,
            buf: Vec::with_capacity(16 * 1024),
            done: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compressed bytes consumed from disk so far.
    pub fn compressed_bytes_read(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

/// Decode `bytes` as UTF-8, silently skipping invalid sequences.
fn decode_skipping_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

impl Iterator for ArchiveLines {
    type Item = Result<String, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    let line = decode_skipping_invalid(&self.buf);
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let out = if trimmed.len() == line.len() { line } else { trimmed.to_string() };
                    return Some(Ok(out));
                }
                Err(source) => {
                    self.done = true;
                    return Some(Err(ArchiveError::Decode { path: self.path.clone(), source }));
                }
            }
        }
        None
    }
}

impl FusedIterator for ArchiveLines {}

/// Report a file that could not be (fully) read. The caller moves on to the next file.
pub fn report_file_failure(path: &Path, e: &dyn std::fmt::Display) {
    let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let msg = format!(
        "Fatal error reading file, skipping the rest of it\n  path : {}\n  error: {}\n\
         note : rows committed before the failure are kept; re-running the import is safe.",
        abs.display(),
        e
    );
    eprintln!("{}", msg);
    tracing::warn!("{}", msg);
}
