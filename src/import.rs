//! Batched, idempotent import of RS/RC archives into the store.
//!
//! Lines are parsed one at a time into typed rows and buffered up to
//! `batch_size`; each full buffer is written as one insert-or-replace
//! transaction. Bad lines are counted and sampled, never fatal. A file that
//! cannot be opened or decoded is reported and skipped. A store write failure
//! is fatal for the run.

use crate::config::ImportOptions;
use crate::paths::discover_archives;
use crate::progress::make_bytes_progress;
use crate::records::{ArchiveRecord, Comment, Submission};
use crate::store::Store;
use crate::util::{file_size_mb, truncate_chars};
use crate::zstd_jsonl::{report_file_failure, ArchiveLines};
use anyhow::{bail, Result};
use std::fmt::Display;
use std::fs;
use std::path::Path;

/// Cap on the up-front batch allocation; large batch sizes grow on demand.
const INITIAL_BATCH_CAPACITY: usize = 8 * 1024;

/// Counters for one file (or, summed, for one pass).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Rows parsed and committed.
    pub written: u64,
    /// Lines dropped because they failed to parse.
    pub errors: u64,
    /// Bad lines logged in detail, at most `error_sample_limit`.
    pub sampled: u64,
    /// Upsert transactions issued.
    pub batches: u64,
    /// Set when the archive could not be opened or stopped decoding part way.
    pub stream_error: Option<String>,
}

impl ImportStats {
    fn absorb(&mut self, other: &ImportStats) {
        self.written += other.written;
        self.errors += other.errors;
        self.sampled += other.sampled;
        self.batches += other.batches;
    }
}

/// Totals for a whole run over the input directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub files_imported: usize,
    pub files_failed: usize,
    pub submissions: ImportStats,
    pub comments: ImportStats,
}

fn flush<T: ArchiveRecord>(store: &mut Store, batch: &mut Vec<T>, stats: &mut ImportStats) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    store.upsert_batch(batch.as_slice())?;
    stats.written += batch.len() as u64;
    stats.batches += 1;
    batch.clear();
    Ok(())
}

/// Drive any line source through the transformer into the store.
///
/// A stream error ends the source: rows parsed before it are still flushed and
/// the error is returned in `stream_error`. Only store failures return `Err`.
pub fn ingest_lines<T, I, E>(store: &mut Store, lines: I, opts: &ImportOptions) -> Result<ImportStats>
where
    T: ArchiveRecord,
    I: IntoIterator<Item = Result<String, E>>,
    E: Display,
{
    let batch_size = opts.batch_size.max(1);
    let mut stats = ImportStats::default();
    let mut batch: Vec<T> = Vec::with_capacity(batch_size.min(INITIAL_BATCH_CAPACITY));
    let mut ordinal: u64 = 0;

    for item in lines {
        let line = match item {
            Ok(line) => line,
            Err(e) => {
                stats.stream_error = Some(e.to_string());
                break;
            }
        };
        ordinal += 1;

        match T::from_json(&line) {
            Ok(row) => batch.push(row),
            Err(e) => {
                stats.errors += 1;
                if stats.sampled < opts.error_sample_limit {
                    stats.sampled += 1;
                    tracing::warn!("  Bad record (line {}): {}", ordinal, truncate_chars(&e.to_string(), 100));
                }
                continue;
            }
        }

        if batch.len() >= batch_size {
            flush(store, &mut batch, &mut stats)?;
            tracing::info!("  Imported {} {}...", stats.written, T::KIND);
        }
    }

    flush(store, &mut batch, &mut stats)?;
    if stats.errors > stats.sampled {
        tracing::warn!("  {} more bad records not shown", stats.errors - stats.sampled);
    }
    Ok(stats)
}

/// Import one archive. Open and decode failures are reported and returned in
/// `stream_error`; rows committed before a decode failure stay.
pub fn import_archive<T: ArchiveRecord>(store: &mut Store, path: &Path, opts: &ImportOptions) -> Result<ImportStats> {
    tracing::info!("Importing {} from {}...", T::KIND, path.display());

    let mut lines = match ArchiveLines::open(path, opts) {
        Ok(lines) => lines,
        Err(e) => {
            report_file_failure(path, &e);
            return Ok(ImportStats { stream_error: Some(e.to_string()), ..Default::default() });
        }
    };

    let total = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let pb = make_bytes_progress(opts.progress, total, T::KIND);
    let tracked = std::iter::from_fn(|| {
        let item = lines.next();
        pb.set_position(lines.compressed_bytes_read());
        item
    });

    let stats = ingest_lines::<T, _, _>(store, tracked, opts)?;
    pb.finish_and_clear();

    if let Some(e) = &stats.stream_error {
        report_file_failure(path, e);
    }
    tracing::info!("Imported {} {} ({} errors)", stats.written, T::KIND, stats.errors);
    Ok(stats)
}

fn import_pass<T: ArchiveRecord>(
    store: &mut Store,
    files: &[std::path::PathBuf],
    opts: &ImportOptions,
    summary: &mut ImportSummary,
) -> Result<ImportStats> {
    tracing::info!("Found {} {} file(s)", files.len(), T::KIND);
    let mut totals = ImportStats::default();
    for path in files {
        tracing::info!("File size: {:.2} MB", file_size_mb(path));
        let stats = import_archive::<T>(store, path, opts)?;
        if stats.stream_error.is_some() {
            summary.files_failed += 1;
        } else {
            summary.files_imported += 1;
        }
        totals.absorb(&stats);
    }
    Ok(totals)
}

/// Import every submission archive, then every comment archive, under `opts.input_dir`.
pub fn import_all(store: &mut Store, opts: &ImportOptions) -> Result<ImportSummary> {
    if !opts.input_dir.is_dir() {
        bail!("input directory {} not found", opts.input_dir.display());
    }
    let found = discover_archives(&opts.input_dir);

    let mut summary = ImportSummary::default();
    let submissions = import_pass::<Submission>(store, &found.submissions, opts, &mut summary)?;
    let comments = import_pass::<Comment>(store, &found.comments, opts, &mut summary)?;
    summary.submissions = submissions;
    summary.comments = comments;
    Ok(summary)
}
