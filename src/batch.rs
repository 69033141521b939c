//! Directory batch results and progress events.
//!
//! [`Normalizer::normalize_directory`](crate::normalize::Normalizer::normalize_directory)
//! accumulates a [`BatchReport`] as it goes and, when given a channel, streams
//! [`BatchEvent`]s so a CLI can print progress from another thread while the
//! batch itself stays on the calling thread.

use crate::imaging::reduction_percent;
use serde::Serialize;
use std::path::PathBuf;

/// Progress notifications sent during a directory batch.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        root: PathBuf,
        total: usize,
    },
    /// `index` is 1-based.
    FileNormalized {
        index: usize,
        total: usize,
        file: FileReport,
    },
    FileFailed {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    Finished {
        succeeded: usize,
        failed: usize,
    },
}

/// One successfully normalized file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub original_size: u64,
    pub output_size: u64,
    pub reduction_percent: f64,
}

impl FileReport {
    pub fn new(
        input_path: PathBuf,
        output_path: PathBuf,
        original_size: u64,
        output_size: u64,
    ) -> Self {
        Self {
            input_path,
            output_path,
            original_size,
            output_size,
            reduction_percent: reduction_percent(original_size, output_size),
        }
    }
}

/// Aggregate result of a directory batch.
///
/// Size totals cover successful files only; a failed file contributes no
/// bytes to either side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub original_total_size: u64,
    pub optimized_total_size: u64,
    pub files: Vec<FileReport>,
    pub failures: Vec<PathBuf>,
    /// Outputs written by more than one source in this batch (e.g. `x.jpg`
    /// and `x.png` both landing on `x.webp`). The last writer wins.
    pub collisions: Vec<PathBuf>,
}

impl BatchReport {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            succeeded: 0,
            failed: 0,
            original_total_size: 0,
            optimized_total_size: 0,
            files: Vec::new(),
            failures: Vec::new(),
            collisions: Vec::new(),
        }
    }

    /// Record a written output. Returns `false` if an earlier file in this
    /// batch already wrote the same output path.
    pub fn record_success(&mut self, file: FileReport) -> bool {
        let first_write = !self.files.iter().any(|f| f.output_path == file.output_path);
        if !first_write && !self.collisions.contains(&file.output_path) {
            self.collisions.push(file.output_path.clone());
        }
        self.succeeded += 1;
        self.original_total_size += file.original_size;
        self.optimized_total_size += file.output_size;
        self.files.push(file);
        first_write
    }

    pub fn record_failure(&mut self, path: PathBuf) {
        self.failed += 1;
        self.failures.push(path);
    }

    pub fn total_reduction_percent(&self) -> f64 {
        reduction_percent(self.original_total_size, self.optimized_total_size)
    }

    /// Bytes saved across the batch. Zero if the outputs grew.
    pub fn bytes_saved(&self) -> u64 {
        self.original_total_size.saturating_sub(self.optimized_total_size)
    }
}
