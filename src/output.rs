//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## File
//!
//! ```text
//! photos/hero.jpg → photos/hero.webp
//!     Size: 2.4 MB → 310.2 KB (87.4% smaller)
//! ```
//!
//! ## Dir
//!
//! ```text
//! Normalizing 3 images in photos/
//! 001/003 photos/a.jpg → photos/a.webp (81.0%)
//! 002/003 photos/broken.jpg: FAILED
//! 003/003 photos/team/b.png → photos/team/b.webp (64.2%)
//!
//! Processed 3 images: 2 succeeded, 1 failed
//!     Original:  4.1 MB
//!     Optimized: 912.0 KB
//!     Reduction: 78.3% (3.2 MB saved)
//!     Failed:
//!         photos/broken.jpg
//! ```
//!
//! Outputs written by more than one source (`x.jpg` and `x.png` both map to
//! `x.webp`) are listed under `Written by several sources:`.
//!
//! ## Upload
//!
//! ```text
//! Image optimized successfully! Reduction: 90.0% as WebP.
//!     Raw:    uploads/lawyer_20250115_093005_123456.jpg
//!     Output: uploads/lawyer_20250115_093005_123456.webp
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! do no I/O.

use crate::batch::{BatchEvent, BatchReport};
use crate::imaging::reduction_percent;
use crate::normalize::{NormalizeOutcome, UploadOutcome};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable byte count with one decimal (bytes are shown whole).
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Format a 1-based position against its total, zero-padded to 3 digits.
fn format_position(index: usize, total: usize) -> String {
    format!("{:0>3}/{:0>3}", index, total)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

// ============================================================================
// file
// ============================================================================

/// Format the result of normalizing a single file.
pub fn format_normalize_outcome(source: &Path, outcome: &NormalizeOutcome) -> Vec<String> {
    match (&outcome.output_path, outcome.ok) {
        (Some(output), true) => vec![
            format!("{} \u{2192} {}", display(source), display(output)),
            format!(
                "{}Size: {} \u{2192} {} ({:.1}% smaller)",
                indent(1),
                format_size(outcome.original_size),
                format_size(outcome.output_size),
                reduction_percent(outcome.original_size, outcome.output_size)
            ),
        ],
        _ => vec![format!("{}: normalization failed", display(source))],
    }
}

pub fn print_normalize_outcome(source: &Path, outcome: &NormalizeOutcome) {
    for line in format_normalize_outcome(source, outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// upload
// ============================================================================

/// Format an upload result: the status message, then the paths involved.
pub fn format_upload_outcome(outcome: &UploadOutcome) -> Vec<String> {
    let mut lines = vec![outcome.message.clone()];
    if let Some(raw) = &outcome.raw_path {
        lines.push(format!("{}Raw:    {}", indent(1), display(raw)));
    }
    if let Some(output) = &outcome.output_path {
        lines.push(format!("{}Output: {}", indent(1), display(output)));
    }
    lines
}

pub fn print_upload_outcome(outcome: &UploadOutcome) {
    for line in format_upload_outcome(outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// dir
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { root, total } => {
            vec![format!("Normalizing {} images in {}", total, display(root))]
        }
        BatchEvent::FileNormalized { index, total, file } => vec![format!(
            "{} {} \u{2192} {} ({:.1}%)",
            format_position(*index, *total),
            display(&file.input_path),
            display(&file.output_path),
            file.reduction_percent
        )],
        BatchEvent::FileFailed { index, total, path } => vec![format!(
            "{} {}: FAILED",
            format_position(*index, *total),
            display(path)
        )],
        // The summary comes from the report itself.
        BatchEvent::Finished { .. } => Vec::new(),
    }
}

/// Format the end-of-batch summary.
pub fn format_batch_report(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "Processed {} images: {} succeeded, {} failed",
            report.total_files, report.succeeded, report.failed
        ),
    ];
    if report.succeeded > 0 {
        lines.push(format!(
            "{}Original:  {}",
            indent(1),
            format_size(report.original_total_size)
        ));
        lines.push(format!(
            "{}Optimized: {}",
            indent(1),
            format_size(report.optimized_total_size)
        ));
        lines.push(format!(
            "{}Reduction: {:.1}% ({} saved)",
            indent(1),
            report.total_reduction_percent(),
            format_size(report.bytes_saved())
        ));
    }
    if !report.failures.is_empty() {
        lines.push(format!("{}Failed:", indent(1)));
        for path in &report.failures {
            lines.push(format!("{}{}", indent(2), display(path)));
        }
    }
    if !report.collisions.is_empty() {
        lines.push(format!("{}Written by several sources:", indent(1)));
        for path in &report.collisions {
            lines.push(format!("{}{}", indent(2), display(path)));
        }
    }
    lines
}

pub fn print_batch_report(report: &BatchReport) {
    for line in format_batch_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
