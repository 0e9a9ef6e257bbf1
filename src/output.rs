//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions do no I/O.
//!
//! ## Process
//!
//! ```text
//! Engine: raster
//!     Source: photo.jpg (4000x3000)
//!     Output: thumb.png (400x300, 18211 bytes)
//! Headers
//!     Engine: raster
//!     ProcessingTime: 84
//! Metrics
//!     engine.process_time.raster: 84ms
//! ```
//!
//! ## Engines
//!
//! ```text
//! Selection order
//! 001 gif
//! 002 large
//! 003 raster (fallback)
//! Registered: gif, large, raster
//! ```

use crate::context::TimingSample;
use serde::Serialize;
use std::path::PathBuf;

/// Everything one `process` run produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub engine: String,
    pub input: PathBuf,
    pub source_size: (u32, u32),
    pub output: PathBuf,
    pub output_size: (u32, u32),
    pub bytes_written: usize,
    pub headers: Vec<(String, String)>,
    pub metrics: Vec<TimingSample>,
}

/// A configured engine as listed by the `engines` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineListing {
    pub id: String,
    /// `false` for engines that match unconditionally.
    pub has_test: bool,
}

pub fn format_cycle_report(report: &CycleReport) -> Vec<String> {
    let mut lines = vec![
        format!("Engine: {}", report.engine),
        format!(
            "    Source: {} ({}x{})",
            report.input.display(),
            report.source_size.0,
            report.source_size.1
        ),
        format!(
            "    Output: {} ({}x{}, {} bytes)",
            report.output.display(),
            report.output_size.0,
            report.output_size.1,
            report.bytes_written
        ),
    ];
    if !report.headers.is_empty() {
        lines.push("Headers".to_string());
        for (name, value) in &report.headers {
            lines.push(format!("    {name}: {value}"));
        }
    }
    if !report.metrics.is_empty() {
        lines.push("Metrics".to_string());
        for sample in &report.metrics {
            lines.push(format!("    {}: {}ms", sample.name, sample.millis));
        }
    }
    lines
}

pub fn print_cycle_report(report: &CycleReport) {
    for line in format_cycle_report(report) {
        println!("{}", line);
    }
}

pub fn format_engine_list(configured: &[EngineListing], registered: &[String]) -> Vec<String> {
    let mut lines = vec!["Selection order".to_string()];
    for (i, engine) in configured.iter().enumerate() {
        let suffix = if engine.has_test { "" } else { " (fallback)" };
        lines.push(format!("{:03} {}{}", i + 1, engine.id, suffix));
    }
    // An unconditional engine shadows everything listed after it.
    if let Some(pos) = configured.iter().position(|e| !e.has_test) {
        let shadowed: Vec<&str> = configured[pos + 1..].iter().map(|e| e.id.as_str()).collect();
        if !shadowed.is_empty() {
            lines.push(format!(
                "    warning: never selected after {}: {}",
                configured[pos].id,
                shadowed.join(", ")
            ));
        }
    }
    lines.push(format!("Registered: {}", registered.join(", ")));
    lines
}

pub fn print_engine_list(configured: &[EngineListing], registered: &[String]) {
    for line in format_engine_list(configured, registered) {
        println!("{}", line);
    }
}
