//! Kernel report rendering

use std::fmt::Write;

use clap::ValueEnum;

use crate::aggregate::KernelStat;

/// Names longer than this are cut and suffixed with "..."
pub const MAX_NAME_CHARS: usize = 100;

const SEPARATOR_WIDTH: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn render(stats: &[KernelStat], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(stats)),
        OutputFormat::Json => render_json(stats),
    }
}

/// Ranked, human-readable listing
pub fn render_text(stats: &[KernelStat]) -> String {
    if stats.is_empty() {
        return "No valid kernel events found\n".to_string();
    }

    let separator = "-".repeat(SEPARATOR_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "Found {} kernels:", stats.len());
    let _ = writeln!(out, "{separator}");

    for (rank, stat) in stats.iter().enumerate() {
        let _ = writeln!(out, "{}. Kernel: {}", rank + 1, truncate_name(&stat.kernel));
        let _ = writeln!(out, "   Total duration: {} us", format_us(stat.total_duration_us));
        let _ = writeln!(out, "   Count: {}", stat.count);
        let _ = writeln!(out, "   Average duration: {} us", format_us(stat.avg_duration_us));
        let _ = writeln!(out, "{separator}");
    }

    out
}

pub fn render_json(stats: &[KernelStat]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(stats)
}

/// Cut `name` to `MAX_NAME_CHARS` characters
pub fn truncate_name(name: &str) -> String {
    match name.char_indices().nth(MAX_NAME_CHARS) {
        Some((cut, _)) => format!("{}...", &name[..cut]),
        None => name.to_string(),
    }
}

/// Whole numbers keep one decimal so totals read as durations (45.0, not 45)
fn format_us(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
