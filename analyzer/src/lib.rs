//! Trace Kernel Analyzer
//!
//! Aggregates Chrome trace-event documents (plain or gzip) into per-kernel
//! duration statistics ranked by total time.

pub mod aggregate;
pub mod error;
pub mod report;
pub mod trace;

use std::path::Path;

use tracing::{error, info};

pub use aggregate::{DEFAULT_CATEGORY, EventAggregator, KernelStat, aggregate_events};
pub use error::{InputError, InputResult};
pub use report::{OutputFormat, render, render_json, render_text};
pub use trace::{TRACE_EVENTS_FIELD, load_trace, trace_events};

/// Load and aggregate a trace file, propagating input errors
pub fn try_analyze_trace_file(path: &Path, category: &str) -> InputResult<Vec<KernelStat>> {
    let trace = load_trace(path)?;
    let events = trace_events(&trace)?;
    info!("🔍 Aggregating {} events of category '{}'", events.len(), category);
    Ok(aggregate_events(events, category))
}

/// Load and aggregate a trace file.
///
/// Never fails: missing, unreadable or malformed input is logged and yields
/// an empty result.
pub fn analyze_trace_file(path: &Path, category: &str) -> Vec<KernelStat> {
    match try_analyze_trace_file(path, category) {
        Ok(stats) => stats,
        Err(e) => {
            error!("❌ {}", e);
            Vec::new()
        }
    }
}
