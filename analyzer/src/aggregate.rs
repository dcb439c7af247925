//! Per-kernel event aggregation
//!
//! Sums `dur` per event `name` for every event of the target category.
//! Totals are kept at full precision while accumulating; rounding to three
//! decimals happens once, when the final `KernelStat` rows are built.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

pub const CATEGORY_FIELD: &str = "cat";
pub const NAME_FIELD: &str = "name";
pub const DURATION_FIELD: &str = "dur";

/// Category analysed when none is given
pub const DEFAULT_CATEGORY: &str = "kernel";

/// Summary of one kernel. Values are rounded to three decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KernelStat {
    pub kernel: String,
    pub total_duration_us: f64,
    pub count: u64,
    pub avg_duration_us: f64,
}

#[derive(Debug, Default)]
struct Accumulator {
    total: f64,
    count: u64,
}

/// Streaming aggregator over trace events
#[derive(Debug)]
pub struct EventAggregator {
    category: String,
    index: HashMap<String, usize>,
    kernels: Vec<(String, Accumulator)>,
    skipped: usize,
}

impl EventAggregator {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            index: HashMap::new(),
            kernels: Vec::new(),
            skipped: 0,
        }
    }

    /// Account for one event. Returns whether it contributed.
    ///
    /// Events of another category are ignored. Non-object events, and events
    /// of the target category lacking a string name or numeric duration, are
    /// skipped and counted in `skipped()`.
    pub fn add(&mut self, event: &Value) -> bool {
        let Some(fields) = event.as_object() else {
            self.skipped += 1;
            return false;
        };

        if fields.get(CATEGORY_FIELD).and_then(Value::as_str) != Some(self.category.as_str()) {
            return false;
        }

        let name = fields.get(NAME_FIELD).and_then(Value::as_str);
        let duration = fields.get(DURATION_FIELD).and_then(Value::as_f64);
        let (Some(name), Some(duration)) = (name, duration) else {
            self.skipped += 1;
            return false;
        };

        let slot = match self.index.get(name) {
            Some(&slot) => slot,
            None => {
                self.index.insert(name.to_string(), self.kernels.len());
                self.kernels.push((name.to_string(), Accumulator::default()));
                self.kernels.len() - 1
            }
        };

        let acc = &mut self.kernels[slot].1;
        acc.total += duration;
        acc.count += 1;
        true
    }

    /// Malformed events seen so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Rank kernels by total duration, descending. Ties keep first-seen order.
    pub fn finish(self) -> Vec<KernelStat> {
        let mut ranked: Vec<(String, Accumulator)> = self.kernels.into_iter().filter(|(_, acc)| acc.count > 0).collect();
        ranked.sort_by(|(_, a), (_, b)| b.total.total_cmp(&a.total));

        ranked
            .into_iter()
            .map(|(kernel, acc)| KernelStat {
                kernel,
                total_duration_us: round3(acc.total),
                count: acc.count,
                avg_duration_us: round3(acc.total / acc.count as f64),
            })
            .collect()
    }
}

/// Aggregate a slice of events for `category`
pub fn aggregate_events(events: &[Value], category: &str) -> Vec<KernelStat> {
    let mut aggregator = EventAggregator::new(category);
    for event in events {
        aggregator.add(event);
    }

    if aggregator.skipped() > 0 {
        tracing::debug!("Skipped {} malformed events", aggregator.skipped());
    }
    aggregator.finish()
}

/// Round to three decimals on the exact binary value, ties to even
pub fn round3(value: f64) -> f64 {
    format!("{value:.3}").parse().unwrap_or(value)
}
