use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

/// Duration samples per stage label.
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    samples: BTreeMap<String, Vec<Duration>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub label: String,
    pub count: usize,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl StageTimings {
    pub fn record(&mut self, label: &str, elapsed: Duration) {
        self.samples
            .entry(label.to_string())
            .or_default()
            .push(elapsed);
    }

    /// Run `f` and record how long it took under `label`.
    pub fn time<T>(&mut self, label: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let value = f();
        self.record(label, start.elapsed());
        value
    }

    pub fn count(&self, label: &str) -> usize {
        self.samples.get(label).map_or(0, Vec::len)
    }

    pub fn summary(&self) -> Vec<StageSummary> {
        self.samples
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(label, samples)| {
                let ms: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
                StageSummary {
                    label: label.clone(),
                    count: ms.len(),
                    avg_ms: ms.iter().sum::<f64>() / ms.len() as f64,
                    min_ms: ms.iter().copied().fold(f64::INFINITY, f64::min),
                    max_ms: ms.iter().copied().fold(0.0, f64::max),
                }
            })
            .collect()
    }

    pub fn log_summary(&self) {
        for stage in self.summary() {
            info!(
                stage = %stage.label,
                count = stage.count,
                avg_ms = format!("{:.1}", stage.avg_ms),
                min_ms = format!("{:.1}", stage.min_ms),
                max_ms = format!("{:.1}", stage.max_ms),
                "Stage timing"
            );
        }
    }
}

/// Counters for one run. Reset at the start of a run, written only by the
/// collection loop.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Slots the loop attempted to extract.
    pub inspected: usize,
    /// Records in the cache, including those from earlier runs.
    pub collected: usize,
    pub limit: usize,
    pub new_this_run: usize,
    pub timings: StageTimings,
}

impl RunStats {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    LimitReached,
    /// A post older than the stop date was reached; it was not stored.
    DateBoundary { id: String, date: NaiveDate },
    BatchesExhausted,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::LimitReached => write!(f, "limit reached"),
            RunOutcome::DateBoundary { id, date } => {
                write!(f, "stop date crossed at post {id} ({date})")
            }
            RunOutcome::BatchesExhausted => write!(f, "batches exhausted"),
        }
    }
}
