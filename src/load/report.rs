use std::fmt;
use std::io::Write;
use std::time::Duration;

use serde::Serialize;

use crate::csv_utils::write_csv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Read,
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Read => write!(f, "read"),
            Phase::Write => write!(f, "write"),
        }
    }
}

/// Result of a single load task.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Outcome {
    pub latency: Duration,
    pub ok: bool,
    /// `Some(true)` for a credit, `Some(false)` for a debit, `None` for reads.
    pub credit: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub min: Duration,
    pub mean: Duration,
    pub p50: Duration,
    pub p99: Duration,
    pub max: Duration,
}

impl LatencySummary {
    fn from_sorted(sorted: &[Duration]) -> Self {
        let Some((&min, &max)) = sorted.first().zip(sorted.last()) else {
            return Self::default();
        };
        let total: Duration = sorted.iter().sum();
        Self {
            min,
            mean: total / sorted.len() as u32,
            p50: percentile(sorted, 50),
            p99: percentile(sorted, 99),
            max,
        }
    }
}

/// Nearest-rank percentile over a non-empty sorted slice.
fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    let rank = (pct * sorted.len()).div_ceil(100).max(1);
    sorted[rank - 1]
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseReport {
    pub phase: Phase,
    pub operations: u64,
    pub errors: u64,
    pub credits: u64,
    pub debits: u64,
    pub elapsed: Duration,
    pub latency: LatencySummary,
}

impl PhaseReport {
    pub(crate) fn from_outcomes(phase: Phase, elapsed: Duration, outcomes: &[Outcome]) -> Self {
        let mut latencies: Vec<Duration> = outcomes.iter().map(|o| o.latency).collect();
        latencies.sort_unstable();
        let count = |pred: fn(&Outcome) -> bool| outcomes.iter().filter(|o| pred(o)).count() as u64;
        Self {
            phase,
            operations: outcomes.len() as u64,
            errors: count(|o| !o.ok),
            credits: count(|o| o.credit == Some(true)),
            debits: count(|o| o.credit == Some(false)),
            elapsed,
            latency: LatencySummary::from_sorted(&latencies),
        }
    }

    /// Operations per second over the phase's wall time.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.operations as f64 / secs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub reads: PhaseReport,
    pub writes: PhaseReport,
}

#[derive(Serialize)]
struct ReportRow {
    phase: Phase,
    operations: u64,
    errors: u64,
    credits: u64,
    debits: u64,
    elapsed_ms: f64,
    ops_per_sec: f64,
    min_us: u128,
    mean_us: u128,
    p50_us: u128,
    p99_us: u128,
    max_us: u128,
}

impl From<&PhaseReport> for ReportRow {
    fn from(report: &PhaseReport) -> Self {
        Self {
            phase: report.phase,
            operations: report.operations,
            errors: report.errors,
            credits: report.credits,
            debits: report.debits,
            elapsed_ms: report.elapsed.as_secs_f64() * 1000.0,
            ops_per_sec: report.throughput(),
            min_us: report.latency.min.as_micros(),
            mean_us: report.latency.mean.as_micros(),
            p50_us: report.latency.p50.as_micros(),
            p99_us: report.latency.p99.as_micros(),
            max_us: report.latency.max.as_micros(),
        }
    }
}

impl LoadReport {
    pub fn phases(&self) -> [&PhaseReport; 2] {
        [&self.reads, &self.writes]
    }

    /// Writes one CSV row per phase.
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        write_csv(writer, self.phases().into_iter().map(ReportRow::from))
    }
}
