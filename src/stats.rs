//! Simulation results and reporting.
//!
//! The engine answers every snapshot with a results document: per-process TLB
//! hit counts and hit rates, page faults and an aggregate fault count. The
//! console does not interpret the numbers beyond checking the schema; it
//! summarizes them per process for the operator and hands the document to the
//! chart layer untouched.

use crate::common::TransportError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Process reference inside a results document.
///
/// Engines report process ids either as JSON numbers or as strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pid {
    Number(u64),
    Text(String),
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pid::Number(n) => f.pad(&n.to_string()),
            Pid::Text(s) => f.pad(s),
        }
    }
}

/// TLB series of a results document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TlbStats {
    /// `[pid, hits]` samples in time order.
    #[serde(default)]
    pub hits: Vec<(Pid, u64)>,

    /// `[pid, rate]` samples in time order, rate in `0..=1`.
    #[serde(default)]
    pub hit_rate: Vec<(Pid, f64)>,
}

/// Results returned by the engine for one snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultsDocument {
    #[serde(default)]
    pub tlb_stats: TlbStats,

    pub total_faults: u64,

    /// `[pid, faults]` samples in time order.
    #[serde(default)]
    pub page_faults: Vec<(Pid, u64)>,

    /// Engine-specific time series, passed through to the chart layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_series: Option<serde_json::Value>,
}

impl ResultsDocument {
    /// Parses and checks a results document received from the engine.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TransportError> {
        let doc: Self = serde_json::from_slice(bytes)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Checks the value ranges the schema implies.
    pub fn validate(&self) -> Result<(), TransportError> {
        if let Some((pid, rate)) = self
            .tlb_stats
            .hit_rate
            .iter()
            .find(|(_, rate)| !(0.0..=1.0).contains(rate))
        {
            return Err(TransportError::InvalidResponse(format!(
                "hit rate {} for process {} is outside 0..=1",
                rate, pid
            )));
        }
        Ok(())
    }
}

/// Per-process totals derived from a results document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessTotals {
    /// Sum of all hit samples.
    pub tlb_hits: u64,
    /// Sum of all fault samples.
    pub page_faults: u64,
    rate_sum: f64,
    rate_samples: u32,
}

impl ProcessTotals {
    /// Mean TLB hit rate over all samples, if any were reported.
    pub fn mean_hit_rate(&self) -> Option<f64> {
        (self.rate_samples > 0).then(|| self.rate_sum / f64::from(self.rate_samples))
    }
}

/// Summary of a results document, keyed by process.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultsSummary {
    pub total_faults: u64,
    pub processes: BTreeMap<Pid, ProcessTotals>,
}

impl From<&ResultsDocument> for ResultsSummary {
    fn from(doc: &ResultsDocument) -> Self {
        let mut processes: BTreeMap<Pid, ProcessTotals> = BTreeMap::new();
        for (pid, hits) in &doc.tlb_stats.hits {
            let totals = processes.entry(pid.clone()).or_default();
            totals.tlb_hits = totals.tlb_hits.saturating_add(*hits);
        }
        for (pid, rate) in &doc.tlb_stats.hit_rate {
            let totals = processes.entry(pid.clone()).or_default();
            totals.rate_sum += rate;
            totals.rate_samples = totals.rate_samples.saturating_add(1);
        }
        for (pid, faults) in &doc.page_faults {
            let totals = processes.entry(pid.clone()).or_default();
            totals.page_faults = totals.page_faults.saturating_add(*faults);
        }
        Self {
            total_faults: doc.total_faults,
            processes,
        }
    }
}

impl ResultsSummary {
    /// Prints a formatted summary of the results.
    pub fn print(&self) {
        println!("\n==========================================================");
        println!("VIRTUAL MEMORY SIMULATION RESULTS");
        println!("==========================================================");
        println!("total_faults             {}", self.total_faults);
        println!("processes                {}", self.processes.len());
        println!("----------------------------------------------------------");
        println!("PER PROCESS");
        if self.processes.is_empty() {
            println!("  (no per-process samples)");
        }
        for (pid, totals) in &self.processes {
            let rate = totals
                .mean_hit_rate()
                .map(|r| format!("{:.2}%", r * 100.0))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "  {:<8} tlb_hits: {:<10} | hit_rate: {:<8} | page_faults: {}",
                pid, totals.tlb_hits, rate, totals.page_faults
            );
        }
        println!("==========================================================");
    }
}
