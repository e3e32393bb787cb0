//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

/// All events emitted by the reconciler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A discrete log line for the user-facing sink
    Log { message: String, severity: Severity },
    /// Percentage progress within the current phase
    Progress { phase: PipelinePhase, percent: u8 },
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

impl Event {
    /// Build a log event
    pub fn log(severity: Severity, message: impl Into<String>) -> Self {
        Event::Log {
            message: message.into(),
            severity,
        }
    }

    /// Build a progress event from a processed/total pair
    pub fn progress(phase: PipelinePhase, processed: usize, total: usize) -> Self {
        Event::Progress {
            phase,
            percent: percent_of(processed, total),
        }
    }
}

/// Severity attached to log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Run has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Cancellation was observed at a chunk boundary
    Cancelled,
    /// Final completion signal
    Completed { success: bool, summary: String },
}

/// Phases of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Indexing,
    ExtractingMetadata,
    Matching,
    Relocating,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Indexing => write!(f, "Indexing"),
            PipelinePhase::ExtractingMetadata => write!(f, "Reading metadata"),
            PipelinePhase::Matching => write!(f, "Matching"),
            PipelinePhase::Relocating => write!(f, "Relocating"),
        }
    }
}

/// Integer percentage, clamped to 100. An empty workload counts as done.
pub fn percent_of(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((processed.min(total) * 100) / total) as u8
}
