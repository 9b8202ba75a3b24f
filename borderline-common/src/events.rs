//! Event types for the borderline event system
//!
//! Provides the analysis lifecycle events and the EventBus used to fan them
//! out to SSE clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Analysis record status
///
/// `Pending → Processing → {Completed | Failed}`. A record may also reach a
/// terminal status straight from `Pending` when the processing write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Record created, pipeline not yet started
    Pending,
    /// Pipeline accepted the submission and is calling the endpoint
    Processing,
    /// Result persisted (possibly the manual-review placeholder)
    Completed,
    /// Endpoint invocation failed; diagnostic stored in the narrative
    Failed,
}

impl AnalysisStatus {
    /// Database/text representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    /// Parse the database/text representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AnalysisStatus::Pending),
            "processing" => Some(AnalysisStatus::Processing),
            "completed" => Some(AnalysisStatus::Completed),
            "failed" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }

    /// Statuses from which `target` may be entered
    ///
    /// Persistence guards every status write with this set.
    pub fn predecessors(target: AnalysisStatus) -> &'static [AnalysisStatus] {
        match target {
            AnalysisStatus::Pending => &[],
            AnalysisStatus::Processing => &[AnalysisStatus::Pending],
            AnalysisStatus::Completed | AnalysisStatus::Failed => {
                &[AnalysisStatus::Pending, AnalysisStatus::Processing]
            }
        }
    }

    /// Whether `self → next` is a legal transition
    pub fn can_transition_to(&self, next: AnalysisStatus) -> bool {
        Self::predecessors(next).contains(self)
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borderline event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BorderlineEvent {
    /// A new analysis record was created
    AnalysisSubmitted {
        analysis_id: Uuid,
        user_id: String,
        product_name: String,
        timestamp: DateTime<Utc>,
    },

    /// Analysis record moved between statuses
    AnalysisStatusChanged {
        analysis_id: Uuid,
        old_status: AnalysisStatus,
        new_status: AnalysisStatus,
        timestamp: DateTime<Utc>,
    },

    /// Result persisted
    AnalysisCompleted {
        analysis_id: Uuid,
        hs_code: String,
        confidence: f64,
        /// True when the reply could not be parsed and the placeholder was stored
        manual_review: bool,
        timestamp: DateTime<Utc>,
    },

    /// Endpoint invocation failed
    AnalysisFailed {
        analysis_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// An administrator switched the active configuration
    ConfigurationActivated {
        configuration_id: Uuid,
        name: String,
        timestamp: DateTime<Utc>,
    },
}

impl BorderlineEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            BorderlineEvent::AnalysisSubmitted { .. } => "AnalysisSubmitted",
            BorderlineEvent::AnalysisStatusChanged { .. } => "AnalysisStatusChanged",
            BorderlineEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            BorderlineEvent::AnalysisFailed { .. } => "AnalysisFailed",
            BorderlineEvent::ConfigurationActivated { .. } => "ConfigurationActivated",
        }
    }
}

/// Broadcast bus for BorderlineEvent
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BorderlineEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<BorderlineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BorderlineEvent) {
        let _ = self.tx.send(event);
    }
}
