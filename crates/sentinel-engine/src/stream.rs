//! Incremental event stream over the analysis graph
//!
//! The stream is a [`GraphObserver`]: the graph's coordinator calls it
//! right after each merge, so streamed runs execute exactly the same
//! nodes and patches as blocking runs.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::error::Result;
use crate::graph::{GraphObserver, NodeKind, ReportKind};
use crate::response::AnalyzeOutcome;
use crate::state::{AnalysisState, Intent};

/// Payload of the terminal `done` event
pub const DONE_SENTINEL: &str = "[DONE]";

/// Lifecycle milestones reported as `status` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusUpdate {
    ResolvingIntent,
    IntentResolved { intent: Intent, ticker: Option<String> },
    DataGathered { ticker: String },
}

/// Truncated view of one analyst report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialReport {
    #[serde(rename = "type")]
    pub agent: ReportKind,
    #[serde(rename = "content")]
    pub preview: String,
}

/// One server-push event
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Status(StatusUpdate),
    Partial(PartialReport),
    Result(Box<AnalyzeOutcome>),
    Done,
}

impl StreamEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Partial(_) => "partial",
            Self::Result(_) => "result",
            Self::Done => "done",
        }
    }

    /// JSON payload; `done` carries the literal sentinel
    pub fn data(&self) -> Result<String> {
        Ok(match self {
            Self::Status(status) => serde_json::to_string(status)?,
            Self::Partial(partial) => serde_json::to_string(partial)?,
            Self::Result(outcome) => serde_json::to_string(outcome)?,
            Self::Done => DONE_SENTINEL.to_string(),
        })
    }

    /// `event:`/`data:` wire framing
    pub fn to_sse(&self) -> Result<String> {
        Ok(format!("event: {}\ndata: {}\n\n", self.event_name(), self.data()?))
    }
}

/// First `max_chars` characters, with an ellipsis only when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Forwards node completions to a stream consumer
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<StreamEvent>,
    preview_chars: usize,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<StreamEvent>, preview_chars: usize) -> Self {
        Self { tx, preview_chars }
    }

    /// Send one event. A closed receiver is not an error; emission just stops.
    pub fn emit(&self, event: StreamEvent) {
        if self.tx.send(event).is_err() {
            debug!("stream consumer gone, dropping event");
        }
    }
}

impl GraphObserver for EventSink {
    fn node_completed(&self, kind: NodeKind, state: &AnalysisState) {
        if kind == NodeKind::GatherData {
            self.emit(StreamEvent::Status(StatusUpdate::DataGathered {
                ticker: state.symbol().to_string(),
            }));
        } else if let Some(report) = kind.report() {
            self.emit(StreamEvent::Partial(PartialReport {
                agent: report,
                preview: preview(report.text(state), self.preview_chars),
            }));
        }
    }
}
