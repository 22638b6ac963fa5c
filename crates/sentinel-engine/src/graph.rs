//! Fixed analysis pipeline: ingest, three analysts in parallel, supervisor
//!
//! Nodes never touch the shared state directly. Each returns a
//! [`StatePatch`] that this module merges, one at a time, in completion
//! order. Analysts all read the same post-ingest snapshot, so no analyst
//! can observe another's report before synthesis.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;
use crate::state::{AnalysisState, StatePatch};

/// Graph node identity, also the timing key for the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    GatherData,
    TechnicalAnalysis,
    FundamentalAnalysis,
    SentimentAnalysis,
    Supervisor,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GatherData => "gather_data",
            Self::TechnicalAnalysis => "technical_analysis",
            Self::FundamentalAnalysis => "fundamental_analysis",
            Self::SentimentAnalysis => "sentiment_analysis",
            Self::Supervisor => "supervisor",
        }
    }

    /// The report an analyst node owns
    pub fn report(self) -> Option<ReportKind> {
        match self {
            Self::TechnicalAnalysis => Some(ReportKind::Technical),
            Self::FundamentalAnalysis => Some(ReportKind::Fundamental),
            Self::SentimentAnalysis => Some(ReportKind::Sentiment),
            Self::GatherData | Self::Supervisor => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three analyst reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Technical,
    Fundamental,
    Sentiment,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Fundamental => "fundamental",
            Self::Sentiment => "sentiment",
        }
    }

    /// This report's text in `state`
    pub fn text(self, state: &AnalysisState) -> &str {
        match self {
            Self::Technical => &state.technical_report,
            Self::Fundamental => &state.fundamental_report,
            Self::Sentiment => &state.sentiment_report,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform worker contract: a function of the shared state to a patch
#[async_trait]
pub trait AnalysisNode: Send + Sync {
    fn kind(&self) -> NodeKind;

    /// Compute this node's patch. Missing inputs should produce a degraded
    /// patch, not an error.
    async fn run(&self, state: &AnalysisState) -> Result<StatePatch>;

    /// Patch substituted when `run` fails or panics
    fn degraded(&self, state: &AnalysisState) -> StatePatch;
}

/// Receives the merged state after every node completes
pub trait GraphObserver: Send + Sync {
    fn node_completed(&self, kind: NodeKind, state: &AnalysisState);
}

impl GraphObserver for () {
    fn node_completed(&self, _kind: NodeKind, _state: &AnalysisState) {}
}

/// The five-node analysis DAG
#[derive(Clone)]
pub struct AnalysisGraph {
    ingest: Arc<dyn AnalysisNode>,
    analysts: [Arc<dyn AnalysisNode>; 3],
    supervisor: Arc<dyn AnalysisNode>,
}

impl AnalysisGraph {
    pub fn new(
        ingest: Arc<dyn AnalysisNode>,
        technical: Arc<dyn AnalysisNode>,
        fundamental: Arc<dyn AnalysisNode>,
        sentiment: Arc<dyn AnalysisNode>,
        supervisor: Arc<dyn AnalysisNode>,
    ) -> Self {
        Self {
            ingest,
            analysts: [technical, fundamental, sentiment],
            supervisor,
        }
    }

    /// Run to completion
    pub async fn run(&self, state: AnalysisState) -> AnalysisState {
        self.run_observed(state, &()).await
    }

    /// Run to completion, notifying `observer` after each merge
    #[instrument(skip_all, fields(ticker = %state.symbol(), trace_id = %state.trace_id))]
    pub async fn run_observed(&self, mut state: AnalysisState, observer: &dyn GraphObserver) -> AnalysisState {
        let patch = guarded(self.ingest.as_ref(), &state).await;
        merge(&mut state, self.ingest.kind(), patch, observer);

        let snapshot = state.clone();
        let mut pending: FuturesUnordered<_> = self
            .analysts
            .iter()
            .map(|node| {
                let snapshot = &snapshot;
                async move { (node.kind(), guarded(node.as_ref(), snapshot).await) }
            })
            .collect();
        while let Some((kind, patch)) = pending.next().await {
            merge(&mut state, kind, patch, observer);
        }
        drop(pending);

        let patch = guarded(self.supervisor.as_ref(), &state).await;
        merge(&mut state, self.supervisor.kind(), patch, observer);

        info!(
            recommendation = %state.recommendation,
            errors = state.errors.len(),
            "analysis graph completed"
        );
        state
    }
}

impl fmt::Debug for AnalysisGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisGraph")
            .field("ingest", &self.ingest.kind())
            .field("analysts", &self.analysts.iter().map(|n| n.kind()).collect::<Vec<_>>())
            .field("supervisor", &self.supervisor.kind())
            .finish()
    }
}

fn merge(state: &mut AnalysisState, kind: NodeKind, patch: StatePatch, observer: &dyn GraphObserver) {
    state.apply(patch);
    debug!(node = %kind, "patch merged");
    observer.node_completed(kind, state);
}

/// Run one node, substituting its degraded patch on error or panic
async fn guarded(node: &dyn AnalysisNode, state: &AnalysisState) -> StatePatch {
    let kind = node.kind();
    let started = Instant::now();

    let patch = match AssertUnwindSafe(node.run(state)).catch_unwind().await {
        Ok(Ok(patch)) => patch,
        Ok(Err(e)) => {
            warn!(node = %kind, error = %e, "node failed, using degraded output");
            node.degraded(state).with_error(format!("{kind}: {e}"))
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!(node = %kind, reason = %reason, "node panicked, using degraded output");
            node.degraded(state).with_error(format!("{kind} panicked: {reason}"))
        }
    };

    patch.with_timing(kind.as_str(), started.elapsed().as_secs_f64())
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
