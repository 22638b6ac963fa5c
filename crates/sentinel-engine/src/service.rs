//! Request routing: resolve once, then dispatch to the right path
//!
//! Both entry points share one dispatcher. The streaming variant passes an
//! [`EventSink`] that the graph notifies after every merge, so blocking and
//! streamed requests produce the same outcome.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::{FutureExt, Stream};
use sentinel_llm::LLMProvider;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{Instrument, error, info, info_span};

use crate::agents::{
    ChatAssistant, FundamentalAnalyst, IngestNode, PortfolioAnalyst, SentimentAnalyst, Supervisor,
    TechnicalAnalyst,
};
use crate::config::SentinelConfig;
use crate::data::MarketDataProvider;
use crate::error::Result;
use crate::graph::{AnalysisGraph, GraphObserver, panic_message};
use crate::llm::ModelClient;
use crate::portfolio::{Holding, find_holding};
use crate::prompts::PromptLibrary;
use crate::request::AnalyzeRequest;
use crate::resolver::{EntityResolver, Resolution};
use crate::response::{AnalyzeOutcome, AnalyzeResponse, HoldingsResponse};
use crate::state::{AnalysisState, Intent};
use crate::stream::{EventSink, StatusUpdate, StreamEvent};

/// Fresh request identifier
pub fn new_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Where a resolved request goes
#[derive(Debug, Clone, PartialEq)]
enum Route {
    Holdings(Holding),
    Portfolio,
    Chat,
    Analysis(String),
}

impl Route {
    /// Symbol this route acts on, when it picks one itself
    fn ticker(&self) -> Option<&str> {
        match self {
            Self::Holdings(holding) => Some(&holding.symbol),
            Self::Analysis(ticker) => Some(ticker),
            Self::Portfolio | Self::Chat => None,
        }
    }
}

/// Entry point for analysis requests
pub struct Orchestrator {
    resolver: EntityResolver,
    graph: AnalysisGraph,
    portfolio: PortfolioAnalyst,
    chat: ChatAssistant,
    config: SentinelConfig,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        data: Arc<dyn MarketDataProvider>,
        config: SentinelConfig,
    ) -> Result<Self> {
        config.validate()?;
        let llm = ModelClient::new(provider, &config);
        let prompts = Arc::new(PromptLibrary::new()?);

        let resolver = EntityResolver::new(
            config.enable_entity_resolution.then(|| llm.clone()),
            Arc::clone(&prompts),
        )?;
        let graph = AnalysisGraph::new(
            Arc::new(IngestNode::new(data)),
            Arc::new(TechnicalAnalyst::new(llm.clone(), Arc::clone(&prompts))),
            Arc::new(FundamentalAnalyst::new(llm.clone(), Arc::clone(&prompts))),
            Arc::new(SentimentAnalyst::new(llm.clone(), Arc::clone(&prompts))),
            Arc::new(Supervisor::new(
                llm.clone(),
                Arc::clone(&prompts),
                config.enable_structured_outputs,
            )?),
        );

        Ok(Self {
            resolver,
            graph,
            portfolio: PortfolioAnalyst::new(llm.clone(), prompts),
            chat: ChatAssistant::new(llm),
            config,
        })
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    /// Answer a request. Never fails: any error or panic becomes a
    /// well-formed response carrying the error text.
    pub async fn analyze(&self, request: &AnalyzeRequest, trace_id: &str) -> AnalyzeOutcome {
        self.respond(request, trace_id, None).await
    }

    /// Answer a request as a lifecycle event stream ending in `result`
    /// and `done`. Dropping the stream stops emission; in-flight model
    /// calls run to completion.
    pub fn analyze_stream(
        self: &Arc<Self>,
        request: AnalyzeRequest,
        trace_id: String,
    ) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let (tx, rx) = mpsc::unbounded_channel();
        let this = Arc::clone(self);

        tokio::spawn(async move {
            let sink = EventSink::new(tx, this.config.preview_chars);
            let outcome = this.respond(&request, &trace_id, Some(&sink)).await;
            sink.emit(StreamEvent::Result(Box::new(outcome)));
            sink.emit(StreamEvent::Done);
        });

        UnboundedReceiverStream::new(rx)
    }

    async fn respond(&self, request: &AnalyzeRequest, trace_id: &str, events: Option<&EventSink>) -> AnalyzeOutcome {
        let started = Instant::now();
        let span = info_span!("request", trace_id = %trace_id);

        let result = AssertUnwindSafe(self.dispatch(request, trace_id, events))
            .catch_unwind()
            .instrument(span)
            .await;

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(trace_id = %trace_id, error = %e, "request failed");
                AnalyzeResponse::internal_error(e, trace_id).into()
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(trace_id = %trace_id, reason = %reason, "request panicked");
                AnalyzeResponse::internal_error(reason, trace_id).into()
            }
        };

        finish(outcome, trace_id, started.elapsed().as_secs_f64())
    }

    async fn dispatch(
        &self,
        request: &AnalyzeRequest,
        trace_id: &str,
        events: Option<&EventSink>,
    ) -> Result<AnalyzeOutcome> {
        let emit = |update: StatusUpdate| {
            if let Some(sink) = events {
                sink.emit(StreamEvent::Status(update));
            }
        };

        emit(StatusUpdate::ResolvingIntent);
        let resolution = self
            .resolver
            .resolve(&request.query, &request.portfolio_context)
            .await;
        let route = route(request, &resolution);
        emit(StatusUpdate::IntentResolved {
            intent: resolution.intent,
            ticker: route.ticker().or(resolution.ticker.as_deref()).map(str::to_string),
        });
        info!(intent = %resolution.intent, route = ?route, "request routed");

        match route {
            Route::Holdings(holding) => Ok(HoldingsResponse::from_holding(&holding, Utc::now()).into()),
            Route::Portfolio => Ok(self.portfolio.answer(request).await?.into()),
            Route::Chat => Ok(self.chat.answer(request).await?.into()),
            Route::Analysis(ticker) => {
                let state = AnalysisState::new(
                    ticker,
                    request.query_with_context(self.config.history_window),
                    trace_id,
                )
                .with_resolution(resolution)
                .with_portfolio(request.portfolio_context.clone());

                let observer: &dyn GraphObserver = match events {
                    Some(sink) => sink,
                    None => &(),
                };
                let state = self.graph.run_observed(state, observer).await;
                Ok(AnalyzeResponse::from(state).into())
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("graph", &self.graph)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn route(request: &AnalyzeRequest, resolution: &Resolution) -> Route {
    let explicit = request
        .ticker
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_uppercase);

    match resolution.intent {
        Intent::HoldingsLookup => resolution
            .ticker
            .as_deref()
            .and_then(|ticker| find_holding(&request.portfolio_context, ticker))
            .map_or(Route::Portfolio, |holding| Route::Holdings(holding.clone())),
        Intent::PortfolioQa => Route::Portfolio,
        Intent::GenericChat => Route::Chat,
        Intent::TickerAnalysis => explicit
            .or_else(|| resolution.ticker.clone())
            .map_or(Route::Chat, Route::Analysis),
    }
}

/// Stamp the trace id and total duration on free-text responses
fn finish(outcome: AnalyzeOutcome, trace_id: &str, total: f64) -> AnalyzeOutcome {
    match outcome {
        AnalyzeOutcome::Analysis(mut response) => {
            response.trace_id = Some(trace_id.to_string());
            response
                .timings
                .get_or_insert_with(Default::default)
                .entry("total".to_string())
                .or_insert(total);
            AnalyzeOutcome::Analysis(response)
        }
        holdings @ AnalyzeOutcome::Holdings(_) => holdings,
    }
}
