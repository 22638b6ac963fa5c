//! Data ingestion node

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::{MarketDataProvider, MarketSnapshot};
use crate::error::Result;
use crate::graph::{AnalysisNode, NodeKind};
use crate::portfolio::find_holding;
use crate::state::{AnalysisState, StatePatch};

/// Gathers the market snapshot and the caller's position in the ticker
pub struct IngestNode {
    data: Arc<dyn MarketDataProvider>,
}

impl IngestNode {
    pub fn new(data: Arc<dyn MarketDataProvider>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl AnalysisNode for IngestNode {
    fn kind(&self) -> NodeKind {
        NodeKind::GatherData
    }

    async fn run(&self, state: &AnalysisState) -> Result<StatePatch> {
        let symbol = state.symbol();
        let snapshot = self.data.snapshot(symbol).await?;
        let position = find_holding(&state.portfolio, symbol).cloned();

        Ok(StatePatch::gathered(snapshot, position).with_message(format!("Data gathered for {symbol}")))
    }

    fn degraded(&self, state: &AnalysisState) -> StatePatch {
        StatePatch::gathered(
            MarketSnapshot::default(),
            find_holding(&state.portfolio, state.symbol()).cloned(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockMarketDataProvider;
    use crate::portfolio::Holding;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_ingest_records_snapshot_and_position() {
        let mut data = MockMarketDataProvider::new();
        data.expect_snapshot().with(eq("AAPL")).times(1).returning(|_| {
            let mut snapshot = MarketSnapshot::default();
            snapshot.technical_indicators.insert("rsi".to_string(), 61.0);
            Ok(snapshot)
        });

        let state = AnalysisState::new("AAPL", "q", "t")
            .with_portfolio(vec![Holding::new("aapl", 5.0, 200.0, 150.0), Holding::new("MSFT", 1.0, 1.0, 1.0)]);
        let node = IngestNode::new(Arc::new(data));
        let patch = node.run(&state).await.unwrap();

        let snapshot = patch.snapshot.unwrap();
        assert_eq!(snapshot.technical_indicators.get("rsi"), Some(&61.0));
        assert_eq!(patch.position_context.unwrap().symbol, "aapl");
        assert_eq!(patch.messages, vec!["Data gathered for AAPL"]);
    }

    #[tokio::test]
    async fn test_degraded_clears_gathered_data() {
        let node = IngestNode::new(Arc::new(MockMarketDataProvider::new()));
        let patch = node.degraded(&AnalysisState::new("TSLA", "q", "t"));
        assert!(patch.snapshot.unwrap().is_empty());
        assert!(patch.position_context.is_none());
    }
}
