//! Portfolio holdings and position arithmetic

use serde::{Deserialize, Serialize};

/// One portfolio position as reported by the brokerage collaborator.
///
/// Derived fields are optional; when absent they are computed from
/// quantity, price and cost basis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Holding {
    /// Ticker symbol
    pub symbol: String,

    /// Shares held
    #[serde(default)]
    pub quantity: f64,

    /// Last price
    #[serde(default)]
    pub price: f64,

    /// Average cost per share
    #[serde(default, alias = "averageBuyPrice")]
    pub average_buy_price: f64,

    /// Market value, if the collaborator supplied it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity: Option<f64>,

    /// Unrealized P&L in dollars, if supplied
    #[serde(
        default,
        alias = "unrealizedPnl",
        skip_serializing_if = "Option::is_none"
    )]
    pub unrealized_pnl: Option<f64>,

    /// Unrealized P&L in percent, if supplied
    #[serde(
        default,
        alias = "unrealizedPnlPct",
        skip_serializing_if = "Option::is_none"
    )]
    pub unrealized_pnl_pct: Option<f64>,

    /// Company name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Holding {
    /// Create a holding from the three required figures
    pub fn new(symbol: impl Into<String>, quantity: f64, price: f64, average_buy_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            price,
            average_buy_price,
            ..Self::default()
        }
    }

    /// `quantity * price` unless supplied
    pub fn equity(&self) -> f64 {
        self.equity.unwrap_or(self.quantity * self.price)
    }

    /// `average_buy_price * quantity`
    pub fn cost_basis(&self) -> f64 {
        self.average_buy_price * self.quantity
    }

    /// `(price - average_buy_price) * quantity` unless supplied
    pub fn unrealized_pnl(&self) -> f64 {
        self.unrealized_pnl
            .unwrap_or((self.price - self.average_buy_price) * self.quantity)
    }

    /// P&L relative to cost basis, in percent. Zero when there is no cost basis.
    pub fn unrealized_pnl_pct(&self) -> f64 {
        if let Some(pct) = self.unrealized_pnl_pct {
            return pct;
        }
        let basis = self.cost_basis();
        if basis.abs() < f64::EPSILON {
            0.0
        } else {
            self.unrealized_pnl() / basis * 100.0
        }
    }

    /// Display name, falling back to the symbol
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.symbol)
    }

    /// Case-insensitive symbol comparison
    pub fn matches(&self, symbol: &str) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
    }
}

/// Find the holding for `symbol`, if any
pub fn find_holding<'a>(holdings: &'a [Holding], symbol: &str) -> Option<&'a Holding> {
    holdings.iter().find(|h| h.matches(symbol))
}

/// Sum of position values
pub fn total_equity(holdings: &[Holding]) -> f64 {
    holdings.iter().map(Holding::equity).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pnl_arithmetic() {
        let holding = Holding::new("AAPL", 10.0, 150.0, 100.0);
        assert!((holding.equity() - 1500.0).abs() < 1e-9);
        assert!((holding.unrealized_pnl() - 500.0).abs() < 1e-9);
        assert!((holding.unrealized_pnl_pct() - 50.0).abs() < 1e-9);
        assert!((holding.cost_basis() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_cost_basis_has_zero_pct() {
        let holding = Holding::new("GIFT", 10.0, 150.0, 0.0);
        assert_eq!(holding.unrealized_pnl_pct(), 0.0);
        assert!((holding.unrealized_pnl() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_supplied_fields_take_precedence() {
        let holding = Holding {
            equity: Some(1234.0),
            unrealized_pnl: Some(-10.0),
            unrealized_pnl_pct: Some(-1.5),
            ..Holding::new("MSFT", 3.0, 400.0, 410.0)
        };
        assert_eq!(holding.equity(), 1234.0);
        assert_eq!(holding.unrealized_pnl(), -10.0);
        assert_eq!(holding.unrealized_pnl_pct(), -1.5);
    }

    #[test]
    fn test_deserialize_accepts_camel_case() {
        let holding: Holding = serde_json::from_str(
            r#"{"symbol":"NVDA","quantity":2,"price":900,"averageBuyPrice":450,"name":"NVIDIA"}"#,
        )
        .unwrap();
        assert_eq!(holding.average_buy_price, 450.0);
        assert_eq!(holding.display_name(), "NVIDIA");
        assert!((holding.unrealized_pnl_pct() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_find_holding_is_case_insensitive() {
        let holdings = vec![Holding::new("TSLA", 1.0, 200.0, 180.0)];
        assert!(find_holding(&holdings, "tsla").is_some());
        assert!(find_holding(&holdings, "TSL").is_none());
        assert!((total_equity(&holdings) - 200.0).abs() < 1e-9);
    }
}
