//! Portfolio holding return history

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Return of one holding inside a fund's portfolio on a given date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReturn {
    /// Ticker of the fund holding the position
    pub fund_ticker: String,
    /// Identifier of the held security (ticker, CUSIP or internal id)
    pub holding_id: String,
    #[serde(default)]
    pub holding_name: Option<String>,
    pub as_of_date: NaiveDate,
    /// Portfolio weight as a fraction of net assets
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub return_1d: Option<Decimal>,
    #[serde(default)]
    pub return_mtd: Option<Decimal>,
    #[serde(default)]
    pub return_ytd: Option<Decimal>,
    /// `weight * return_1d`
    #[serde(default)]
    pub contribution_1d: Option<Decimal>,
}

impl PortfolioReturn {
    pub fn new(
        fund_ticker: impl Into<String>,
        holding_id: impl Into<String>,
        as_of_date: NaiveDate,
    ) -> Self {
        Self {
            fund_ticker: fund_ticker.into(),
            holding_id: holding_id.into(),
            holding_name: None,
            as_of_date,
            weight: None,
            return_1d: None,
            return_mtd: None,
            return_ytd: None,
            contribution_1d: None,
        }
    }
}
