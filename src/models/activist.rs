//! Activist investor scores

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Score for an activist investor's involvement in a fund
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivistScore {
    pub fund_ticker: String,
    /// Name of the activist investor as filed
    pub activist: String,
    pub score_date: NaiveDate,
    #[serde(default)]
    pub score: Option<Decimal>,
    /// Reported ownership as a fraction of shares outstanding
    #[serde(default)]
    pub ownership_pct: Option<Decimal>,
    #[serde(default)]
    pub last_filing_date: Option<NaiveDate>,
    /// Filing form of the latest disclosure (e.g. "13D", "13G")
    #[serde(default)]
    pub filing_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
