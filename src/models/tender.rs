//! Tender-offer history

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One tender offer made by a fund
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenderOffer {
    pub fund_ticker: String,
    pub announce_date: NaiveDate,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    /// Fraction of outstanding shares offered for
    #[serde(default)]
    pub offer_pct: Option<Decimal>,
    /// Offer price as a fraction of NAV
    #[serde(default)]
    pub price_pct_of_nav: Option<Decimal>,
    #[serde(default)]
    pub shares_tendered: Option<Decimal>,
    #[serde(default)]
    pub proration_pct: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
}
