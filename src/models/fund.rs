//! Fund-level snapshot records: NAV forecasts and premium/discount statistics

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily NAV forecast for a US-listed closed-end fund
///
/// Values are produced by the forecasting models upstream; this crate only
/// stages and publishes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundForecast {
    /// Exchange ticker of the fund
    pub ticker: String,
    /// Date the forecast applies to
    pub effective_date: NaiveDate,
    /// Point estimate of the fund's NAV
    #[serde(default)]
    pub nav_forecast: Option<Decimal>,
    /// Lower bound of the forecast interval
    #[serde(default)]
    pub nav_forecast_low: Option<Decimal>,
    /// Upper bound of the forecast interval
    #[serde(default)]
    pub nav_forecast_high: Option<Decimal>,
    /// Last NAV published by the fund sponsor
    #[serde(default)]
    pub last_nav: Option<Decimal>,
    /// Date of `last_nav`
    #[serde(default)]
    pub last_nav_date: Option<NaiveDate>,
    /// Closing market price on `effective_date`
    #[serde(default)]
    pub market_price: Option<Decimal>,
    /// Premium (positive) or discount (negative) of price to forecast NAV
    #[serde(default)]
    pub premium_discount: Option<Decimal>,
    /// Name of the model that produced the forecast
    #[serde(default)]
    pub model: Option<String>,
}

impl FundForecast {
    /// Create a forecast with only the identifying fields set
    pub fn new(ticker: impl Into<String>, effective_date: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            effective_date,
            nav_forecast: None,
            nav_forecast_low: None,
            nav_forecast_high: None,
            last_nav: None,
            last_nav_date: None,
            market_price: None,
            premium_discount: None,
            model: None,
        }
    }
}

/// Daily NAV forecast for a Canadian-listed fund
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaFundForecast {
    pub ticker: String,
    pub effective_date: NaiveDate,
    /// Currency the fund reports its NAV in (ISO 4217)
    pub currency: String,
    #[serde(default)]
    pub nav_forecast: Option<Decimal>,
    /// Reporting currency to CAD rate used for `nav_forecast_cad`
    #[serde(default)]
    pub fx_rate: Option<Decimal>,
    #[serde(default)]
    pub nav_forecast_cad: Option<Decimal>,
    #[serde(default)]
    pub market_price: Option<Decimal>,
    #[serde(default)]
    pub premium_discount: Option<Decimal>,
    #[serde(default)]
    pub model: Option<String>,
}

impl CaFundForecast {
    pub fn new(
        ticker: impl Into<String>,
        effective_date: NaiveDate,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            effective_date,
            currency: currency.into(),
            nav_forecast: None,
            fx_rate: None,
            nav_forecast_cad: None,
            market_price: None,
            premium_discount: None,
            model: None,
        }
    }
}

/// Premium/discount statistics over trailing windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdStat {
    pub ticker: String,
    pub effective_date: NaiveDate,
    #[serde(default)]
    pub pd_current: Option<Decimal>,
    #[serde(default)]
    pub pd_mean_6m: Option<Decimal>,
    #[serde(default)]
    pub pd_mean_1y: Option<Decimal>,
    #[serde(default)]
    pub pd_mean_3y: Option<Decimal>,
    #[serde(default)]
    pub pd_stddev_1y: Option<Decimal>,
    #[serde(default)]
    pub z_score_6m: Option<Decimal>,
    #[serde(default)]
    pub z_score_1y: Option<Decimal>,
    #[serde(default)]
    pub z_score_3y: Option<Decimal>,
    #[serde(default)]
    pub pd_min_1y: Option<Decimal>,
    #[serde(default)]
    pub pd_max_1y: Option<Decimal>,
}

impl PdStat {
    pub fn new(ticker: impl Into<String>, effective_date: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            effective_date,
            pd_current: None,
            pd_mean_6m: None,
            pd_mean_1y: None,
            pd_mean_3y: None,
            pd_stddev_1y: None,
            z_score_6m: None,
            z_score_1y: None,
            z_score_3y: None,
            pd_min_1y: None,
            pd_max_1y: None,
        }
    }
}
