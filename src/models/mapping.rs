//! Broker to security identifier mappings

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maps a broker's security code onto the identifiers used by reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerSecurityMapping {
    pub broker_code: String,
    /// Security identifier as the broker reports it
    pub security_id: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub cusip: Option<String>,
    #[serde(default)]
    pub isin: Option<String>,
    #[serde(default)]
    pub updated_on: Option<NaiveDate>,
}
