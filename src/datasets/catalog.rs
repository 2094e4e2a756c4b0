//! Standard fund-analytics datasets
//!
//! Declares the column schema, scope key and move operation of every dataset
//! the analytics layer publishes, and applies per-dataset overrides from
//! configuration. Descriptors are shared read-only as `Arc`s once the catalog
//! is built.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::DescriptorError;
use super::descriptor::{ColumnSpec, DatasetDescriptor, MoveOperation};
use crate::database::config::{DatasetOverride, PublishConfig};
use crate::models::{Cell, ColumnType};

/// Value of the constant `source` column on every standard dataset
pub const SOURCE_TAG: &str = "fund-publish";

/// Datasets known to the catalog out of the box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    FundForecasts,
    PdStats,
    PortfolioReturns,
    CaFundForecasts,
    ActivistScores,
    TenderOffers,
    BrokerSecurityMappings,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 7] = [
        DatasetKind::FundForecasts,
        DatasetKind::PdStats,
        DatasetKind::PortfolioReturns,
        DatasetKind::CaFundForecasts,
        DatasetKind::ActivistScores,
        DatasetKind::TenderOffers,
        DatasetKind::BrokerSecurityMappings,
    ];

    /// Dataset name used in configuration and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::FundForecasts => "fund_forecasts",
            DatasetKind::PdStats => "pd_stats",
            DatasetKind::PortfolioReturns => "portfolio_returns",
            DatasetKind::CaFundForecasts => "ca_fund_forecasts",
            DatasetKind::ActivistScores => "activist_scores",
            DatasetKind::TenderOffers => "tender_offers",
            DatasetKind::BrokerSecurityMappings => "broker_security_mappings",
        }
    }

    /// Default descriptor for this dataset
    pub fn descriptor(&self) -> Result<DatasetDescriptor, DescriptorError> {
        let builder = DatasetDescriptor::builder(self.name());
        let builder = match self {
            DatasetKind::FundForecasts => builder
                .staging_table("stg_fund_forecasts")
                .column(ColumnSpec::text("ticker").required())
                .column(ColumnSpec::date("effective_date").required())
                .column(ColumnSpec::number("nav_forecast"))
                .column(ColumnSpec::number("nav_forecast_low"))
                .column(ColumnSpec::number("nav_forecast_high"))
                .column(ColumnSpec::number("last_nav"))
                .column(ColumnSpec::date("last_nav_date"))
                .column(ColumnSpec::number("market_price"))
                .column(ColumnSpec::number("premium_discount"))
                .column(ColumnSpec::text("model"))
                .scoped_by("effective_date")
                .move_procedure("usp_move_fund_forecasts", true),
            DatasetKind::PdStats => builder
                .staging_table("stg_pd_stats")
                .column(ColumnSpec::text("ticker").required())
                .column(ColumnSpec::date("effective_date").required())
                .column(ColumnSpec::number("pd_current"))
                .column(ColumnSpec::number("pd_mean_6m"))
                .column(ColumnSpec::number("pd_mean_1y"))
                .column(ColumnSpec::number("pd_mean_3y"))
                .column(ColumnSpec::number("pd_stddev_1y"))
                .column(ColumnSpec::number("z_score_6m"))
                .column(ColumnSpec::number("z_score_1y"))
                .column(ColumnSpec::number("z_score_3y"))
                .column(ColumnSpec::number("pd_min_1y"))
                .column(ColumnSpec::number("pd_max_1y"))
                .scoped_by("effective_date")
                .move_procedure("usp_move_pd_stats", true),
            DatasetKind::PortfolioReturns => builder
                .staging_table("stg_portfolio_returns")
                .column(ColumnSpec::text("fund_ticker").required())
                .column(ColumnSpec::text("holding_id").required())
                .column(ColumnSpec::text("holding_name"))
                .column(ColumnSpec::date("as_of_date").required())
                .column(ColumnSpec::number("weight"))
                .column(ColumnSpec::number("return_1d"))
                .column(ColumnSpec::number("return_mtd"))
                .column(ColumnSpec::number("return_ytd"))
                .column(ColumnSpec::number("contribution_1d"))
                .scoped_by("as_of_date")
                .move_procedure("usp_move_portfolio_returns", true),
            DatasetKind::CaFundForecasts => builder
                .staging_table("stg_ca_fund_forecasts")
                .column(ColumnSpec::text("ticker").required())
                .column(ColumnSpec::date("effective_date").required())
                .column(ColumnSpec::text("currency").required())
                .column(ColumnSpec::number("nav_forecast"))
                .column(ColumnSpec::number("fx_rate"))
                .column(ColumnSpec::number("nav_forecast_cad"))
                .column(ColumnSpec::number("market_price"))
                .column(ColumnSpec::number("premium_discount"))
                .column(ColumnSpec::text("model"))
                .scoped_by("effective_date")
                .move_procedure("usp_move_ca_fund_forecasts", true),
            DatasetKind::ActivistScores => builder
                .staging_table("stg_activist_scores")
                .column(ColumnSpec::text("fund_ticker").required())
                .column(ColumnSpec::text("activist").required())
                .column(ColumnSpec::date("score_date").required())
                .column(ColumnSpec::number("score"))
                .column(ColumnSpec::number("ownership_pct"))
                .column(ColumnSpec::date("last_filing_date"))
                .column(ColumnSpec::text("filing_type"))
                .column(ColumnSpec::text("notes"))
                .scoped_by("score_date")
                .move_procedure("usp_move_activist_scores", true),
            DatasetKind::TenderOffers => builder
                .staging_table("stg_tender_offers")
                .column(ColumnSpec::text("fund_ticker").required())
                .column(ColumnSpec::date("announce_date").required())
                .column(ColumnSpec::date("expiration_date"))
                .column(ColumnSpec::date("payment_date"))
                .column(ColumnSpec::number("offer_pct"))
                .column(ColumnSpec::number("price_pct_of_nav"))
                .column(ColumnSpec::number("shares_tendered"))
                .column(ColumnSpec::number("proration_pct"))
                .column(ColumnSpec::text("status"))
                .move_procedure("usp_move_tender_offers", false),
            DatasetKind::BrokerSecurityMappings => builder
                .staging_table("stg_broker_security_mappings")
                .column(ColumnSpec::text("broker_code").required())
                .column(ColumnSpec::text("security_id").required())
                .column(ColumnSpec::text("ticker"))
                .column(ColumnSpec::text("cusip"))
                .column(ColumnSpec::text("isin"))
                .column(ColumnSpec::date("updated_on"))
                .move_procedure("usp_update_broker_security_mappings", false),
        };

        builder
            .column(ColumnSpec::constant(
                "source",
                ColumnType::Text,
                Cell::Text(SOURCE_TAG.to_string()),
            ))
            .build()
    }
}

impl std::str::FromStr for DatasetKind {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| DescriptorError::UnknownDataset(s.to_string()))
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Descriptors by dataset name
#[derive(Debug, Clone, Default)]
pub struct DatasetCatalog {
    descriptors: BTreeMap<String, Arc<DatasetDescriptor>>,
}

impl DatasetCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every standard dataset with its defaults
    pub fn standard() -> Result<Self, DescriptorError> {
        let mut catalog = Self::new();
        for kind in DatasetKind::ALL {
            catalog.register(kind.descriptor()?);
        }
        Ok(catalog)
    }

    /// Standard catalog with the configured per-dataset overrides applied
    pub fn from_config(config: &PublishConfig) -> Result<Self, DescriptorError> {
        let mut catalog = Self::standard()?;
        for (name, overrides) in &config.datasets {
            let descriptor = catalog
                .get(name)
                .ok_or_else(|| DescriptorError::UnknownDataset(name.clone()))?;
            let updated = apply_override(&descriptor, overrides)?;
            catalog.register(updated);
        }
        Ok(catalog)
    }

    /// Add or replace a descriptor
    pub fn register(&mut self, descriptor: DatasetDescriptor) {
        self.descriptors
            .insert(descriptor.name().to_string(), Arc::new(descriptor));
    }

    pub fn get(&self, name: &str) -> Option<Arc<DatasetDescriptor>> {
        self.descriptors.get(name).cloned()
    }

    /// Look up a dataset, failing for unknown names
    pub fn require(&self, name: &str) -> Result<Arc<DatasetDescriptor>, DescriptorError> {
        self.get(name)
            .ok_or_else(|| DescriptorError::UnknownDataset(name.to_string()))
    }

    /// Descriptors in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<DatasetDescriptor>> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn apply_override(
    descriptor: &DatasetDescriptor,
    overrides: &DatasetOverride,
) -> Result<DatasetDescriptor, DescriptorError> {
    let mut updated = match &overrides.staging_table {
        Some(table) => descriptor.with_staging_table(table)?,
        None => descriptor.clone(),
    };

    let pass_scope = overrides.pass_scope.unwrap_or_else(|| match descriptor.move_operation() {
        MoveOperation::Procedure { pass_scope, .. } => *pass_scope,
        _ => descriptor.scope().is_some(),
    });

    let operation = match (&overrides.move_procedure, &overrides.target_table) {
        (Some(name), _) => Some(MoveOperation::Procedure {
            name: name.clone(),
            pass_scope,
        }),
        (None, Some(target)) => Some(match &overrides.key_columns {
            Some(keys) => MoveOperation::Upsert {
                target: target.clone(),
                key_columns: keys.clone(),
            },
            None => MoveOperation::Replace {
                target: target.clone(),
            },
        }),
        (None, None) => match descriptor.move_operation() {
            MoveOperation::Procedure { name, .. } if overrides.pass_scope.is_some() => {
                Some(MoveOperation::Procedure {
                    name: name.clone(),
                    pass_scope,
                })
            }
            _ => None,
        },
    };

    if let Some(operation) = operation {
        updated = updated.with_move_operation(operation)?;
    }
    Ok(updated)
}
