//! Records and values flowing through the publish pipeline

pub mod activist;
pub mod cell;
pub mod fund;
pub mod mapping;
pub mod portfolio;
pub mod tender;

pub use activist::ActivistScore;
pub use cell::{
    Cell, ColumnType, NUMBER_PRECISION, NUMBER_SCALE, Row, fits_number_column, is_unset_date,
    unset_date,
};
pub use fund::{CaFundForecast, FundForecast, PdStat};
pub use mapping::BrokerSecurityMapping;
pub use portfolio::PortfolioReturn;
pub use tender::TenderOffer;
