//! Data sources for realized-volatility series.

pub mod csv_returns;
pub mod provider;
pub mod synthetic;

pub use csv_returns::CsvReturnsProvider;
pub use provider::{clean_ticker, DataError, DataSource, SeriesProvider};
pub use synthetic::SyntheticProvider;
