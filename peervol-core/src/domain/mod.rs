//! Domain types shared by every component.

pub mod entity;
pub mod forecast;
pub mod series;

pub use entity::EntityRecord;
pub use forecast::ForecastRecord;
pub use series::{Series, SeriesError};
