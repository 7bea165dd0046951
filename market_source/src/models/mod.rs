//! Canonical data model shared by adapters, the pagination driver, and the
//! storage/sync layer downstream.

pub mod candle;
pub mod series;
pub mod timeframe;

pub use candle::Candle;
pub use series::{SeriesKey, SourceId};
pub use timeframe::Timeframe;
