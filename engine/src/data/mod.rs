// Loading of raw rate samples
pub mod rates_csv;

pub use rates_csv::{RateFilter, RatesCsvLoader};
