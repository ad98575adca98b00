// Engine library root
// Tick-to-candle aggregation for rate feeds.

pub mod aggregation;
pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;

pub use error::EngineError;
pub use pipeline::{run, CandlePipeline, PipelineOutput};
