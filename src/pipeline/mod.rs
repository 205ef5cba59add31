// Aggregation pipeline: normalize, dedupe, geocode, measure

pub mod aggregator;
pub mod distance;
pub mod geocode;
pub mod normalize;

pub use aggregator::{AggregationResult, Aggregator, SourceReport};
