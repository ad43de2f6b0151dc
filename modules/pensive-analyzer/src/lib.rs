//! The analyzer adapter: turns raw content into a structured [`Analysis`]
//! via one LLM call, with a TTL cache in front and a deterministic fallback
//! behind. The pipeline never blocks on LLM unavailability.

mod analyzer;
mod cache;

pub use analyzer::{fallback_analysis, mock_analysis, Analyzed, Analyzer};
pub use cache::AnalysisCache;

pub use pensive_common::Analysis;
