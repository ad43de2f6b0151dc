//! Concept graph construction: aggregates a user's extracted concepts into
//! nodes and edges, filtered by an abstraction-level threshold.

mod builder;
mod service;
mod snapshot;

pub use builder::{build_from_parts, density, min_frequency, ConceptEdge, ConceptMap, ConceptNode};
pub use service::ConceptMapService;
pub use snapshot::MapCache;
