//! Multi-dimensional opportunity matching.
//!
//! The engine scores a filtered [`PartialProfile`](crate::privacy::PartialProfile)
//! against an [`Opportunity`] on six independently substitutable dimensions
//! and combines them with the fixed [`WEIGHTS`] table.

pub mod engine;
pub mod graph;
pub mod opportunity;
pub mod scorers;
pub mod service;
pub mod weights;

pub use engine::{DimensionScores, MatchResult, MatchingEngine};
pub use graph::{ConnectionGraph, MemoryConnectionGraph};
pub use opportunity::{Opportunity, OpportunityStatus, OpportunityUpdate};
pub use scorers::DimensionScorer;
pub use service::{MatchService, MemoryOpportunitySource, OpportunitySource};
pub use weights::{Dimension, WEIGHTS};
