//! Spatial co-occurrence mining for geotagged short texts.
//!
//! For every token of a training corpus, the adjacent bigrams it forms are
//! tested with Ripley's K-function and a Monte Carlo envelope: a bigram whose
//! documents cluster more tightly than random subsets of the token's
//! documents is an *attraction*, one that spreads out more is a *repulsion*.

pub mod analysis;
pub mod config;
pub mod cooccurrence;
pub mod error;
pub mod geometry;
pub mod kfunction;
pub mod models;
pub mod montecarlo;
pub mod projection;
pub mod reader;
pub mod results;
pub mod spatial_index;

pub use analysis::{AnalysisDriver, CancellationToken};
pub use config::AnalysisConfig;
pub use error::{CoocError, Result};
pub use models::{AnalysisSummary, Document, Grid, GridCell, KScoreResult, PairKey, Relationship};
pub use results::{RelationshipSets, ResultWriter};
