//! Faceted analysis of photography EXIF metadata.
//!
//! The engine answers "what do my kept photos look like under this filter"
//! for every dimension at once: each facet shows the options still available
//! when only that dimension's own selection is lifted.

pub mod config;
pub mod corpus;
pub mod db;
pub mod error;
pub mod export;
pub mod facets;
pub mod logging;

pub use error::{EngineError, EngineResult};
