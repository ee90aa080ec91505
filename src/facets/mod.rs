//! Faceted filtering over the photo corpus.
//!
//! A [`FilterState`] is resolved by the [`FacetEngine`] into an applied
//! aggregate plus one aggregate per faceted dimension, each computed with that
//! dimension's own constraint removed.

pub mod aggregator;
pub mod cache;
pub mod dimension;
pub mod distribution;
pub mod filter;
pub mod hierarchy;
pub mod lens;
pub mod orchestrator;
pub mod planner;
pub mod tracker;
pub mod values;

pub use aggregator::{aggregate, AggregateResult};
pub use dimension::{AxisOrder, Dimension};
pub use distribution::{Distribution, FrequencyEntry};
pub use filter::{FilterState, ParsedFilter};
pub use hierarchy::{apply_selection, invalidate_downstream, Selection};
pub use lens::{FocalLengthReport, LensType};
pub use orchestrator::{Baseline, CombinedResult, FacetEngine, FacetResult, FailureMode};
pub use planner::{plan, FacetPlan};
pub use tracker::{CancelToken, RequestTracker, ResultSlot, Sequenced};
