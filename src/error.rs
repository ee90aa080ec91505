//! Error taxonomy for the faceted analysis engine.
//!
//! Dimension- and value-level problems are recoverable: callers skip the
//! offending value and carry on unless strict mode is active. Store-level
//! problems are fatal for the request that hit them.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// The filter names an attribute the engine does not know.
    #[error("unknown dimension: {0}")]
    InvalidDimension(String),

    /// A value does not parse for its dimension's type.
    #[error("invalid value {value:?} for {dimension}: {reason}")]
    InvalidValue {
        dimension: String,
        value: String,
        reason: String,
    },

    /// A single aggregation exceeded its deadline.
    #[error("aggregation for {facet} timed out after {after_ms}ms")]
    FacetTimeout { facet: String, after_ms: u64 },

    /// The corpus store cannot be reached or failed mid-query.
    #[error("corpus unavailable: {0}")]
    CorpusUnavailable(String),

    /// An aggregation task died without producing a result.
    #[error("aggregation for {facet} failed: {reason}")]
    AggregationFailed { facet: String, reason: String },

    /// A newer request replaced this one before it completed.
    #[error("request #{sequence} superseded by #{latest}")]
    Superseded { sequence: u64, latest: u64 },

    /// The aggregation observed its cancellation token.
    #[error("aggregation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Whether a facet failing with this error may fall back to the applied
    /// distribution instead of failing the whole request.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            EngineError::FacetTimeout { .. } | EngineError::AggregationFailed { .. }
        )
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::CorpusUnavailable(e.to_string())
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degradable_errors() {
        assert!(EngineError::FacetTimeout { facet: "lens".into(), after_ms: 10 }.is_degradable());
        assert!(!EngineError::Cancelled.is_degradable());
        assert!(!EngineError::CorpusUnavailable("gone".into()).is_degradable());
        assert!(!EngineError::InvalidDimension("colour".into()).is_degradable());
    }

    #[test]
    fn test_error_messages() {
        let err = EngineError::InvalidValue {
            dimension: "iso".into(),
            value: "fast".into(),
            reason: "not an integer".into(),
        };
        assert_eq!(err.to_string(), "invalid value \"fast\" for iso: not an integer");
    }
}
