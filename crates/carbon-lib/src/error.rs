//! Error types for the carbon pipeline

use crate::history::Series;

/// Errors surfaced by the sampler, the emission model and the trackers
#[derive(Debug, thiserror::Error)]
pub enum CarbonError {
    /// The system sampler could not produce a sample
    #[error("Sampler unavailable: {0}")]
    SamplerUnavailable(String),

    /// A caller supplied a value outside the accepted domain
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An append did not carry a value for every tracked series
    #[error("Missing value for series '{0}'")]
    MissingSeries(Series),

    /// Optimization strategy id not recognised
    #[error("Unknown optimization type: {0}")]
    UnknownStrategy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CarbonError {
    pub(crate) fn sampler_unavailable<S: Into<String>>(msg: S) -> Self {
        CarbonError::SamplerUnavailable(msg.into())
    }

    pub(crate) fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        CarbonError::InvalidParameter(msg.into())
    }

    /// Returns true if the error is a caller contract violation
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CarbonError::InvalidParameter(_) | CarbonError::UnknownStrategy(_)
        )
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, CarbonError>;
