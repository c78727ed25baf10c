//! Station matching error types.

use crate::domain::StationId;
use crate::store::StoreError;

use super::query::InvalidQuery;

/// Errors that can occur when looking up stations.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Query rejected before reaching the store
    #[error(transparent)]
    InvalidQuery(#[from] InvalidQuery),

    /// Search radius is not a positive distance
    #[error("invalid search radius: {0} km")]
    InvalidRadius(f64),

    /// Station does not exist or is not active
    #[error("unknown station: {0}")]
    UnknownStation(StationId),

    /// Store read or write failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = MatchError::from(InvalidQuery);
        assert_eq!(err.to_string(), "query must be at least 2 characters");

        let err = MatchError::UnknownStation(StationId::new(12));
        assert_eq!(err.to_string(), "unknown station: 12");

        let err = MatchError::InvalidRadius(-1.0);
        assert_eq!(err.to_string(), "invalid search radius: -1 km");
    }
}
