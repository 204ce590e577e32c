//! Unified error handling for the walk-planner library.
//!
//! Most failures in this crate are recovered locally (a dropped route, a
//! fallback waypoint ring, a default pace). The variants here are what is left
//! over: conditions the caller has to see, plus the locally-absorbed ones so
//! that collaborators can report them through a single type.

use thiserror::Error;

/// Unified error type for walk-planner operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WalkError {
    /// Routing or POI service unreachable, or answered with a non-2xx status
    #[error("{}", network_message(.message, .status_code))]
    Network {
        message: String,
        status_code: Option<u16>,
    },
    /// An operation with an explicit deadline did not finish in time
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },
    /// Every routing request for every waypoint failed
    #[error("No route could be fetched for any of {attempted} waypoints")]
    NoRouteFound { attempted: usize },
    /// Routes were fetched but none lies within the target distance band
    #[error("None of {fetched} fetched routes is within range of {target_distance_m:.0}m")]
    NoCandidateInBand {
        fetched: usize,
        target_distance_m: f64,
    },
    /// Persisted state could not be read or written
    #[error("Persistence error: {message}")]
    Persistence { message: String },
    /// Region dataset is malformed
    #[error("Invalid region data: {message}")]
    InvalidRegion { message: String },
    /// Caller supplied an unusable value
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
    /// A newer recommendation request has already started or committed
    #[error("Recommendation #{generation} superseded by #{latest}")]
    Superseded { generation: u64, latest: u64 },
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn network_message(message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("HTTP error ({}): {}", code, message),
        None => format!("HTTP error: {}", message),
    }
}

impl WalkError {
    /// Whether this error ends a recommendation with a notice for the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            WalkError::NoRouteFound { .. } | WalkError::NoCandidateInBand { .. }
        )
    }

    /// The single sentence shown to the user, for user-visible errors.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            WalkError::NoRouteFound { .. } => {
                Some("Couldn't fetch any walking routes. Check your connection and try again.")
            }
            WalkError::NoCandidateInBand { .. } => {
                Some("No nearby route matched the requested time. Please try again.")
            }
            _ => None,
        }
    }

    pub(crate) fn persistence(err: impl std::fmt::Display) -> Self {
        WalkError::Persistence {
            message: err.to_string(),
        }
    }
}

/// Result type alias for walk-planner operations.
pub type Result<T> = std::result::Result<T, WalkError>;

/// Extension trait for converting Option to WalkError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an invalid input error.
    fn ok_or_invalid(self, message: &str) -> Result<T>;

    /// Convert Option to Result with an invalid region error.
    fn ok_or_invalid_region(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid(self, message: &str) -> Result<T> {
        self.ok_or_else(|| WalkError::InvalidInput {
            message: message.to_string(),
        })
    }

    fn ok_or_invalid_region(self, message: &str) -> Result<T> {
        self.ok_or_else(|| WalkError::InvalidRegion {
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WalkError::Network {
            message: "connection refused".to_string(),
            status_code: Some(502),
        };
        assert_eq!(err.to_string(), "HTTP error (502): connection refused");

        let err = WalkError::Network {
            message: "dns".to_string(),
            status_code: None,
        };
        assert_eq!(err.to_string(), "HTTP error: dns");
    }

    #[test]
    fn test_user_visible_errors_have_distinct_notices() {
        let none = WalkError::NoRouteFound { attempted: 12 };
        let band = WalkError::NoCandidateInBand {
            fetched: 4,
            target_distance_m: 1500.0,
        };
        assert!(none.is_user_visible());
        assert!(band.is_user_visible());
        assert_ne!(none.notice(), band.notice());

        let timeout = WalkError::Timeout {
            operation: "poi query".to_string(),
            after_ms: 9000,
        };
        assert!(!timeout.is_user_visible());
        assert!(timeout.notice().is_none());
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_invalid("missing"),
            Err(WalkError::InvalidInput { .. })
        ));
        assert!(matches!(
            Some(3).ok_or_invalid_region("missing"),
            Ok(3)
        ));
    }
}
