//! Routing error taxonomy.

use thiserror::Error;

use crate::osrm::TransportError;
use crate::polyline::PolylineError;

/// Why a route computation did not produce routes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("routing request timed out")]
    Timeout,

    #[error("routing service request failed: {0}")]
    Transport(String),

    #[error("routing rejected by backend with code {code}: {message}")]
    RoutingRejected { code: String, message: String },

    #[error("could not decode routing response: {0}")]
    DecodeFailure(String),

    #[error("routing request was superseded")]
    Aborted,
}

impl RoutingError {
    /// Numeric status as reported to error listeners.
    ///
    /// Client side failures are negative; backend rejections are positive.
    pub fn status(&self) -> i32 {
        match self {
            RoutingError::Timeout | RoutingError::Transport(_) => -1,
            RoutingError::Aborted => -2,
            RoutingError::DecodeFailure(_) => -3,
            RoutingError::RoutingRejected { .. } => 1,
        }
    }

    pub fn is_user_visible(&self) -> bool {
        !matches!(self, RoutingError::Aborted)
    }

    /// A rejection means the route no longer exists, so the drawn line goes.
    pub fn clears_route(&self) -> bool {
        matches!(self, RoutingError::RoutingRejected { .. })
    }
}

impl From<PolylineError> for RoutingError {
    fn from(err: PolylineError) -> Self {
        RoutingError::DecodeFailure(err.to_string())
    }
}

impl From<TransportError> for RoutingError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Request(inner) if inner.is_timeout() => RoutingError::Timeout,
            TransportError::Deserialize(inner) => RoutingError::DecodeFailure(inner.to_string()),
            other => RoutingError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RoutingError {
    fn from(err: serde_json::Error) -> Self {
        RoutingError::DecodeFailure(err.to_string())
    }
}

/// Message shown to the driver for a routing failure.
pub fn format_error_message(error: &RoutingError) -> String {
    if error.status() < 0 {
        format!("Calculating the route caused an error. Technical description follows: {error}")
    } else {
        format!("The route could not be calculated. {error}")
    }
}
