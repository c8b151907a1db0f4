//! Geocoder error types.

/// Errors that can occur when resolving an address.
///
/// Callers treat every variant the same way as "address not found";
/// the distinction exists for logging.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limited by the geocoding service
    #[error("rate limited by geocoding service")]
    RateLimited,

    /// Service returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse the response
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// The call did not finish in time
    #[error("geocoding timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Client could not be built from its configuration
    #[error("not configured: {0}")]
    NotConfigured(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = GeocodeError::Api {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(err.to_string(), "API error 503: Service Unavailable");

        let err = GeocodeError::Timeout { secs: 10 };
        assert_eq!(err.to_string(), "geocoding timed out after 10s");

        assert_eq!(
            GeocodeError::RateLimited.to_string(),
            "rate limited by geocoding service"
        );
    }
}
