pub mod spotify;
pub mod ticketmaster;

use crate::error::ConcertError;
use reqwest::StatusCode;

/// Classifies a non-success response. Rate limiting and server errors are
/// transient; anything else is not worth retrying.
pub(crate) fn status_error(service: &'static str, status: StatusCode, body: &str) -> ConcertError {
    let snippet: String = body.chars().take(200).collect();
    let message = format!("HTTP {}: {}", status.as_u16(), snippet);
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ConcertError::transient(service, message)
    } else {
        ConcertError::upstream(service, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(status_error("t", StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(status_error("t", StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(!status_error("t", StatusCode::NOT_FOUND, "").is_transient());
        assert!(!status_error("t", StatusCode::BAD_REQUEST, "").is_transient());
    }
}
