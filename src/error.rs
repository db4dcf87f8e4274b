use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConcertError {
    /// The listening-history credential was rejected. Never retried.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
        transient: bool,
    },

    #[error("Invalid record: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConcertError {
    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        ConcertError::Upstream {
            service,
            message: message.into(),
            transient: false,
        }
    }

    pub fn transient(service: &'static str, message: impl Into<String>) -> Self {
        ConcertError::Upstream {
            service,
            message: message.into(),
            transient: true,
        }
    }

    /// Maps a transport-level reqwest failure. Timeouts and connection
    /// errors are worth another attempt; decode errors are not.
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::transient(service, err.to_string())
        } else {
            Self::upstream(service, err.to_string())
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ConcertError::Upstream { transient: true, .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ConcertError::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, ConcertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_flag_is_only_set_by_transient_constructor() {
        assert!(ConcertError::transient("spotify", "503").is_transient());
        assert!(!ConcertError::upstream("spotify", "404").is_transient());
        assert!(!ConcertError::Auth("expired".into()).is_transient());
    }

    #[test]
    fn upstream_display_names_the_service() {
        let err = ConcertError::upstream("ticketmaster", "HTTP 500");
        assert_eq!(err.to_string(), "ticketmaster request failed: HTTP 500");
    }
}
