pub mod apis;
pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod rate_limiter;
pub mod retry;
pub mod types;

pub use app::matching::ConcertMatcher;
pub use error::{ConcertError, Result};
pub use types::{AccessToken, Artist, Event, MatchResult};
