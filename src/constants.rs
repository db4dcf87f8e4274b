/// Service labels used in errors, logs and metrics
pub const SPOTIFY_SERVICE: &str = "spotify";
pub const TICKETMASTER_SERVICE: &str = "ticketmaster";

// Default endpoints
pub const SPOTIFY_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
pub const TICKETMASTER_API_BASE: &str = "https://app.ticketmaster.com/discovery/v2";

/// OAuth scope needed for the top-artists endpoint
pub const SPOTIFY_SCOPES: &str = "user-top-read";

pub const DEFAULT_CITY: &str = "San Francisco";

/// Spotify caps `limit` on the top-artists endpoint at 50
pub const MAX_TOP_ARTISTS_LIMIT: u32 = 50;

/// Venue label used when the catalog does not name one
pub const UNKNOWN_VENUE: &str = "TBA";

/// Smallest image width worth showing next to an event
pub const MIN_EVENT_IMAGE_WIDTH: u32 = 300;

// Environment variables read at startup
pub const ENV_CONFIG_PATH: &str = "CONCERT_FINDER_CONFIG";
pub const ENV_SPOTIFY_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
pub const ENV_SPOTIFY_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";
pub const ENV_SPOTIFY_ACCESS_TOKEN: &str = "SPOTIFY_ACCESS_TOKEN";
pub const ENV_TICKETMASTER_API_KEY: &str = "TICKETMASTER_API_KEY";
pub const ENV_CITY: &str = "CONCERT_CITY";
