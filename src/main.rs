use anyhow::Context;
use clap::{Parser, Subcommand};
use concert_finder::apis::spotify::SpotifyClient;
use concert_finder::config::Config;
use concert_finder::constants;
use concert_finder::logging;
use concert_finder::{AccessToken, ConcertError, ConcertMatcher, MatchResult};
use tracing::error;

#[derive(Parser)]
#[command(name = "concert_finder")]
#[command(about = "Upcoming concerts in your city for the artists you listen to most")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Spotify authorization URL
    LoginUrl {
        #[arg(long)]
        redirect_uri: String,
    },
    /// Exchange an authorization code for an access token
    Exchange {
        #[arg(long)]
        code: String,
        #[arg(long)]
        redirect_uri: String,
    },
    /// Show your merged top artists
    Artists {
        /// Spotify access token
        #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Find upcoming concerts for your top artists
    Concerts {
        /// Spotify access token
        #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_concerts(result: &MatchResult) {
    println!(
        "\n🎵 Concerts in {} for {} of your artists:",
        result.city, result.artists_considered
    );
    if result.is_empty() {
        println!("   No upcoming concerts found.");
    }
    for event in result {
        println!("   {}  {}", event.display_date(), event.name);
        println!("      @ {} (via {})", event.venue, event.source_artist);
        println!("      {}", event.ticket_url);
    }
    if result.failed_lookups > 0 {
        println!(
            "\n⚠️  {} artist lookups failed; results may be incomplete",
            result.failed_lookups
        );
    }
}

fn reauth_hint(err: &ConcertError) {
    if err.is_auth() {
        println!(
            "🔑 Your Spotify session is no longer valid. Run `concert_finder login-url` to sign in again (or set {}).",
            constants::ENV_SPOTIFY_ACCESS_TOKEN
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;

    match cli.command {
        Commands::LoginUrl { redirect_uri } => {
            config.validate_for_oauth()?;
            let client = SpotifyClient::new(&config)?;
            println!("{}", client.authorize_url(&redirect_uri)?);
        }
        Commands::Exchange { code, redirect_uri } => {
            config.validate_for_oauth()?;
            let client = SpotifyClient::new(&config)?;
            match client.exchange_code(&code, &redirect_uri).await {
                Ok(token) => println!("{}", serde_json::to_string_pretty(&token)?),
                Err(e) => {
                    error!("Token exchange failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Artists { token } => {
            let matcher = ConcertMatcher::from_config(&config)?;
            match matcher.top_artists(&AccessToken::new(token)).await {
                Ok(artists) => {
                    println!("\n🎧 {} top artists:", artists.len());
                    for (i, artist) in artists.iter().enumerate() {
                        println!(
                            "   {:>3}. {} (best rank {}, in {} windows)",
                            i + 1,
                            artist.name,
                            artist.rank_score,
                            artist.appearances
                        );
                    }
                }
                Err(e) => {
                    reauth_hint(&e);
                    return Err(e.into());
                }
            }
        }
        Commands::Concerts { token, json } => {
            let matcher = ConcertMatcher::from_config(&config)?;
            if !json {
                println!("🔎 Searching concerts in {}...", matcher.city());
            }
            match matcher.build_concert_list(&AccessToken::new(token)).await {
                Ok(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
                Ok(result) => print_concerts(&result),
                Err(e) => {
                    reauth_hint(&e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
