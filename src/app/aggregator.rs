use crate::app::ports::ListeningHistoryPort;
use crate::error::Result;
use crate::types::{AccessToken, Artist, ProviderArtist, TimeRange};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Merges a user's top artists across the short, medium and long windows
pub struct TopArtistAggregator {
    history: Arc<dyn ListeningHistoryPort>,
    per_window_limit: u32,
}

impl TopArtistAggregator {
    pub fn new(history: Arc<dyn ListeningHistoryPort>, per_window_limit: u32) -> Self {
        Self {
            history,
            per_window_limit,
        }
    }

    /// Queries each window in order and merges the results. An auth failure
    /// stops immediately; any other failure leaves that window empty.
    #[instrument(skip(self, token))]
    pub async fn fetch_top_artists(&self, token: &AccessToken) -> Result<Vec<Artist>> {
        let mut windows = Vec::with_capacity(TimeRange::ALL.len());

        for window in TimeRange::ALL {
            match self
                .history
                .top_artists(token, window, self.per_window_limit)
                .await
            {
                Ok(artists) => windows.push((window, artists)),
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    warn!(window = %window, error = %e, "Top artists window failed, treating as empty");
                    metrics::counter!("concert_finder_window_failures_total", "window" => window.as_param())
                        .increment(1);
                    windows.push((window, Vec::new()));
                }
            }
        }

        let merged = merge_windows(&windows);
        info!("Merged {} unique artists from {} windows", merged.len(), windows.len());
        Ok(merged)
    }
}

struct MergeEntry<'a> {
    artist: &'a ProviderArtist,
    best_rank: u32,
    appearances: u32,
    last_window: usize,
}

/// One entry per provider id, ordered by best rank, then by how many
/// windows the artist appears in, then by first appearance. `windows` must
/// be in short, medium, long order.
pub fn merge_windows(windows: &[(TimeRange, Vec<ProviderArtist>)]) -> Vec<Artist> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<MergeEntry<'_>> = Vec::new();

    for (window_idx, (_, artists)) in windows.iter().enumerate() {
        for (pos, artist) in artists.iter().enumerate() {
            let rank = pos as u32 + 1;
            let existing = index.get(artist.id.as_str()).copied();
            match existing {
                Some(i) => {
                    let entry = &mut entries[i];
                    entry.best_rank = entry.best_rank.min(rank);
                    if entry.last_window != window_idx {
                        entry.appearances += 1;
                        entry.last_window = window_idx;
                    }
                }
                None => {
                    index.insert(artist.id.as_str(), entries.len());
                    entries.push(MergeEntry {
                        artist,
                        best_rank: rank,
                        appearances: 1,
                        last_window: window_idx,
                    });
                }
            }
        }
    }

    // stable: equal keys keep first-seen order
    entries.sort_by_key(|e| (e.best_rank, Reverse(e.appearances)));

    entries
        .into_iter()
        .map(|e| Artist {
            name: e.artist.name.clone(),
            provider_id: e.artist.id.clone(),
            rank_score: e.best_rank,
            appearances: e.appearances,
            image_url: e.artist.image_url.clone(),
            genres: e.artist.genres.clone(),
        })
        .collect()
}
