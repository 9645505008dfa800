/// Episode metadata retrieval from TheTVDB.
///
/// This module provides the normalized [`Episode`] record, the
/// [`EpisodeSource`] trait for anything that can list a series' episodes,
/// and the TheTVDB v4 implementation with its authentication and transport.
mod auth;
mod client;
mod transport;
mod tvdb_types;

pub use auth::{AuthError, Authenticator, TOKEN_LIFETIME, Token};
pub use client::{DEFAULT_BASE_URL, DEFAULT_MAX_PAGES, TvdbClient};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, ReqwestTransport, TransportError};

#[cfg(test)]
pub(crate) use transport::mock;

use serde::{Deserialize, Serialize};

/// A single episode of a TV series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Provider identifier of the series this episode belongs to
    pub series_id: String,
    /// The season number (0 for specials)
    pub season_number: u32,
    /// The episode number within the season
    pub episode_number: u32,
    /// The episode title, empty when the provider has none
    pub episode_name: String,
    /// Original air date in provider format, empty when unknown
    pub air_date: String,
}

/// Trait for sources that can list every episode of a series.
///
/// Implementors never fail outright: an unreachable or misconfigured
/// source yields an empty (or partial) list and logs the reason.
pub trait EpisodeSource {
    /// Fetches all known episodes of the series, in provider order.
    ///
    /// # Arguments
    ///
    /// * `series_id` - The provider's identifier for the series
    fn fetch_series_episodes(&mut self, series_id: &str) -> Vec<Episode>;
}
