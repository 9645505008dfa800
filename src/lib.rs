//! tvdb_episodes - Complete episode listings for TV series
//!
//! This library fetches the full episode list of a series from TheTVDB and
//! keeps it in a local SQLite cache for 24 hours, so a media library can be
//! checked for missing episodes without hammering the API.

mod cache;
mod catalog;
mod config;
mod tvdb;

pub use cache::{CACHE_TTL, CacheLookup, EpisodeCache};
pub use catalog::EpisodeCatalog;
pub use config::{API_KEY_ENV, Config};
pub use tvdb::{
    ApiRequest, ApiResponse, Authenticator, DEFAULT_BASE_URL, DEFAULT_MAX_PAGES, Episode,
    EpisodeSource, HttpTransport, Method, ReqwestTransport, TOKEN_LIFETIME, Token, TvdbClient,
};

// Re-export error types
pub use cache::CacheError;
pub use config::ConfigError;
pub use tvdb::{AuthError, TransportError};

use thiserror::Error;

/// A catalog talking to TheTVDB over HTTP
pub type TvdbCatalog = EpisodeCatalog<TvdbClient<ReqwestTransport>>;

/// Top-level error type for setting up a catalog
///
/// Lookups themselves never fail; only construction can.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Error while loading configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error while opening the episode cache
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error while setting up the HTTP client
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Builds a catalog from configuration
///
/// Opens the cache at the configured database path (or the default cache
/// location) and prepares a TheTVDB client with the configured API key.
/// A missing API key is not an error here: lookups then only serve what is
/// already cached.
///
/// # Examples
///
/// ```no_run
/// use tvdb_episodes::{Config, open_catalog};
///
/// let config = Config::load().unwrap();
/// let mut catalog = open_catalog(&config).unwrap();
///
/// if let Some(episodes) = catalog.get_series_episodes("81189", false) {
///     for episode in episodes {
///         println!("S{:02}E{:02} {}", episode.season_number, episode.episode_number, episode.episode_name);
///     }
/// }
/// ```
pub fn open_catalog(config: &Config) -> Result<TvdbCatalog, CatalogError> {
    let cache = match &config.database_path {
        Some(path) => EpisodeCache::open(path)?,
        None => EpisodeCache::open_default()?,
    };

    let transport = ReqwestTransport::new(config.request_timeout())?;
    let client = TvdbClient::new(
        transport,
        config.api_key().map(str::to_string),
        &config.base_url,
    )
    .with_max_pages(config.max_pages);

    Ok(EpisodeCatalog::new(client, cache))
}
