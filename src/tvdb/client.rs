//! TheTVDB v4 episode fetcher.
use super::auth::Authenticator;
use super::transport::{ApiRequest, HttpTransport, TransportError};
use super::tvdb_types::{EpisodesPage, TvdbEpisode};
use super::{Episode, EpisodeSource};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Root of TheTVDB v4 API
pub const DEFAULT_BASE_URL: &str = "https://api4.thetvdb.com/v4";

/// Upper bound on pages walked for a single series
pub const DEFAULT_MAX_PAGES: u32 = 1000;

/// Episode ordering requested from the provider (aired order)
const SEASON_TYPE: &str = "default";

/// Errors that end a page request
#[derive(Debug, Error)]
pub(crate) enum RequestError {
    #[error("No authentication token available")]
    NoToken,

    #[error("Token rejected by the API")]
    Unauthorized,

    #[error("Request failed with status {0}")]
    Status(u16),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

/// Client for TheTVDB episode listings.
///
/// Owns the transport and the [`Authenticator`], so the bearer token is
/// shared by every request this client makes.
pub struct TvdbClient<T> {
    transport: T,
    auth: Authenticator,
    base_url: String,
    max_pages: u32,
}

impl<T: HttpTransport> TvdbClient<T> {
    /// Creates a client for the API at `base_url`.
    pub fn new(transport: T, api_key: Option<String>, base_url: &str) -> Self {
        Self {
            transport,
            auth: Authenticator::new(api_key, base_url),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Limits how many pages a single fetch may walk.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// Walks every page of a series' episode listing.
    ///
    /// Stops at the first empty page, at the last page, or at the first
    /// request that fails without recovering. Whatever was collected up to
    /// that point is returned; this never fails outright.
    pub fn fetch_series_episodes(&mut self, series_id: &str) -> Vec<Episode> {
        let endpoint = match self.episodes_url(series_id) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                error!(series_id, "Cannot build episodes URL: {}", e);
                return Vec::new();
            }
        };
        let mut episodes = Vec::new();
        let mut page = 0;

        loop {
            if page >= self.max_pages {
                warn!(
                    series_id,
                    max_pages = self.max_pages,
                    "Page limit reached, returning episodes fetched so far"
                );
                break;
            }

            let body = match self.request_page(&endpoint, page) {
                Ok(body) => body,
                Err(RequestError::NoToken) => {
                    debug!(series_id, page, "No token available, stopping fetch");
                    break;
                }
                Err(e) => {
                    error!(series_id, page, "Episode request failed: {}", e);
                    break;
                }
            };

            let has_next = body.has_next_page();
            let page_episodes = body.into_episodes();
            if page_episodes.is_empty() {
                break;
            }

            episodes.extend(
                page_episodes
                    .into_iter()
                    .map(|episode| convert_episode(series_id, episode)),
            );

            if !has_next {
                break;
            }
            page += 1;
        }

        if !episodes.is_empty() {
            debug!(series_id, count = episodes.len(), "Fetched episodes");
        }
        episodes
    }

    /// Listing URL for a series, with the ID encoded as a single path segment.
    fn episodes_url(&self, series_id: &str) -> Result<String, RequestError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| RequestError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| RequestError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["series", series_id, "episodes", SEASON_TYPE]);

        Ok(url.into())
    }

    /// Requests one page, re-authenticating once if the token is rejected.
    fn request_page(&mut self, endpoint: &str, page: u32) -> Result<EpisodesPage, RequestError> {
        match self.get_page(endpoint, page) {
            Err(RequestError::Unauthorized) => {
                warn!(page, "Token expired, re-authenticating and retrying");
                self.auth.invalidate();

                let retried = self.get_page(endpoint, page);
                if matches!(retried, Err(RequestError::Unauthorized)) {
                    self.auth.invalidate();
                }
                retried
            }
            other => other,
        }
    }

    fn get_page(&mut self, endpoint: &str, page: u32) -> Result<EpisodesPage, RequestError> {
        let token = self
            .auth
            .get_token(&self.transport)
            .ok_or(RequestError::NoToken)?;

        let request = ApiRequest::get(endpoint)
            .bearer(&token.value)
            .query("page", page);
        let response = self.transport.send(&request)?;

        match response.status {
            200 => response
                .json()
                .map_err(|e| RequestError::Parse(e.to_string())),
            401 => Err(RequestError::Unauthorized),
            status => Err(RequestError::Status(status)),
        }
    }
}

impl<T: HttpTransport> EpisodeSource for TvdbClient<T> {
    fn fetch_series_episodes(&mut self, series_id: &str) -> Vec<Episode> {
        TvdbClient::fetch_series_episodes(self, series_id)
    }
}

/// Converts a TheTVDB episode to our Episode, filling in defaults.
fn convert_episode(series_id: &str, episode: TvdbEpisode) -> Episode {
    Episode {
        series_id: series_id.to_string(),
        season_number: episode.season_number.unwrap_or(0),
        episode_number: episode.number.unwrap_or(0),
        episode_name: episode.name.unwrap_or_default(),
        air_date: episode.aired.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tvdb::transport::mock::{MockTransport, episode, episodes_page};
    use serde_json::json;

    fn client(transport: &MockTransport) -> TvdbClient<&MockTransport> {
        TvdbClient::new(transport, Some("key".to_string()), DEFAULT_BASE_URL)
    }

    #[test]
    fn test_pagination_concatenates_pages() {
        let transport = MockTransport::new();
        transport
            .push_login("tok")
            .push(200, episodes_page(json!([episode(1, 1, "Pilot"), episode(1, 2, "Two")]), true))
            .push(200, episodes_page(json!([episode(1, 3, "Three")]), true))
            .push(200, episodes_page(json!([episode(2, 1, "Return")]), false));

        let episodes = client(&transport).fetch_series_episodes("81189");

        let keys: Vec<_> = episodes
            .iter()
            .map(|e| (e.season_number, e.episode_number))
            .collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (1, 3), (2, 1)]);
        assert!(episodes.iter().all(|e| e.series_id == "81189"));

        // login + three pages, nothing more
        assert_eq!(transport.request_count(), 4);
        let pages: Vec<_> = transport.requests()[1..]
            .iter()
            .map(|r| r.query.clone())
            .collect();
        assert_eq!(
            pages,
            vec![
                vec![("page".to_string(), "0".to_string())],
                vec![("page".to_string(), "1".to_string())],
                vec![("page".to_string(), "2".to_string())],
            ]
        );
    }

    #[test]
    fn test_page_requests_carry_bearer_and_endpoint() {
        let transport = MockTransport::new();
        transport
            .push_login("tok")
            .push(200, episodes_page(json!([episode(1, 1, "Pilot")]), false));

        client(&transport).fetch_series_episodes("42");

        let request = &transport.requests()[1];
        assert_eq!(
            request.url,
            format!("{}/series/42/episodes/default", DEFAULT_BASE_URL)
        );
        assert_eq!(request.bearer.as_deref(), Some("tok"));
    }

    #[test]
    fn test_series_id_is_encoded_as_one_segment() {
        let transport = MockTransport::new();
        transport
            .push_login("tok")
            .push(200, episodes_page(json!([episode(1, 1, "Pilot")]), false));

        client(&transport).fetch_series_episodes("a/b?x");

        let request = &transport.requests()[1];
        assert_eq!(
            request.url,
            format!("{}/series/a%2Fb%3Fx/episodes/default", DEFAULT_BASE_URL)
        );
        assert_eq!(request.query, vec![("page".to_string(), "0".to_string())]);
    }

    #[test]
    fn test_invalid_base_url_fetches_nothing() {
        let transport = MockTransport::new();
        let mut client = TvdbClient::new(&transport, Some("key".to_string()), "not a url");

        assert!(client.fetch_series_episodes("1").is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_malformed_episode_keeps_rest_of_page() {
        let transport = MockTransport::new();
        transport
            .push_login("tok")
            .push(
                200,
                episodes_page(
                    json!([
                        episode(1, 1, "Pilot"),
                        episode(1, 2, "Two"),
                        { "seasonNumber": 1, "number": 3.0, "name": "Odd" }
                    ]),
                    true,
                ),
            )
            .push(
                200,
                episodes_page(json!([{ "seasonNumber": "2", "number": -1, "name": 7 }]), false),
            );

        let episodes = client(&transport).fetch_series_episodes("1");

        assert_eq!(episodes.len(), 4);
        assert_eq!(episodes[2].episode_number, 3);
        assert_eq!(episodes[2].episode_name, "Odd");
        assert_eq!(episodes[3].season_number, 2);
        assert_eq!(episodes[3].episode_number, 0);
        assert_eq!(episodes[3].episode_name, "");
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn test_empty_page_stops_even_with_next_link() {
        let transport = MockTransport::new();
        transport
            .push_login("tok")
            .push(200, episodes_page(json!([episode(1, 1, "Pilot")]), true))
            .push(200, episodes_page(json!([]), true))
            .push(200, episodes_page(json!([episode(9, 9, "Never")]), false));

        let episodes = client(&transport).fetch_series_episodes("1");
        assert_eq!(episodes.len(), 1);
        assert_eq!(transport.remaining(), 1);
    }

    #[test]
    fn test_normalization_defaults() {
        let transport = MockTransport::new();
        transport.push_login("tok").push(
            200,
            episodes_page(
                json!([{ "id": 7 }, { "seasonNumber": null, "number": 3, "name": null }]),
                false,
            ),
        );

        let episodes = client(&transport).fetch_series_episodes("1");
        assert_eq!(
            episodes[0],
            Episode {
                series_id: "1".to_string(),
                season_number: 0,
                episode_number: 0,
                episode_name: String::new(),
                air_date: String::new(),
            }
        );
        assert_eq!(episodes[1].season_number, 0);
        assert_eq!(episodes[1].episode_number, 3);
        assert_eq!(episodes[1].episode_name, "");
    }

    #[test]
    fn test_unauthorized_page_is_retried_once_with_new_token() {
        let transport = MockTransport::new();
        transport
            .push_login("old")
            .push(401, json!({ "status": "failure", "message": "Unauthorized" }))
            .push_login("new")
            .push(200, episodes_page(json!([episode(1, 1, "Pilot")]), false));

        let mut client = client(&transport);
        let episodes = client.fetch_series_episodes("1");

        assert_eq!(episodes.len(), 1);
        assert_eq!(
            client.authenticator().current_token().map(|t| t.value.as_str()),
            Some("new")
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[3].bearer.as_deref(), Some("new"));
        assert_eq!(requests[3].query, requests[1].query);
    }

    #[test]
    fn test_repeated_unauthorized_returns_earlier_pages() {
        let transport = MockTransport::new();
        transport
            .push_login("one")
            .push(200, episodes_page(json!([episode(1, 1, "Pilot")]), true))
            .push(401, json!({}))
            .push_login("two")
            .push(401, json!({}));

        let mut client = client(&transport);
        let episodes = client.fetch_series_episodes("1");

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].episode_name, "Pilot");
        assert!(client.authenticator().current_token().is_none());
        assert_eq!(transport.request_count(), 5);
    }

    #[test]
    fn test_unauthorized_on_first_page_returns_empty() {
        let transport = MockTransport::new();
        transport
            .push_login("one")
            .push(401, json!({}))
            .push_login("two")
            .push(401, json!({}));

        assert!(client(&transport).fetch_series_episodes("1").is_empty());
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn test_failed_relogin_after_unauthorized_returns_earlier_pages() {
        let transport = MockTransport::new();
        transport
            .push_login("one")
            .push(200, episodes_page(json!([episode(1, 1, "Pilot")]), true))
            .push(401, json!({}))
            .push(200, json!({ "status": "failure", "message": "InvalidAPIKey" }))
            .push(200, episodes_page(json!([episode(9, 9, "Never")]), false));

        let mut client = client(&transport);
        let episodes = client.fetch_series_episodes("1");

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].episode_name, "Pilot");
        assert!(client.authenticator().current_token().is_none());
        // login, page 0, page 1 (401), failed login; nothing after that
        assert_eq!(transport.request_count(), 4);
        assert_eq!(transport.remaining(), 1);
    }

    #[test]
    fn test_failed_page_returns_partial_results() {
        let transport = MockTransport::new();
        transport
            .push_login("tok")
            .push(200, episodes_page(json!([episode(1, 1, "Pilot")]), true))
            .push(500, json!({ "status": "failure" }));
        assert_eq!(client(&transport).fetch_series_episodes("1").len(), 1);

        let transport = MockTransport::new();
        transport
            .push_login("tok")
            .push(200, episodes_page(json!([episode(1, 1, "Pilot")]), true))
            .push_transport_error();
        assert_eq!(client(&transport).fetch_series_episodes("1").len(), 1);

        let transport = MockTransport::new();
        transport.push_login("tok").push_raw(200, "not json");
        assert!(client(&transport).fetch_series_episodes("1").is_empty());
    }

    #[test]
    fn test_no_api_key_returns_empty_without_requests() {
        let transport = MockTransport::new();
        let mut client = TvdbClient::new(&transport, None, DEFAULT_BASE_URL);
        assert!(client.fetch_series_episodes("1").is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_page_limit_bounds_the_walk() {
        let transport = MockTransport::new();
        transport.push_login("tok");
        for number in 1..=5 {
            transport.push(200, episodes_page(json!([episode(1, number, "Loop")]), true));
        }

        let episodes = client(&transport)
            .with_max_pages(3)
            .fetch_series_episodes("1");

        assert_eq!(episodes.len(), 3);
        assert_eq!(transport.request_count(), 4);
    }
}
