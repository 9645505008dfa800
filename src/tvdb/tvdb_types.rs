//! TheTVDB v4 API response types for deserialization.
//!
//! These structures mirror the JSON envelopes returned by the login and
//! series episode endpoints. Every field is optional because the provider
//! omits or nulls fields freely, and a malformed field inside one episode
//! falls back to its default instead of failing the whole page.
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Response from `POST /login`.
#[derive(Debug, Deserialize)]
pub(super) struct LoginResponse {
    /// `"success"` when the key was accepted
    pub status: Option<String>,
    pub data: Option<LoginData>,
    /// Human-readable reason on failure
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginData {
    pub token: Option<String>,
}

/// One page from `GET /series/{id}/episodes/{season-type}`.
#[derive(Debug, Deserialize)]
pub(super) struct EpisodesPage {
    pub data: Option<EpisodesData>,
    pub links: Option<PageLinks>,
}

#[derive(Debug, Deserialize)]
pub(super) struct EpisodesData {
    /// Kept raw so each entry is decoded on its own
    pub episodes: Option<Vec<Value>>,
}

/// Pagination links of a listing envelope.
#[derive(Debug, Deserialize)]
pub(super) struct PageLinks {
    /// URL of the next page, `null` on the last one
    pub next: Option<Value>,
}

/// A single episode as delivered by TheTVDB.
#[derive(Debug, Deserialize)]
pub(super) struct TvdbEpisode {
    /// Season number (0 for specials)
    #[serde(rename = "seasonNumber", default, deserialize_with = "lenient_number")]
    pub season_number: Option<u32>,
    /// Episode number within the season
    #[serde(default, deserialize_with = "lenient_number")]
    pub number: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    /// Original air date, `YYYY-MM-DD`
    #[serde(default, deserialize_with = "lenient_string")]
    pub aired: Option<String>,
}

/// Accepts non-negative integers, whole floats and numeric strings.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(number.and_then(|n| u32::try_from(n).ok()))
}

/// Accepts strings only; anything else counts as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

impl EpisodesPage {
    /// Takes the episode list out of the envelope, empty when absent.
    ///
    /// Entries that are not JSON objects are skipped.
    pub fn into_episodes(self) -> Vec<TvdbEpisode> {
        self.data
            .and_then(|d| d.episodes)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect()
    }

    /// Whether the envelope advertises another page.
    pub fn has_next_page(&self) -> bool {
        match self.links.as_ref().and_then(|l| l.next.as_ref()) {
            None | Some(Value::Null) => false,
            Some(Value::String(url)) => !url.is_empty(),
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(fields)) => !fields.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(json: &str) -> EpisodesPage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_next_link_detection() {
        assert!(page(r#"{"links":{"next":"https://x/?page=2"}}"#).has_next_page());
        assert!(!page(r#"{"links":{"next":null}}"#).has_next_page());
        assert!(!page(r#"{"links":{"next":""}}"#).has_next_page());
        assert!(!page(r#"{"links":{}}"#).has_next_page());
        assert!(!page(r#"{}"#).has_next_page());
    }

    #[test]
    fn test_odd_fields_fall_back_to_defaults() {
        let episodes = page(
            r#"{"data":{"episodes":[
                {"seasonNumber":1,"number":3.0,"name":"Whole float"},
                {"seasonNumber":-1,"number":"4","name":42,"aired":false},
                {"seasonNumber":2.5,"number":{"x":1},"aired":"2020-02-02"},
                "not an episode"
            ]}}"#,
        )
        .into_episodes();

        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].season_number, Some(1));
        assert_eq!(episodes[0].number, Some(3));
        assert_eq!(episodes[1].season_number, None);
        assert_eq!(episodes[1].number, Some(4));
        assert_eq!(episodes[1].name, None);
        assert_eq!(episodes[1].aired, None);
        assert_eq!(episodes[2].season_number, None);
        assert_eq!(episodes[2].number, None);
        assert_eq!(episodes[2].aired.as_deref(), Some("2020-02-02"));
    }

    #[test]
    fn test_missing_episode_list_is_empty() {
        assert!(page(r#"{"data":{}}"#).into_episodes().is_empty());
        assert!(page(r#"{"data":{"episodes":null}}"#).into_episodes().is_empty());
        assert!(page(r#"{}"#).into_episodes().is_empty());
    }
}
