use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.tcgdex.net/v2/it";
pub const DEFAULT_SERIES_ID: &str = "tcgp";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Document store collection holding one profile document per user.
pub const USERS_COLLECTION: &str = "users";
/// Document store collection holding one card-id -> quantity document per user.
pub const COLLECTIONS_COLLECTION: &str = "collections";

pub const ENV_BASE_URL: &str = "TCGP_API_BASE_URL";
pub const ENV_SERIES_ID: &str = "TCGP_SERIES_ID";
pub const ENV_TIMEOUT_SECS: &str = "TCGP_HTTP_TIMEOUT_SECS";

/// Runtime settings for the catalog client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub series_id: String,
    pub timeout: Duration,
    pub max_concurrent_fetches: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            series_id: DEFAULT_SERIES_ID.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

impl Config {
    /// Defaults overridden by `TCGP_API_BASE_URL`, `TCGP_SERIES_ID` and
    /// `TCGP_HTTP_TIMEOUT_SECS` when set. Unparseable timeouts are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(series) = lookup(ENV_SERIES_ID).filter(|v| !v.trim().is_empty()) {
            config.series_id = series.trim().to_string();
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).and_then(|v| v.trim().parse::<u64>().ok()) {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    /// `GET <base>/series/{series_id}` -- the set list.
    pub fn series_url(&self) -> String {
        format!("{}/series/{}", self.base_url, self.series_id)
    }

    /// `GET <base>/sets/{set_id}` -- one set with its cards.
    pub fn set_url(&self, set_id: &str) -> String {
        format!("{}/sets/{}", self.base_url, set_id)
    }
}
