use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_FPL_API_BASE: &str = "https://fantasy.premierleague.com/api";
const DEFAULT_ODDSCHECKER_URL: &str = "https://www.oddschecker.com/football/english/premier-league/";
const DEFAULT_HISTORY_BASE: &str =
    "https://raw.githubusercontent.com/vaastav/Fantasy-Premier-League/master/data";
const DEFAULT_PREVIOUS_SEASON: &str = "2024-25";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Runtime settings, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub fpl_api_base: String,
    pub oddschecker_url: String,
    pub history_base_url: String,
    pub previous_season: String,
    pub data_dir: PathBuf,
    pub use_cache: bool,
    pub extra_gameweek: bool,
    pub bind_addr: String,
    pub request_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fpl_api_base: DEFAULT_FPL_API_BASE.to_string(),
            oddschecker_url: DEFAULT_ODDSCHECKER_URL.to_string(),
            history_base_url: DEFAULT_HISTORY_BASE.to_string(),
            previous_season: DEFAULT_PREVIOUS_SEASON.to_string(),
            data_dir: PathBuf::from("data"),
            use_cache: false,
            extra_gameweek: false,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            request_delay: Duration::from_millis(1500),
        }
    }
}

impl AppConfig {
    /// Build the config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str| lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        Self {
            fpl_api_base: lookup("FPL_API_BASE").unwrap_or(defaults.fpl_api_base),
            oddschecker_url: lookup("ODDSCHECKER_URL").unwrap_or(defaults.oddschecker_url),
            history_base_url: lookup("HISTORY_BASE_URL").unwrap_or(defaults.history_base_url),
            previous_season: lookup("PREVIOUS_SEASON").unwrap_or(defaults.previous_season),
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            use_cache: flag("USE_CACHE").unwrap_or(defaults.use_cache),
            extra_gameweek: flag("EXTRA_GAMEWEEK").unwrap_or(defaults.extra_gameweek),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            request_delay: lookup("REQUEST_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_delay),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// The previous season as FPL names it in `history_past` ("2024/25")
    pub fn previous_season_name(&self) -> String {
        self.previous_season.replace('-', "/")
    }

    /// Where odds snapshots are written
    pub fn fixture_data_dir(&self) -> PathBuf {
        self.data_dir.join("fixture_data")
    }
}
