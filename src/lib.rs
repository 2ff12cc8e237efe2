pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;
pub mod utils;

pub use config::AppConfig;
pub use error::FplError;
pub use models::*;

use anyhow::{Context, Result};
use api::fpl_api::{
    finished_fixtures, games_per_team, next_gameweeks, next_unplayed_gameweek, upcoming_fixtures,
};
use api::{FplApiClient, HistoricalDataClient, SeasonHistory};
use chrono::{DateTime, Local};
use scrapers::OddscheckerScraper;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use utils::data::{
    latest_odds_snapshot, load_from_cache, load_odds_snapshot, save_odds_snapshot, save_to_cache,
};
use utils::fdr::{build_team_records, calc_team_strengths, fixture_ratings, TeamFdr};
use utils::player_data::build_player_records;
use utils::predicted_points::{score_gameweek, PlayerPoints};

/// FPL data every report starts from
#[derive(Debug, Clone)]
pub struct SeasonData {
    pub bootstrap: Bootstrap,
    pub fixtures: Vec<Fixture>,
}

/// Predicted points for the coming gameweek(s)
#[derive(Debug, Clone, Serialize)]
pub struct PointsReport {
    pub gameweeks: Vec<u32>,
    pub players: Vec<PlayerPoints>,
    pub odds_file: PathBuf,
}

impl PointsReport {
    /// "7" or "7-8"
    pub fn gameweek_label(&self) -> String {
        self.gameweeks
            .iter()
            .map(|gw| gw.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Fixture difficulty of every team from the next unplayed gameweek
#[derive(Debug, Clone, Serialize)]
pub struct FdrReport {
    pub next_gameweek: u32,
    pub teams: Vec<TeamFdr>,
}

/// All the data the dashboard shows. A report that failed to build is `None`.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub points: Option<PointsReport>,
    pub fdr: Option<FdrReport>,
    pub loaded_at: DateTime<Local>,
}

/// Read `name` from the cache directory when caching is on, otherwise run
/// `fetch` and store its result there
async fn cached<T, F>(config: &AppConfig, name: &str, fetch: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: Future<Output = Result<T>>,
{
    cached_when(config, name, fetch, |_| true).await
}

/// Like `cached`, but a fetched value is only stored when `complete` accepts it
async fn cached_when<T, F, P>(config: &AppConfig, name: &str, fetch: F, complete: P) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: Future<Output = Result<T>>,
    P: FnOnce(&T) -> bool,
{
    let path = config.cache_dir().join(name);
    if config.use_cache && path.exists() {
        debug!("Loading {} from cache", path.display());
        return load_from_cache(&path);
    }
    let value = fetch.await?;
    if !complete(&value) {
        warn!("Not caching {}: incomplete fetch", name);
    } else if let Err(e) = save_to_cache(&value, &path) {
        warn!("Could not cache {}: {:#}", name, e);
    }
    Ok(value)
}

pub async fn load_season(config: &AppConfig) -> Result<SeasonData> {
    let client = FplApiClient::new(&config.fpl_api_base);
    let bootstrap = cached(config, "bootstrap.json", client.fetch_bootstrap())
        .await
        .context("Failed to load FPL bootstrap data")?;
    let fixtures = cached(config, "fixtures.json", client.fetch_fixtures())
        .await
        .context("Failed to load FPL fixtures")?;
    Ok(SeasonData {
        bootstrap,
        fixtures,
    })
}

/// Scrape odds for the next gameweek(s) and write a snapshot, returning its path
pub async fn scrape_odds(config: &AppConfig, season: &SeasonData) -> Result<PathBuf> {
    let gameweeks = next_gameweeks(&season.fixtures, config.extra_gameweek)?;
    let fixtures = upcoming_fixtures(&season.fixtures, &gameweeks);
    info!(
        "Scraping {} fixtures for gameweek(s) {:?}",
        fixtures.len(),
        gameweeks
    );

    for (team_id, games) in games_per_team(&fixtures) {
        if games > 1 {
            let name = season
                .bootstrap
                .team(team_id)
                .map(|t| t.name.as_str())
                .unwrap_or("Unknown");
            info!("{} play {} times", name, games);
        }
    }

    let scraper = OddscheckerScraper::new(&config.oddschecker_url, config.request_delay);
    let odds = scraper
        .scrape_gameweek(&fixtures, &season.bootstrap.teams)
        .await?;

    let path = save_odds_snapshot(&odds, &config.fixture_data_dir(), &gameweeks, Local::now())?;
    info!("Saved odds snapshot to {}", path.display());
    Ok(path)
}

/// Predicted points from the newest odds snapshot of the next gameweek(s)
pub async fn compute_points(config: &AppConfig, season: &SeasonData) -> Result<PointsReport> {
    let gameweeks = next_gameweeks(&season.fixtures, config.extra_gameweek)?;
    let odds_file = latest_odds_snapshot(&config.fixture_data_dir(), &gameweeks).with_context(
        || {
            format!(
                "No odds snapshot for gameweek(s) {:?} in {}, scrape first",
                gameweeks,
                config.fixture_data_dir().display()
            )
        },
    )?;
    let odds = load_odds_snapshot(&odds_file)?;
    info!("Using odds from {}", odds_file.display());

    let client = FplApiClient::new(&config.fpl_api_base);
    let ids: Vec<u32> = season.bootstrap.elements.iter().map(|e| e.id).collect();
    let summaries: HashMap<u32, ElementSummary> = cached_when(
        config,
        "element_summaries.json",
        async { Ok::<_, anyhow::Error>(client.fetch_element_summaries(&ids).await) },
        |summaries: &HashMap<u32, ElementSummary>| summaries.len() == ids.len(),
    )
    .await?;

    let records = build_player_records(
        &season.bootstrap,
        &summaries,
        &config.previous_season_name(),
    );
    let players = score_gameweek(records, &odds);

    Ok(PointsReport {
        gameweeks,
        players,
        odds_file,
    })
}

/// Fixture difficulty from last season's results and this season's so far
pub async fn compute_fdr(config: &AppConfig, season: &SeasonData) -> Result<FdrReport> {
    let next_gameweek = next_unplayed_gameweek(&season.fixtures)?;

    let history_client = HistoricalDataClient::new(&config.history_base_url);
    let history: SeasonHistory = match cached(
        config,
        &format!("season_{}.json", config.previous_season),
        history_client.fetch_season(&config.previous_season),
    )
    .await
    {
        Ok(history) => history,
        Err(e) => {
            warn!(
                "Season {} unavailable, rating on this season alone: {:#}",
                config.previous_season, e
            );
            SeasonHistory::default()
        }
    };

    let teams = &season.bootstrap.teams;
    let records = build_team_records(teams, &history, &finished_fixtures(&season.fixtures));
    let strengths = calc_team_strengths(teams, &records);
    let fdr = fixture_ratings(teams, &season.fixtures, &strengths, next_gameweek);

    info!("Rated fixtures for {} teams from gameweek {}", fdr.len(), next_gameweek);
    Ok(FdrReport {
        next_gameweek,
        teams: fdr,
    })
}

/// Build both reports, logging whichever fails
pub async fn fetch_dashboard_data(config: &AppConfig) -> Result<DashboardData> {
    let season = load_season(config).await?;

    let points = match compute_points(config, &season).await {
        Ok(report) => Some(report),
        Err(e) => {
            warn!("Predicted points unavailable: {:#}", e);
            None
        }
    };
    let fdr = match compute_fdr(config, &season).await {
        Ok(report) => Some(report),
        Err(e) => {
            warn!("Fixture difficulty unavailable: {:#}", e);
            None
        }
    };

    Ok(DashboardData {
        points,
        fdr,
        loaded_at: Local::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gameweek_label() {
        let report = PointsReport {
            gameweeks: vec![7, 8],
            players: vec![],
            odds_file: PathBuf::from("gw7-8_all_odds_01-10_12-00.json"),
        };
        assert_eq!(report.gameweek_label(), "7-8");
    }

    #[tokio::test]
    async fn test_cached_reads_existing_file() {
        let dir = std::env::temp_dir().join(format!("fpl_odds_points_lib_{}", std::process::id()));
        let config = AppConfig {
            data_dir: dir.clone(),
            use_cache: true,
            ..AppConfig::default()
        };
        save_to_cache(&vec![3u32, 4], config.cache_dir().join("numbers.json")).unwrap();

        let value: Vec<u32> = cached(&config, "numbers.json", async {
            Err::<Vec<u32>, _>(anyhow::anyhow!("should not be fetched"))
        })
        .await
        .unwrap();
        assert_eq!(value, vec![3, 4]);

        let fresh: Vec<u32> = cached(&config, "fresh.json", async { Ok::<_, anyhow::Error>(vec![9u32]) })
            .await
            .unwrap();
        assert_eq!(fresh, vec![9]);
        assert!(config.cache_dir().join("fresh.json").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_incomplete_or_failed_fetch_is_not_cached() {
        let dir = std::env::temp_dir().join(format!("fpl_odds_points_partial_{}", std::process::id()));
        let config = AppConfig {
            data_dir: dir.clone(),
            use_cache: true,
            ..AppConfig::default()
        };

        let partial: Vec<u32> = cached_when(
            &config,
            "partial.json",
            async { Ok::<_, anyhow::Error>(vec![1u32]) },
            |v: &Vec<u32>| v.len() == 2,
        )
        .await
        .unwrap();
        assert_eq!(partial, vec![1]);
        assert!(!config.cache_dir().join("partial.json").exists());

        let failed: Result<Vec<u32>> = cached(&config, "failed.json", async {
            Err::<Vec<u32>, _>(anyhow::anyhow!("archive unavailable"))
        })
        .await;
        assert!(failed.is_err());
        assert!(!config.cache_dir().join("failed.json").exists());

        let full: Vec<u32> = cached_when(
            &config,
            "full.json",
            async { Ok::<_, anyhow::Error>(vec![1u32, 2]) },
            |v: &Vec<u32>| v.len() == 2,
        )
        .await
        .unwrap();
        assert_eq!(full, vec![1, 2]);
        assert!(config.cache_dir().join("full.json").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    #[ignore] // requires network access
    async fn test_fetch_dashboard_data() {
        let config = AppConfig::default();
        let data = fetch_dashboard_data(&config).await.unwrap();
        assert!(data.fdr.is_some());
    }
}
