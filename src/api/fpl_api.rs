use crate::error::FplError;
use crate::models::{Bootstrap, ElementSummary, Fixture};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const FPL_API_BASE_URL: &str = "https://fantasy.premierleague.com/api";
const MAX_CONCURRENT_REQUESTS: usize = 8;

#[derive(Clone)]
pub struct FplApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl Default for FplApiClient {
    fn default() -> Self {
        Self::new(FPL_API_BASE_URL)
    }
}

impl FplApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("FPL API returned error for {}: {}", url, response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// Teams, players and positions from bootstrap-static
    pub async fn fetch_bootstrap(&self) -> Result<Bootstrap> {
        let bootstrap: Bootstrap = self.get_json("bootstrap-static/").await?;
        info!(
            teams = bootstrap.teams.len(),
            players = bootstrap.elements.len(),
            "Fetched FPL bootstrap data"
        );
        Ok(bootstrap)
    }

    /// Every fixture of the season, played or not
    pub async fn fetch_fixtures(&self) -> Result<Vec<Fixture>> {
        let fixtures: Vec<Fixture> = self.get_json("fixtures/").await?;
        info!(fixtures = fixtures.len(), "Fetched FPL fixtures");
        Ok(fixtures)
    }

    pub async fn fetch_element_summary(&self, element_id: u32) -> Result<ElementSummary> {
        self.get_json(&format!("element-summary/{}/", element_id))
            .await
    }

    /// Fetch the summaries of many players with a bounded number of requests in flight.
    /// Players whose summary cannot be fetched are left out of the map.
    pub async fn fetch_element_summaries(
        &self,
        element_ids: &[u32],
    ) -> HashMap<u32, ElementSummary> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS));
        let mut tasks = JoinSet::new();

        for &id in element_ids {
            let client = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (id, client.fetch_element_summary(id).await)
            });
        }

        let mut summaries = HashMap::with_capacity(element_ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(summary))) => {
                    summaries.insert(id, summary);
                }
                Ok((id, Err(e))) => warn!("Skipping summary for player {}: {:#}", id, e),
                Err(e) => warn!("Summary task failed: {}", e),
            }
        }

        info!(
            "Fetched {} of {} player summaries",
            summaries.len(),
            element_ids.len()
        );
        summaries
    }
}

fn group_by_event(fixtures: &[Fixture]) -> BTreeMap<u32, Vec<&Fixture>> {
    let mut gameweeks: BTreeMap<u32, Vec<&Fixture>> = BTreeMap::new();
    for fixture in fixtures {
        if let Some(event) = fixture.event {
            gameweeks.entry(event).or_default().push(fixture);
        }
    }
    gameweeks
}

/// The first gameweek that still has an unfinished fixture, plus the one after it
/// when `extra_gw` is set.
pub fn next_gameweeks(fixtures: &[Fixture], extra_gw: bool) -> Result<Vec<u32>, FplError> {
    let next = group_by_event(fixtures)
        .into_iter()
        .find(|(_, games)| games.iter().any(|f| !f.finished))
        .map(|(event, _)| event)
        .ok_or(FplError::NoUpcomingGameweek)?;

    debug!("Next gameweek is {}", next);
    if extra_gw {
        Ok(vec![next, next + 1])
    } else {
        Ok(vec![next])
    }
}

/// The first gameweek in which no fixture has been provisionally finished
pub fn next_unplayed_gameweek(fixtures: &[Fixture]) -> Result<u32, FplError> {
    group_by_event(fixtures)
        .into_iter()
        .find(|(_, games)| games.iter().all(|f| !f.finished_provisional))
        .map(|(event, _)| event)
        .ok_or(FplError::NoUpcomingGameweek)
}

/// Fixtures in the given gameweeks that have not kicked off yet
pub fn upcoming_fixtures<'a>(fixtures: &'a [Fixture], gameweeks: &[u32]) -> Vec<&'a Fixture> {
    fixtures
        .iter()
        .filter(|f| f.event.is_some_and(|e| gameweeks.contains(&e)) && !f.has_started())
        .collect()
}

/// Fixtures that count towards form and ratings
pub fn finished_fixtures(fixtures: &[Fixture]) -> Vec<&Fixture> {
    fixtures.iter().filter(|f| f.finished_provisional).collect()
}

/// Number of games each team plays among `fixtures` (doubles count twice)
pub fn games_per_team(fixtures: &[&Fixture]) -> HashMap<u32, usize> {
    let mut games = HashMap::new();
    for fixture in fixtures {
        *games.entry(fixture.team_h).or_insert(0) += 1;
        *games.entry(fixture.team_a).or_insert(0) += 1;
    }
    games
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(id: u32, event: Option<u32>, finished: bool, started: bool) -> Fixture {
        Fixture {
            id,
            event,
            team_h: id,
            team_a: id + 100,
            team_h_score: None,
            team_a_score: None,
            started: Some(started),
            finished,
            finished_provisional: finished,
            kickoff_time: None,
        }
    }

    #[test]
    fn test_next_gameweeks() {
        let fixtures = vec![
            fixture(1, Some(1), true, true),
            fixture(2, Some(1), true, true),
            fixture(3, Some(2), true, true),
            fixture(4, Some(2), false, true),
            fixture(5, Some(3), false, false),
            fixture(6, None, false, false),
        ];
        assert_eq!(next_gameweeks(&fixtures, false).unwrap(), vec![2]);
        assert_eq!(next_gameweeks(&fixtures, true).unwrap(), vec![2, 3]);
        // gameweek 2 has already been partly played
        assert_eq!(next_unplayed_gameweek(&fixtures).unwrap(), 3);
    }

    #[test]
    fn test_no_upcoming_gameweek() {
        let fixtures = vec![fixture(1, Some(38), true, true)];
        assert!(matches!(
            next_gameweeks(&fixtures, false),
            Err(FplError::NoUpcomingGameweek)
        ));
        assert!(next_unplayed_gameweek(&[]).is_err());
    }

    #[test]
    fn test_upcoming_fixtures_skip_started_games() {
        let fixtures = vec![
            fixture(1, Some(5), false, true),
            fixture(2, Some(5), false, false),
            fixture(3, Some(6), false, false),
            fixture(4, Some(7), false, false),
        ];
        let upcoming = upcoming_fixtures(&fixtures, &[5, 6]);
        let ids: Vec<u32> = upcoming.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let games = games_per_team(&upcoming);
        assert_eq!(games[&2], 1);
        assert_eq!(games[&103], 1);
        assert!(!games.contains_key(&1));
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_bootstrap() {
        let client = FplApiClient::default();
        let bootstrap = client.fetch_bootstrap().await.unwrap();
        assert_eq!(bootstrap.teams.len(), 20);
        assert!(!bootstrap.elements.is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_fixtures_and_summary() {
        let client = FplApiClient::default();
        let fixtures = client.fetch_fixtures().await.unwrap();
        assert_eq!(fixtures.len(), 380);
        let summary = client.fetch_element_summary(1).await.unwrap();
        println!("history entries: {}", summary.history.len());
    }
}
