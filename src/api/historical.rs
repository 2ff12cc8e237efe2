use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A team row from a past season's teams.csv
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalTeam {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
}

/// A fixture row from a past season's fixtures.csv
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalFixture {
    pub team_h: u32,
    pub team_a: u32,
    pub team_h_score: Option<f64>,
    pub team_a_score: Option<f64>,
}

impl HistoricalFixture {
    pub fn score(&self) -> Option<(u32, u32)> {
        Some((self.team_h_score? as u32, self.team_a_score? as u32))
    }
}

/// Teams and results of one completed season
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonHistory {
    pub teams: Vec<HistoricalTeam>,
    pub fixtures: Vec<HistoricalFixture>,
}

impl SeasonHistory {
    pub fn team_name(&self, id: u32) -> Option<&str> {
        self.teams
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.as_str())
    }
}

/// Client for the community-maintained CSV archive of past FPL seasons
pub struct HistoricalDataClient {
    base_url: String,
    client: reqwest::Client,
}

impl HistoricalDataClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_csv(&self, season: &str, file: &str) -> Result<String> {
        let url = format!("{}/{}/{}", self.base_url, season, file);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Season archive returned error for {}: {}", url, response.status());
        }

        Ok(response.text().await?)
    }

    /// Fetch fixtures.csv and teams.csv for a season such as "2024-25"
    pub async fn fetch_season(&self, season: &str) -> Result<SeasonHistory> {
        let fixtures = parse_fixtures_csv(&self.fetch_csv(season, "fixtures.csv").await?)?;
        let teams = parse_teams_csv(&self.fetch_csv(season, "teams.csv").await?)?;
        info!(
            "Loaded {} fixtures and {} teams for season {}",
            fixtures.len(),
            teams.len(),
            season
        );
        Ok(SeasonHistory { teams, fixtures })
    }
}

pub fn parse_fixtures_csv(data: &str) -> Result<Vec<HistoricalFixture>> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let mut fixtures = Vec::new();
    for record in reader.deserialize() {
        let fixture: HistoricalFixture = record.context("Failed to parse fixtures.csv row")?;
        fixtures.push(fixture);
    }
    Ok(fixtures)
}

pub fn parse_teams_csv(data: &str) -> Result<Vec<HistoricalTeam>> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let mut teams = Vec::new();
    for record in reader.deserialize() {
        let team: HistoricalTeam = record.context("Failed to parse teams.csv row")?;
        teams.push(team);
    }
    Ok(teams)
}
