use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// FPL team names that the odds site spells differently
pub const TEAM_NAMES_ODDSCHECKER: [(&str, &str); 3] = [
    ("Nott'm Forest", "Nottingham Forest"),
    ("Wolves", "Wolverhampton"),
    ("Spurs", "Tottenham"),
];

/// Placeholder stored when a match has no link on the league page
pub const LINK_NOT_FOUND: &str = "Link not found";

/// Translate an FPL team name into the name used on the odds site
pub fn odds_team_name(name: &str) -> &str {
    TEAM_NAMES_ODDSCHECKER
        .iter()
        .find(|(fpl, _)| *fpl == name)
        .map(|(_, odds)| *odds)
        .unwrap_or(name)
}

/// A Premier League team from the bootstrap endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub strength: u32,
}

impl Team {
    pub fn odds_name(&self) -> &str {
        odds_team_name(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementType {
    pub id: u32,
    pub singular_name_short: String,
}

/// Playing position of an FPL element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GKP")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "FWD")]
    Forward,
    #[serde(rename = "MNG")]
    Manager,
    Unknown,
}

impl Position {
    pub const PLAYING: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    pub fn from_short_name(short_name: &str) -> Self {
        match short_name.trim().to_ascii_uppercase().as_str() {
            "GKP" => Position::Goalkeeper,
            "DEF" => Position::Defender,
            "MID" => Position::Midfielder,
            "FWD" => Position::Forward,
            "MNG" => Position::Manager,
            _ => Position::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GKP",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
            Position::Manager => "MNG",
            Position::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw FPL player ("element") as served by bootstrap-static
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: u32,
    pub first_name: String,
    pub second_name: String,
    pub web_name: String,
    pub team: u32,
    pub element_type: u32,
    pub now_cost: u32,
    #[serde(default)]
    pub status: String,
    pub chance_of_playing_next_round: Option<u32>,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub saves: u32,
    #[serde(default)]
    pub bps: i32,
    #[serde(default)]
    pub defensive_contribution: u32,
    #[serde(default)]
    pub clearances_blocks_interceptions: u32,
    #[serde(default)]
    pub recoveries: u32,
    #[serde(default)]
    pub tackles: u32,
}

/// The parts of bootstrap-static we use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bootstrap {
    pub teams: Vec<Team>,
    pub elements: Vec<Element>,
    pub element_types: Vec<ElementType>,
}

impl Bootstrap {
    pub fn team(&self, id: u32) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn position_of(&self, element: &Element) -> Position {
        self.element_types
            .iter()
            .find(|et| et.id == element.element_type)
            .map(|et| Position::from_short_name(&et.singular_name_short))
            .unwrap_or(Position::Unknown)
    }
}

/// A fixture from the FPL fixtures endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u32,
    pub event: Option<u32>,
    pub team_h: u32,
    pub team_a: u32,
    pub team_h_score: Option<u32>,
    pub team_a_score: Option<u32>,
    #[serde(default)]
    pub started: Option<bool>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub finished_provisional: bool,
    pub kickoff_time: Option<DateTime<Utc>>,
}

impl Fixture {
    pub fn has_started(&self) -> bool {
        self.started.unwrap_or(false)
    }

    pub fn involves(&self, team_id: u32) -> bool {
        self.team_h == team_id || self.team_a == team_id
    }

    /// Final score when the fixture has one
    pub fn score(&self) -> Option<(u32, u32)> {
        Some((self.team_h_score?, self.team_a_score?))
    }
}

/// One appearance in a player's current-season history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub minutes: u32,
}

/// Season totals from a player's previous seasons
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PastSeason {
    pub season_name: String,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub saves: u32,
    #[serde(default)]
    pub bps: i32,
    #[serde(default)]
    pub defensive_contribution: u32,
}

/// Response of element-summary/{id}
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementSummary {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub history_past: Vec<PastSeason>,
}

/// Bookmaker markets scraped for every match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Market {
    PlayerAssists,
    GoalkeeperSaves,
    HatTrick,
    TotalHomeGoals,
    TotalAwayGoals,
    AnytimeGoalscorer,
    TwoOrMoreGoals,
}

impl Market {
    pub const ALL: [Market; 7] = [
        Market::PlayerAssists,
        Market::GoalkeeperSaves,
        Market::HatTrick,
        Market::TotalHomeGoals,
        Market::TotalAwayGoals,
        Market::AnytimeGoalscorer,
        Market::TwoOrMoreGoals,
    ];

    /// Section title on the odds site, also the key in odds snapshots
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::PlayerAssists => "Player Assists",
            Market::GoalkeeperSaves => "Goalkeeper Saves",
            Market::HatTrick => "To Score A Hat-Trick",
            Market::TotalHomeGoals => "Total Home Goals",
            Market::TotalAwayGoals => "Total Away Goals",
            Market::AnytimeGoalscorer => "Anytime Goalscorer",
            Market::TwoOrMoreGoals => "To Score 2 Or More Goals",
        }
    }

    pub fn from_title(title: &str) -> Option<Self> {
        let title = title.trim();
        Market::ALL.into_iter().find(|m| m.as_str() == title)
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome name -> decimal odds from every bookmaker
pub type MarketOdds = BTreeMap<String, Vec<f64>>;

/// Everything scraped for a single match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOdds {
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_position: u32,
    #[serde(default)]
    pub away_position: u32,
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(flatten)]
    pub markets: BTreeMap<String, MarketOdds>,
}

impl MatchOdds {
    pub fn new(home: &Team, away: &Team) -> Self {
        Self {
            home_team: home.odds_name().to_string(),
            away_team: away.odds_name().to_string(),
            home_position: home.position,
            away_position: away.position,
            link: LINK_NOT_FOUND.to_string(),
            markets: BTreeMap::new(),
        }
    }

    pub fn title(&self) -> String {
        format!("{} v {}", self.home_team, self.away_team)
    }

    pub fn has_link(&self) -> bool {
        self.link != LINK_NOT_FOUND
    }

    pub fn market(&self, market: Market) -> Option<&MarketOdds> {
        self.markets.get(market.as_str())
    }
}

/// Snapshot of all matches in the scraped gameweek(s), keyed by "Home v Away"
pub type GameweekOdds = BTreeMap<String, MatchOdds>;
