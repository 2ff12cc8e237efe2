use crate::models::{Bootstrap, Element, ElementSummary, Position};
use crate::utils::name_matching::MatchCandidate;
use serde::Serialize;
use std::collections::HashMap;

/// Previous-season numbers only count above this many minutes
const PREVIOUS_SEASON_MIN_MINUTES: u32 = 900;

/// Per-player inputs to the points formula
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRecord {
    pub id: Option<u32>,
    pub name: String,
    pub web_name: String,
    pub position: Position,
    /// Team name as spelled on the odds site, "Unknown" for bookmaker-only players
    pub team: String,
    pub price: f64,
    pub minutes: u32,
    pub games: u32,
    pub minutes_per_game: f64,
    pub chance_of_playing: f64,
    pub defensive_contributions_per_game: f64,
    pub cbi_per_game: f64,
    pub recoveries_per_game: f64,
    pub tackles_per_game: f64,
    pub bps_per_game: f64,
    pub saves_per_game: f64,
    pub prev_defensive_contributions_p90: f64,
    pub prev_bps_p90: f64,
    pub prev_saves_p90: f64,
}

fn per_game(total: f64, games: u32) -> f64 {
    if games > 0 {
        total / games as f64
    } else {
        0.0
    }
}

fn per_90(total: f64, minutes: u32) -> f64 {
    if minutes > PREVIOUS_SEASON_MIN_MINUTES {
        total / (minutes as f64 / 90.0)
    } else {
        0.0
    }
}

/// `chance_of_playing_next_round` as a fraction. When FPL has not set it the
/// status decides: available or doubtful counts as certain, anything else as out.
pub fn chance_of_playing(element: &Element) -> f64 {
    match element.chance_of_playing_next_round {
        Some(pct) if pct > 0 => pct as f64 / 100.0,
        _ if matches!(element.status.as_str(), "a" | "d") => 1.0,
        _ => 0.0,
    }
}

impl PlayerRecord {
    pub fn from_element(
        element: &Element,
        summary: Option<&ElementSummary>,
        position: Position,
        team: &str,
        previous_season: &str,
    ) -> Self {
        let games = summary
            .map(|s| s.history.iter().filter(|h| h.minutes > 0).count() as u32)
            .unwrap_or(0);

        let previous = summary.and_then(|s| {
            s.history_past
                .iter()
                .find(|season| season.season_name == previous_season)
        });
        let (prev_minutes, prev_dc, prev_bps, prev_saves) = previous
            .map(|p| {
                (
                    p.minutes,
                    p.defensive_contribution as f64,
                    p.bps as f64,
                    p.saves as f64,
                )
            })
            .unwrap_or_default();

        let is_keeper = position == Position::Goalkeeper;

        Self {
            id: Some(element.id),
            name: format!("{} {}", element.first_name, element.second_name),
            web_name: element.web_name.clone(),
            position,
            team: team.to_string(),
            price: element.now_cost as f64 / 10.0,
            minutes: element.minutes,
            games,
            minutes_per_game: per_game(element.minutes as f64, games),
            chance_of_playing: chance_of_playing(element),
            defensive_contributions_per_game: per_game(element.defensive_contribution as f64, games),
            cbi_per_game: per_game(element.clearances_blocks_interceptions as f64, games),
            recoveries_per_game: per_game(element.recoveries as f64, games),
            tackles_per_game: per_game(element.tackles as f64, games),
            bps_per_game: per_game(element.bps as f64, games),
            saves_per_game: if is_keeper {
                per_game(element.saves as f64, games)
            } else {
                0.0
            },
            prev_defensive_contributions_p90: per_90(prev_dc, prev_minutes),
            prev_bps_p90: per_90(prev_bps, prev_minutes),
            prev_saves_p90: if is_keeper {
                per_90(prev_saves, prev_minutes)
            } else {
                0.0
            },
        }
    }

    /// A player the bookmaker lists but FPL does not know about
    pub fn unknown(bookmaker_name: &str) -> Self {
        Self {
            id: None,
            name: bookmaker_name.to_string(),
            web_name: bookmaker_name.to_string(),
            position: Position::Unknown,
            team: "Unknown".to_string(),
            price: 0.0,
            minutes: 0,
            games: 0,
            minutes_per_game: 0.0,
            chance_of_playing: 1.0,
            defensive_contributions_per_game: 0.0,
            cbi_per_game: 0.0,
            recoveries_per_game: 0.0,
            tackles_per_game: 0.0,
            bps_per_game: 0.0,
            saves_per_game: 0.0,
            prev_defensive_contributions_p90: 0.0,
            prev_bps_p90: 0.0,
            prev_saves_p90: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.id.is_none()
    }

    pub fn match_candidate(&self) -> MatchCandidate {
        MatchCandidate::new(&self.name, &self.web_name, &self.team)
    }
}

/// One record per FPL player. Players without a summary get zero games.
/// `previous_season` is the `history_past` season blended into the estimates.
pub fn build_player_records(
    bootstrap: &Bootstrap,
    summaries: &HashMap<u32, ElementSummary>,
    previous_season: &str,
) -> Vec<PlayerRecord> {
    bootstrap
        .elements
        .iter()
        .map(|element| {
            let team = bootstrap
                .team(element.team)
                .map(|t| t.odds_name().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            PlayerRecord::from_element(
                element,
                summaries.get(&element.id),
                bootstrap.position_of(element),
                &team,
                previous_season,
            )
        })
        .collect()
}
