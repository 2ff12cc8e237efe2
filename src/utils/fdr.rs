use crate::api::historical::SeasonHistory;
use crate::error::FplError;
use crate::models::{Fixture, Team};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const ELO_START: f64 = 1000.0;
const ELO_K: f64 = 20.0;

/// Per-game rates need more games than this at a venue
const MIN_GAMES_FOR_RATE: u32 = 3;

/// Background colour of a difficulty rating in the ticker tables
pub fn fdr_colour(fdr: u8) -> &'static str {
    match fdr {
        2 => "#00C853",
        4 => "#FFFF00",
        5 => "#D50000",
        _ => "#E0E0E0",
    }
}

pub const SUM_COLOUR: &str = "#FFF9C4";

/// Running results of one team over the seasons fed in
#[derive(Debug, Clone, Serialize)]
pub struct TeamRecord {
    pub elo: f64,
    pub home_elo: f64,
    pub away_elo: f64,
    pub home_games: u32,
    pub away_games: u32,
    pub home_goals: u32,
    pub away_goals: u32,
    pub conceded_home: u32,
    pub conceded_away: u32,
}

impl Default for TeamRecord {
    fn default() -> Self {
        Self {
            elo: ELO_START,
            home_elo: ELO_START,
            away_elo: ELO_START,
            home_games: 0,
            away_games: 0,
            home_goals: 0,
            away_goals: 0,
            conceded_home: 0,
            conceded_away: 0,
        }
    }
}

fn rate(total: u32, games: u32) -> Option<f64> {
    (games > MIN_GAMES_FOR_RATE).then(|| total as f64 / games as f64)
}

impl TeamRecord {
    pub fn goals_per_home_game(&self) -> Option<f64> {
        rate(self.home_goals, self.home_games)
    }

    pub fn goals_per_away_game(&self) -> Option<f64> {
        rate(self.away_goals, self.away_games)
    }

    pub fn conceded_per_home_game(&self) -> Option<f64> {
        rate(self.conceded_home, self.home_games)
    }

    pub fn conceded_per_away_game(&self) -> Option<f64> {
        rate(self.conceded_away, self.away_games)
    }
}

/// Elo expected score of a side rated `rating` against `opponent`
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (10f64.powf(-(rating - opponent) / 400.0) + 1.0)
}

/// Team records keyed by FPL team name
#[derive(Debug, Clone, Default)]
pub struct TeamRecords {
    records: HashMap<String, TeamRecord>,
}

impl TeamRecords {
    pub fn new(teams: &[Team]) -> Self {
        Self {
            records: teams
                .iter()
                .map(|t| (t.name.clone(), TeamRecord::default()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TeamRecord> {
        self.records.get(name)
    }

    /// Update Elo ratings and goal tallies with one result
    pub fn record_result(&mut self, home: &str, away: &str, home_goals: u32, away_goals: u32) {
        let home_rec = self.records.get(home).cloned().unwrap_or_default();
        let away_rec = self.records.get(away).cloned().unwrap_or_default();

        let (actual_home, actual_away) = match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => (1.0, 0.0),
            std::cmp::Ordering::Less => (0.0, 1.0),
            std::cmp::Ordering::Equal => (0.5, 0.5),
        };

        let venue_home = expected_score(home_rec.home_elo, away_rec.away_elo);
        let venue_away = expected_score(away_rec.away_elo, home_rec.home_elo);
        let overall_home = expected_score(home_rec.elo, away_rec.elo);
        let overall_away = expected_score(away_rec.elo, home_rec.elo);

        let home_entry = self.records.entry(home.to_string()).or_default();
        home_entry.home_games += 1;
        home_entry.home_elo += ELO_K * (actual_home - venue_home);
        home_entry.elo += ELO_K * (actual_home - overall_home);
        home_entry.home_goals += home_goals;
        home_entry.conceded_home += away_goals;

        let away_entry = self.records.entry(away.to_string()).or_default();
        away_entry.away_games += 1;
        away_entry.away_elo += ELO_K * (actual_away - venue_away);
        away_entry.elo += ELO_K * (actual_away - overall_away);
        away_entry.away_goals += away_goals;
        away_entry.conceded_away += home_goals;
    }
}

/// Replay last season and then the finished fixtures of this one
pub fn build_team_records(
    teams: &[Team],
    history: &SeasonHistory,
    finished: &[&Fixture],
) -> TeamRecords {
    let mut records = TeamRecords::new(teams);

    for fixture in &history.fixtures {
        let Some((home_goals, away_goals)) = fixture.score() else {
            continue;
        };
        let home = history.team_name(fixture.team_h).unwrap_or("Unknown");
        let away = history.team_name(fixture.team_a).unwrap_or("Unknown");
        records.record_result(home, away, home_goals, away_goals);
    }

    let team_name = |id: u32| {
        teams
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.as_str())
            .unwrap_or("Unknown")
    };
    for fixture in finished {
        let Some((home_goals, away_goals)) = fixture.score() else {
            continue;
        };
        records.record_result(
            team_name(fixture.team_h),
            team_name(fixture.team_a),
            home_goals,
            away_goals,
        );
    }

    records
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StrengthKind {
    Attack,
    Defense,
}

/// Map a per-game rate onto the 2 (easy) to 5 (hard) difficulty scale.
///
/// Attack rates are goals scored, defense rates goals conceded; both are cut
/// into five bands between `min` and `max`. Teams without enough games get 2.
pub fn value_to_strength(value: Option<f64>, min: f64, max: f64, kind: StrengthKind) -> u8 {
    let Some(value) = value else {
        return 2;
    };
    let interval = (max - min) / 5.0;

    match kind {
        StrengthKind::Attack => {
            if value <= (min - 0.25) + interval {
                2
            } else if max - interval <= value && value <= max {
                5
            } else if max - 2.0 * interval <= value && value <= max - interval {
                4
            } else {
                3
            }
        }
        StrengthKind::Defense => {
            if value <= min + interval {
                5
            } else if (max + 0.25) - interval <= value && value <= max + 0.25 {
                2
            } else if min + interval <= value && value <= min + 2.0 * interval {
                4
            } else {
                3
            }
        }
    }
}

/// How hard a team is to face, at home and away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamStrengths {
    pub home_attack: u8,
    pub away_attack: u8,
    pub home_defense: u8,
    pub away_defense: u8,
}

impl Default for TeamStrengths {
    fn default() -> Self {
        Self {
            home_attack: 2,
            away_attack: 2,
            home_defense: 2,
            away_defense: 2,
        }
    }
}

fn bounds(values: impl Iterator<Item = Option<f64>>) -> (f64, f64) {
    values
        .flatten()
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        })
        .unwrap_or((0.0, 0.0))
}

/// Strengths of every current team, keyed by team id
pub fn calc_team_strengths(teams: &[Team], records: &TeamRecords) -> HashMap<u32, TeamStrengths> {
    let current: Vec<(&Team, &TeamRecord)> = teams
        .iter()
        .filter_map(|t| records.get(&t.name).map(|r| (t, r)))
        .collect();

    let (min_goals, max_goals) = bounds(
        current
            .iter()
            .flat_map(|(_, r)| [r.goals_per_home_game(), r.goals_per_away_game()]),
    );
    let (min_conceded, max_conceded) = bounds(
        current
            .iter()
            .flat_map(|(_, r)| [r.conceded_per_home_game(), r.conceded_per_away_game()]),
    );
    debug!(
        "Goals per game range {:.2}-{:.2}, conceded {:.2}-{:.2}",
        min_goals, max_goals, min_conceded, max_conceded
    );

    current
        .into_iter()
        .map(|(team, r)| {
            let strengths = TeamStrengths {
                home_attack: value_to_strength(
                    r.goals_per_home_game(),
                    min_goals,
                    max_goals,
                    StrengthKind::Attack,
                ),
                away_attack: value_to_strength(
                    r.goals_per_away_game(),
                    min_goals,
                    max_goals,
                    StrengthKind::Attack,
                ),
                home_defense: value_to_strength(
                    r.conceded_per_home_game(),
                    min_conceded,
                    max_conceded,
                    StrengthKind::Defense,
                ),
                away_defense: value_to_strength(
                    r.conceded_per_away_game(),
                    min_conceded,
                    max_conceded,
                    StrengthKind::Defense,
                ),
            };
            (team.id, strengths)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Venue {
    Home,
    Away,
}

/// Difficulty of one upcoming fixture from one team's point of view
#[derive(Debug, Clone, Serialize)]
pub struct FixtureRating {
    pub gameweek: u32,
    pub opponent: String,
    pub venue: Venue,
    pub attack: u8,
    pub defense: u8,
}

impl FixtureRating {
    /// Opponent short name, upper case at home and lower case away
    pub fn ticker_label(&self) -> String {
        match self.venue {
            Venue::Home => self.opponent.to_uppercase(),
            Venue::Away => self.opponent.to_lowercase(),
        }
    }

    pub fn rating(&self, kind: StrengthKind) -> u8 {
        match kind {
            StrengthKind::Attack => self.attack,
            StrengthKind::Defense => self.defense,
        }
    }
}

/// Upcoming fixture difficulty of a team
#[derive(Debug, Clone, Serialize)]
pub struct TeamFdr {
    pub team_id: u32,
    pub name: String,
    pub short_name: String,
    pub fixtures: Vec<FixtureRating>,
    pub attack_next_3: u32,
    pub attack_next_5: u32,
    pub defense_next_3: u32,
    pub defense_next_5: u32,
}

impl TeamFdr {
    /// Sum of the ratings over the next `count` fixtures
    pub fn sum(&self, kind: StrengthKind, count: usize) -> u32 {
        self.fixtures
            .iter()
            .take(count)
            .map(|f| f.rating(kind) as u32)
            .sum()
    }
}

/// Rate every remaining fixture from `next_gw` on for every team.
///
/// Attack difficulty is the opponent's defensive strength at its venue, defense
/// difficulty the opponent's attacking strength.
pub fn fixture_ratings(
    teams: &[Team],
    fixtures: &[Fixture],
    strengths: &HashMap<u32, TeamStrengths>,
    next_gw: u32,
) -> Vec<TeamFdr> {
    teams
        .iter()
        .map(|team| {
            let mut upcoming: Vec<&Fixture> = fixtures
                .iter()
                .filter(|f| f.involves(team.id) && f.event.is_some_and(|e| e >= next_gw))
                .collect();
            upcoming.sort_by_key(|f| (f.event, f.kickoff_time));

            let ratings: Vec<FixtureRating> = upcoming
                .into_iter()
                .map(|f| {
                    let (opponent_id, venue) = if f.team_h == team.id {
                        (f.team_a, Venue::Home)
                    } else {
                        (f.team_h, Venue::Away)
                    };
                    let opponent = strengths.get(&opponent_id).copied().unwrap_or_else(|| {
                        warn!("No strengths for team {}", opponent_id);
                        TeamStrengths::default()
                    });
                    let (attack, defense) = match venue {
                        Venue::Home => (opponent.away_defense, opponent.away_attack),
                        Venue::Away => (opponent.home_defense, opponent.home_attack),
                    };
                    FixtureRating {
                        gameweek: f.event.unwrap_or_default(),
                        opponent: teams
                            .iter()
                            .find(|t| t.id == opponent_id)
                            .map(|t| t.short_name.clone())
                            .unwrap_or_else(|| "Unknown".to_string()),
                        venue,
                        attack,
                        defense,
                    }
                })
                .collect();

            let mut fdr = TeamFdr {
                team_id: team.id,
                name: team.name.clone(),
                short_name: team.short_name.clone(),
                fixtures: ratings,
                attack_next_3: 0,
                attack_next_5: 0,
                defense_next_3: 0,
                defense_next_5: 0,
            };
            fdr.attack_next_3 = fdr.sum(StrengthKind::Attack, 3);
            fdr.attack_next_5 = fdr.sum(StrengthKind::Attack, 5);
            fdr.defense_next_3 = fdr.sum(StrengthKind::Defense, 3);
            fdr.defense_next_5 = fdr.sum(StrengthKind::Defense, 5);
            fdr
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct FdrCell {
    pub label: String,
    pub colour: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FdrRow {
    pub team: String,
    pub cells: Vec<FdrCell>,
    pub sum: u32,
}

/// Ticker table: one row per team, one column per gameweek, easiest first
#[derive(Debug, Clone, Serialize)]
pub struct FdrTable {
    pub headers: Vec<String>,
    pub rows: Vec<FdrRow>,
}

pub fn fdr_table(teams: &[TeamFdr], next_gw: u32, gameweeks: usize, kind: StrengthKind) -> FdrTable {
    let gws: Vec<u32> = (next_gw..).take(gameweeks).collect();

    let mut rows: Vec<FdrRow> = teams
        .iter()
        .map(|team| {
            let cells = gws
                .iter()
                .map(|gw| {
                    let games: Vec<&FixtureRating> =
                        team.fixtures.iter().filter(|f| f.gameweek == *gw).collect();
                    match games.first() {
                        Some(first) => FdrCell {
                            label: games
                                .iter()
                                .map(|f| f.ticker_label())
                                .collect::<Vec<_>>()
                                .join(" + "),
                            colour: fdr_colour(first.rating(kind)),
                        },
                        None => FdrCell {
                            label: "-".to_string(),
                            colour: fdr_colour(0),
                        },
                    }
                })
                .collect();
            FdrRow {
                team: team.short_name.clone(),
                cells,
                sum: team.sum(kind, gameweeks),
            }
        })
        .collect();
    rows.sort_by_key(|r| r.sum);

    FdrTable {
        headers: gws.iter().map(|gw| format!("GW {}", gw)).collect(),
        rows,
    }
}

/// A group of teams to rotate between and its summed best-per-gameweek rating
#[derive(Debug, Clone, Serialize)]
pub struct Rotation {
    pub teams: Vec<String>,
    pub fdr_sum: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RotationResult {
    pub attack: Rotation,
    pub defense: Rotation,
}

/// Sum over the first `gws` fixtures of the easiest rating in the group
fn rotation_sum(group: &[&TeamFdr], gws: usize, kind: StrengthKind) -> u32 {
    (0..gws)
        .filter_map(|i| {
            group
                .iter()
                .filter_map(|t| t.fixtures.get(i))
                .map(|f| f.rating(kind) as u32)
                .min()
        })
        .sum()
}

fn best_rotation<'a>(
    groups: impl Iterator<Item = Vec<&'a TeamFdr>>,
    gws: usize,
) -> Option<RotationResult> {
    let mut best_attack: Option<(u32, Vec<&TeamFdr>)> = None;
    let mut best_defense: Option<(u32, Vec<&TeamFdr>)> = None;

    for group in groups {
        let attack = rotation_sum(&group, gws, StrengthKind::Attack);
        let defense = rotation_sum(&group, gws, StrengthKind::Defense);
        if best_attack.as_ref().map_or(true, |(sum, _)| attack < *sum) {
            best_attack = Some((attack, group.clone()));
        }
        if best_defense.as_ref().map_or(true, |(sum, _)| defense < *sum) {
            best_defense = Some((defense, group));
        }
    }

    let to_rotation = |(fdr_sum, group): (u32, Vec<&TeamFdr>)| Rotation {
        teams: group.iter().map(|t| t.name.clone()).collect(),
        fdr_sum,
    };
    Some(RotationResult {
        attack: to_rotation(best_attack?),
        defense: to_rotation(best_defense?),
    })
}

fn find_team<'a>(teams: &'a [TeamFdr], name: &str) -> Result<&'a TeamFdr, FplError> {
    teams
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name) || t.short_name.eq_ignore_ascii_case(name))
        .ok_or_else(|| FplError::UnknownTeam(name.to_string()))
}

/// Best pair of teams to rotate between
pub fn best_rotation_pair(teams: &[TeamFdr], gws: usize) -> Option<RotationResult> {
    let pairs = (0..teams.len())
        .flat_map(|i| (i + 1..teams.len()).map(move |j| vec![&teams[i], &teams[j]]));
    best_rotation(pairs, gws)
}

/// Best trio of teams to rotate between
pub fn best_rotation_trio(teams: &[TeamFdr], gws: usize) -> Option<RotationResult> {
    let n = teams.len();
    let trios = (0..n).flat_map(move |i| {
        (i + 1..n).flat_map(move |j| (j + 1..n).map(move |k| vec![&teams[i], &teams[j], &teams[k]]))
    });
    best_rotation(trios, gws)
}

/// Best team to pair with `team`
pub fn best_partner(teams: &[TeamFdr], gws: usize, team: &str) -> Result<RotationResult, FplError> {
    let anchor = find_team(teams, team)?;
    let groups = teams
        .iter()
        .filter(|t| t.team_id != anchor.team_id)
        .map(|t| vec![anchor, t]);
    best_rotation(groups, gws).ok_or_else(|| FplError::UnknownTeam(team.to_string()))
}

/// Best third team to go with `team1` and `team2`
pub fn best_partner_for_two(
    teams: &[TeamFdr],
    gws: usize,
    team1: &str,
    team2: &str,
) -> Result<RotationResult, FplError> {
    let first = find_team(teams, team1)?;
    let second = find_team(teams, team2)?;
    let groups = teams
        .iter()
        .filter(|t| t.team_id != first.team_id && t.team_id != second.team_id)
        .map(|t| vec![first, second, t]);
    best_rotation(groups, gws).ok_or_else(|| FplError::UnknownTeam(team2.to_string()))
}
