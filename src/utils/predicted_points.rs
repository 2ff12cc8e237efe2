use crate::models::{odds_team_name, GameweekOdds, Market, MatchOdds, Position};
use crate::utils::name_matching::{MatchMethod, PlayerMatcher};
use crate::utils::odds::{implied_probability, normal_cdf, BOOKMAKER_MARGIN};
use crate::utils::player_data::PlayerRecord;
use crate::utils::probabilities::{parse_over_outcome, GoalDistribution, PlayerProjection};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Defensive contributions needed for the DC bonus
const DC_THRESHOLD_DEFENDER: f64 = 10.0;
const DC_THRESHOLD_OTHERS: f64 = 12.0;

/// A row of the predicted points table
#[derive(Debug, Clone, Serialize)]
pub struct PlayerPoints {
    #[serde(rename = "Player")]
    pub name: String,
    #[serde(rename = "Position")]
    pub position: Position,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Games")]
    pub games: usize,
    #[serde(rename = "Opponents")]
    pub opponents: String,
    #[serde(rename = "Minutes")]
    pub minutes: u32,
    #[serde(rename = "Chance of Playing")]
    pub chance_of_playing: f64,
    #[serde(rename = "xG")]
    pub expected_goals: f64,
    #[serde(rename = "xA")]
    pub expected_assists: f64,
    #[serde(rename = "xSaves")]
    pub expected_saves: f64,
    #[serde(rename = "Clean Sheet Probability")]
    pub clean_sheets: f64,
    #[serde(rename = "Goals Conceded")]
    pub goals_conceded: f64,
    #[serde(rename = "Estimated BPS")]
    pub estimated_bps: f64,
    #[serde(rename = "Average DC points")]
    pub dc_points: f64,
    #[serde(rename = "Average Save points")]
    pub save_points: f64,
    #[serde(rename = "xP")]
    pub predicted_points: f64,
    #[serde(rename = "Matched By")]
    pub matched_by: String,
}

/// Which rows of the table to show
#[derive(Debug, Clone)]
pub struct PointsFilter {
    pub positions: Vec<Position>,
    pub max_price: f64,
    pub include_unknown: bool,
}

impl Default for PointsFilter {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            max_price: 20.0,
            include_unknown: false,
        }
    }
}

impl PointsFilter {
    pub fn matches(&self, player: &PlayerPoints) -> bool {
        if player.position == Position::Unknown {
            return self.include_unknown
                && (self.positions.is_empty() || self.positions.contains(&Position::Unknown));
        }
        (self.positions.is_empty() || self.positions.contains(&player.position))
            && player.price <= self.max_price
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Per-match expectations derived from a player's projection
#[derive(Debug, Clone, Default)]
pub struct Expectations {
    pub goals: Vec<f64>,
    pub assists: Vec<f64>,
    pub saves: Vec<f64>,
}

impl Expectations {
    /// Goals and assists count for outfield and bookmaker-only players,
    /// saves for goalkeepers only
    pub fn from_projection(projection: &PlayerProjection, position: Position) -> Self {
        let outfield = matches!(
            position,
            Position::Defender | Position::Midfielder | Position::Forward | Position::Unknown
        );
        Self {
            goals: if outfield {
                projection.expected_goals()
            } else {
                Vec::new()
            },
            assists: if outfield {
                projection.expected_assists()
            } else {
                Vec::new()
            },
            saves: if position == Position::Goalkeeper {
                projection.expected_saves()
            } else {
                Vec::new()
            },
        }
    }
}

/// Rough bonus point system score for the coming games
pub fn estimated_bps(
    record: &PlayerRecord,
    projection: &PlayerProjection,
    expected: &Expectations,
) -> f64 {
    let xg: f64 = expected.goals.iter().sum();
    let xa: f64 = expected.assists.iter().sum();

    let mut bps = xa * 9.0;
    bps += record.cbi_per_game / 2.0;
    bps += record.recoveries_per_game / 3.0;
    bps += record.tackles_per_game * 2.0;

    if record.minutes_per_game > 60.0 {
        bps += 6.0;
    }

    if record.position == Position::Goalkeeper {
        if expected.saves.is_empty() {
            let combined_saves = if record.prev_saves_p90 > 0.0 {
                (record.saves_per_game + 2.0 * record.prev_saves_p90) / 3.0
            } else {
                record.saves_per_game
            };
            bps += combined_saves * 2.5;
        } else {
            bps += expected.saves.iter().sum::<f64>() * 2.5;
        }
    }

    match record.position {
        Position::Defender | Position::Goalkeeper => {
            bps += projection.clean_sheets.iter().sum::<f64>() * 12.0;
            bps -= projection.goals_conceded.iter().sum::<f64>() * 4.0;
            bps += xg * 12.0;
        }
        Position::Midfielder => bps += xg * 18.0,
        Position::Forward => bps += xg * 24.0,
        _ => {}
    }

    bps
}

/// Expected DC points when contributions follow Normal(mean, mean / 2)
/// truncated to [0, 2 * mean]: two points times P(X >= threshold).
fn expected_dc_points(mean: f64, threshold: f64) -> f64 {
    if mean <= 0.0 {
        return 0.0;
    }
    let std_dev = mean / 2.0;
    let upper = normal_cdf(2.0 * mean, mean, std_dev);
    let lower = normal_cdf(0.0, mean, std_dev);
    let at_threshold = normal_cdf(threshold, mean, std_dev);
    (2.0 * (upper - at_threshold) / (upper - lower)).max(0.0)
}

/// Average defensive contribution points per game, blended 1:2 with the
/// previous season's per-90 rate scaled to current minutes
pub fn defensive_contribution_points(record: &PlayerRecord) -> f64 {
    let threshold = if record.position == Position::Defender {
        DC_THRESHOLD_DEFENDER
    } else {
        DC_THRESHOLD_OTHERS
    };

    let current = expected_dc_points(record.defensive_contributions_per_game, threshold);
    let previous = expected_dc_points(record.prev_defensive_contributions_p90, threshold);

    if previous > 0.0 {
        (current + 2.0 * (record.minutes_per_game / 90.0) * previous) / 3.0
    } else {
        current
    }
}

/// Average points per game from saves (one point per three)
pub fn save_points(record: &PlayerRecord) -> f64 {
    let current = record.saves_per_game / 3.0;
    let previous = record.prev_saves_p90 / 3.0;
    if previous > 0.0 {
        (current + 2.0 * previous) / 3.0
    } else {
        current
    }
}

/// Predicted points over `games` matches, or None when the odds hold more
/// entries than the player has games (a sign of a bad name match).
pub fn predicted_points(
    record: &PlayerRecord,
    projection: &PlayerProjection,
    expected: &Expectations,
    games: usize,
) -> Option<f64> {
    if expected.goals.len() > games
        || expected.assists.len() > games
        || expected.saves.len() > games
    {
        return None;
    }

    let n = games as f64;
    let chance = record.chance_of_playing;
    let xg: f64 = expected.goals.iter().sum();
    let xa: f64 = expected.assists.iter().sum();
    let xs: f64 = expected.saves.iter().sum();
    let cs: f64 = projection.clean_sheets.iter().sum();
    let conceded: f64 = projection.goals_conceded.iter().sum();
    let dc = defensive_contribution_points(record);

    let points = match record.position {
        Position::Midfielder => chance * (2.0 * n + 5.0 * xg + 3.0 * xa + cs + dc),
        Position::Defender => {
            chance * (2.0 * n + 6.0 * xg + 3.0 * xa + 4.0 * cs - conceded / 2.0 + dc)
        }
        Position::Goalkeeper => {
            let mut points = chance * (2.0 * n + xs / 3.0 + 4.0 * cs - conceded / 2.0 + dc);
            if expected.saves.is_empty() {
                points += n * save_points(record);
            }
            points
        }
        Position::Forward => chance * (2.0 * n + 4.0 * xg + 3.0 * xa + dc),
        Position::Unknown => chance * (2.0 * n + 4.0 * xg + 3.0 * xa),
        Position::Manager => 0.0,
    };

    Some(round3(points))
}

/// Joins one gameweek of odds onto the FPL player records
struct GameweekScorer {
    records: Vec<PlayerRecord>,
    projections: Vec<PlayerProjection>,
    methods: Vec<Option<MatchMethod>>,
    matcher: PlayerMatcher,
    unknown: HashMap<String, usize>,
}

impl GameweekScorer {
    fn new(records: Vec<PlayerRecord>) -> Self {
        let matcher = PlayerMatcher::new(records.iter().map(PlayerRecord::match_candidate).collect());
        let n = records.len();
        Self {
            records,
            projections: vec![PlayerProjection::default(); n],
            methods: vec![None; n],
            matcher,
            unknown: HashMap::new(),
        }
    }

    /// Index of the record for a bookmaker name, creating an Unknown record
    /// when no FPL player matches
    fn resolve(&mut self, bookmaker_name: &str, home: &str, away: &str) -> usize {
        if let Some(hit) = self.matcher.find(bookmaker_name, home, away) {
            let method = &mut self.methods[hit.index];
            if method.map_or(true, |m| hit.method < m) {
                *method = Some(hit.method);
            }
            return hit.index;
        }

        if let Some(&index) = self.unknown.get(bookmaker_name) {
            return index;
        }

        debug!("No FPL player found for {:?} ({} v {})", bookmaker_name, home, away);
        self.records.push(PlayerRecord::unknown(bookmaker_name));
        self.projections.push(PlayerProjection::default());
        self.methods.push(None);
        let index = self.records.len() - 1;
        self.unknown.insert(bookmaker_name.to_string(), index);
        index
    }

    fn add_match(&mut self, match_odds: &MatchOdds) {
        let home = odds_team_name(&match_odds.home_team).to_string();
        let away = odds_team_name(&match_odds.away_team).to_string();

        for (record, projection) in self.records.iter().zip(self.projections.iter_mut()) {
            if record.team == home {
                projection.opponents.push(away.clone());
            } else if record.team == away {
                projection.opponents.push(home.clone());
            }
        }

        for market in [Market::PlayerAssists, Market::GoalkeeperSaves] {
            let Some(outcomes) = match_odds.market(market) else {
                continue;
            };
            for (outcome, prices) in outcomes {
                let Some((name, line)) = parse_over_outcome(outcome, market) else {
                    continue;
                };
                let probability = implied_probability(prices, BOOKMAKER_MARGIN);
                let index = self.resolve(&name, &home, &away);
                self.projections[index].add_over_probability(market, line, probability);
            }
        }

        for market in [
            Market::HatTrick,
            Market::AnytimeGoalscorer,
            Market::TwoOrMoreGoals,
        ] {
            let Some(outcomes) = match_odds.market(market) else {
                continue;
            };
            for (name, prices) in outcomes {
                let probability = implied_probability(prices, 0.0);
                let index = self.resolve(name, &home, &away);
                self.projections[index].add_scorer_probability(market, probability);
            }
        }

        let totals = (
            match_odds.market(Market::TotalHomeGoals),
            match_odds.market(Market::TotalAwayGoals),
        );
        if let (Some(home_goals), Some(away_goals)) = totals {
            let home_dist = GoalDistribution::from_market(home_goals);
            let away_dist = GoalDistribution::from_market(away_goals);
            for (record, projection) in self.records.iter().zip(self.projections.iter_mut()) {
                if record.team == home {
                    projection.add_team_outlook(&home_dist, &away_dist);
                } else if record.team == away {
                    projection.add_team_outlook(&away_dist, &home_dist);
                }
            }
        } else {
            debug!("No total goals odds for {}", match_odds.title());
        }
    }

    fn finish(self) -> Vec<PlayerPoints> {
        let mut players = Vec::with_capacity(self.records.len());

        for ((record, projection), method) in self
            .records
            .iter()
            .zip(&self.projections)
            .zip(&self.methods)
        {
            let games = if record.is_unknown() {
                1
            } else {
                projection.opponents.len()
            };
            let expected = Expectations::from_projection(projection, record.position);

            let Some(points) = predicted_points(record, projection, &expected, games) else {
                warn!(
                    "{} skipped: more odds entries than the {} game(s) they play",
                    record.name, games
                );
                continue;
            };

            players.push(PlayerPoints {
                name: record.name.clone(),
                position: record.position,
                team: record.team.clone(),
                price: record.price,
                games,
                opponents: projection.opponents.join(", "),
                minutes: record.minutes,
                chance_of_playing: record.chance_of_playing,
                expected_goals: round3(expected.goals.iter().sum()),
                expected_assists: round3(expected.assists.iter().sum()),
                expected_saves: round3(expected.saves.iter().sum()),
                clean_sheets: round3(projection.clean_sheets.iter().sum()),
                goals_conceded: round3(projection.goals_conceded.iter().sum()),
                estimated_bps: round3(estimated_bps(record, projection, &expected)),
                dc_points: round3(defensive_contribution_points(record)),
                save_points: round3(save_points(record)),
                predicted_points: points,
                matched_by: method.map(|m| m.to_string()).unwrap_or_default(),
            });
        }

        players
    }
}

/// Score every player for the gameweek(s) covered by `odds`, best first
pub fn score_gameweek(records: Vec<PlayerRecord>, odds: &GameweekOdds) -> Vec<PlayerPoints> {
    let mut scorer = GameweekScorer::new(records);
    for match_odds in odds.values() {
        scorer.add_match(match_odds);
    }

    let unknown = scorer.unknown.len();
    let mut players = scorer.finish();
    rank_players(&mut players);
    info!(
        "Scored {} players from {} matches ({} bookmaker-only)",
        players.len(),
        odds.len(),
        unknown
    );
    players
}

/// Sort by predicted points, then minutes played
pub fn rank_players(players: &mut [PlayerPoints]) {
    players.sort_by(|a, b| {
        b.predicted_points
            .partial_cmp(&a.predicted_points)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.minutes.cmp(&a.minutes))
    });
}

pub fn filter_players(players: &[PlayerPoints], filter: &PointsFilter) -> Vec<PlayerPoints> {
    players
        .iter()
        .filter(|p| filter.matches(p))
        .cloned()
        .collect()
}

/// Top player of each playing position in an already ranked list
pub fn best_by_position(players: &[PlayerPoints]) -> Vec<&PlayerPoints> {
    Position::PLAYING
        .iter()
        .filter_map(|pos| players.iter().find(|p| p.position == *pos))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketOdds;
    use std::collections::BTreeMap;

    fn record(name: &str, web_name: &str, position: Position, team: &str) -> PlayerRecord {
        let mut record = PlayerRecord::unknown(name);
        record.id = Some(1);
        record.web_name = web_name.to_string();
        record.position = position;
        record.team = team.to_string();
        record.price = 6.0;
        record
    }

    fn market(entries: &[(&str, &[f64])]) -> MarketOdds {
        entries
            .iter()
            .map(|(name, odds)| (name.to_string(), odds.to_vec()))
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_defensive_contribution_points() {
        let mut def = record("Gabriel Magalhaes", "Gabriel", Position::Defender, "Arsenal");
        assert_eq!(defensive_contribution_points(&def), 0.0);

        def.defensive_contributions_per_game = 10.0;
        // threshold at the mean: half the truncated mass lies above it
        assert!(close(defensive_contribution_points(&def), 1.0));

        let mut mid = def.clone();
        mid.position = Position::Midfielder;
        assert!(defensive_contribution_points(&mid) < defensive_contribution_points(&def));

        def.prev_defensive_contributions_p90 = 10.0;
        def.minutes_per_game = 90.0;
        assert!(close(defensive_contribution_points(&def), 1.0));
    }

    #[test]
    fn test_save_points() {
        let mut gk = record("Jordan Pickford", "Pickford", Position::Goalkeeper, "Everton");
        gk.saves_per_game = 3.0;
        assert!(close(save_points(&gk), 1.0));
        gk.prev_saves_p90 = 4.5;
        assert!(close(save_points(&gk), (1.0 + 3.0) / 3.0));
    }

    #[test]
    fn test_midfielder_points() {
        let mut mid = record("Bukayo Saka", "Saka", Position::Midfielder, "Arsenal");
        mid.chance_of_playing = 1.0;
        let projection = PlayerProjection {
            opponents: vec!["Chelsea".to_string()],
            anytime: vec![0.4],
            clean_sheets: vec![0.5],
            ..Default::default()
        };
        let expected = Expectations::from_projection(&projection, mid.position);
        let points = predicted_points(&mid, &projection, &expected, 1).unwrap();
        assert!(close(points, 2.0 + 5.0 * 0.4 + 0.5));
    }

    #[test]
    fn test_defender_points() {
        let mut def = record("Gabriel Magalhaes", "Gabriel", Position::Defender, "Arsenal");
        def.chance_of_playing = 1.0;
        let mut projection = PlayerProjection {
            opponents: vec!["Chelsea".to_string()],
            anytime: vec![0.1],
            clean_sheets: vec![0.4],
            goals_conceded: vec![1.2],
            ..Default::default()
        };
        projection.assists_over[0].push(0.2);
        let expected = Expectations::from_projection(&projection, def.position);
        let points = predicted_points(&def, &projection, &expected, 1).unwrap();
        assert!(close(points, 2.0 + 6.0 * 0.1 + 3.0 * 0.2 + 4.0 * 0.4 - 1.2 / 2.0));
    }

    #[test]
    fn test_forward_points() {
        let mut fwd = record("Erling Haaland", "Haaland", Position::Forward, "Man City");
        fwd.chance_of_playing = 1.0;
        // mean at the threshold: one DC point on average
        fwd.defensive_contributions_per_game = 12.0;
        let mut projection = PlayerProjection {
            opponents: vec!["Everton".to_string()],
            anytime: vec![0.5],
            two_or_more: vec![0.2],
            // clean sheets earn a forward nothing
            clean_sheets: vec![0.4],
            ..Default::default()
        };
        projection.assists_over[0].push(0.3);
        let expected = Expectations::from_projection(&projection, fwd.position);
        assert!(close(expected.goals[0], 0.7));
        let points = predicted_points(&fwd, &projection, &expected, 1).unwrap();
        assert!(close(points, 2.0 + 4.0 * 0.7 + 3.0 * 0.3 + 1.0));
    }

    #[test]
    fn test_manager_scores_nothing() {
        let mut manager = record("Mikel Arteta", "Arteta", Position::Manager, "Arsenal");
        manager.chance_of_playing = 1.0;
        let projection = PlayerProjection {
            opponents: vec!["Chelsea".to_string()],
            anytime: vec![0.3],
            clean_sheets: vec![0.4],
            ..Default::default()
        };
        let expected = Expectations::from_projection(&projection, manager.position);
        assert!(expected.goals.is_empty());
        assert_eq!(predicted_points(&manager, &projection, &expected, 1), Some(0.0));
    }

    #[test]
    fn test_goalkeeper_with_save_odds() {
        let mut gk = record("Jordan Pickford", "Pickford", Position::Goalkeeper, "Everton");
        gk.chance_of_playing = 1.0;
        gk.saves_per_game = 3.0;
        let mut projection = PlayerProjection {
            opponents: vec!["Arsenal".to_string()],
            clean_sheets: vec![0.3],
            goals_conceded: vec![1.0],
            ..Default::default()
        };
        projection.saves_over[0].push(0.9);
        projection.saves_over[1].push(0.6);
        let expected = Expectations::from_projection(&projection, gk.position);
        // 0.3 at one save, the remaining 0.6 at two
        assert!(close(expected.saves[0], 1.5));
        let points = predicted_points(&gk, &projection, &expected, 1).unwrap();
        // no per-game save points on top of the odds
        assert!(close(points, 2.0 + 1.5 / 3.0 + 4.0 * 0.3 - 1.0 / 2.0));
    }

    #[test]
    fn test_goalkeeper_ignores_scorer_markets() {
        let mut gk = record("Jordan Pickford", "Pickford", Position::Goalkeeper, "Everton");
        gk.chance_of_playing = 1.0;
        let mut projection = PlayerProjection {
            opponents: vec!["Arsenal".to_string()],
            anytime: vec![0.02, 0.02],
            clean_sheets: vec![0.3],
            goals_conceded: vec![1.0],
            ..Default::default()
        };
        projection.assists_over[0].push(0.1);

        let expected = Expectations::from_projection(&projection, gk.position);
        assert!(expected.goals.is_empty());
        assert!(expected.assists.is_empty());
        assert!(close(estimated_bps(&gk, &projection, &expected), 0.3 * 12.0 - 4.0));
        let points = predicted_points(&gk, &projection, &expected, 1).unwrap();
        assert!(close(points, 2.0 + 4.0 * 0.3 - 0.5));

        // save odds only count for goalkeepers
        projection.saves_over[0].push(0.9);
        let outfield = Expectations::from_projection(&projection, Position::Defender);
        assert!(outfield.saves.is_empty());
        assert_eq!(outfield.goals.len(), 2);
    }

    #[test]
    fn test_partial_minutes_scale_previous_dc() {
        let mut def = record("Ben White", "White", Position::Defender, "Arsenal");
        def.defensive_contributions_per_game = 10.0;
        def.prev_defensive_contributions_p90 = 10.0;
        def.minutes_per_game = 45.0;
        assert!(close(defensive_contribution_points(&def), (1.0 + 2.0 * 0.5 * 1.0) / 3.0));
    }

    #[test]
    fn test_goalkeeper_falls_back_to_save_points() {
        let mut gk = record("Jordan Pickford", "Pickford", Position::Goalkeeper, "Everton");
        gk.chance_of_playing = 0.5;
        gk.saves_per_game = 3.0;
        let projection = PlayerProjection {
            opponents: vec!["Arsenal".to_string(), "Chelsea".to_string()],
            ..Default::default()
        };
        let expected = Expectations::default();
        let points = predicted_points(&gk, &projection, &expected, 2).unwrap();
        assert!(close(points, 0.5 * 4.0 + 2.0));
    }

    #[test]
    fn test_more_entries_than_games_is_skipped() {
        let fwd = record("Erling Haaland", "Haaland", Position::Forward, "Man City");
        let expected = Expectations {
            goals: vec![0.8, 0.7],
            ..Default::default()
        };
        assert!(predicted_points(&fwd, &PlayerProjection::default(), &expected, 1).is_none());
        assert!(predicted_points(&fwd, &PlayerProjection::default(), &expected, 2).is_some());

        let assists = Expectations {
            assists: vec![0.3, 0.2],
            ..Default::default()
        };
        assert!(predicted_points(&fwd, &PlayerProjection::default(), &assists, 1).is_none());

        let gk = record("Jordan Pickford", "Pickford", Position::Goalkeeper, "Everton");
        let saves = Expectations {
            saves: vec![3.0, 2.5],
            ..Default::default()
        };
        assert!(predicted_points(&gk, &PlayerProjection::default(), &saves, 1).is_none());
    }

    #[test]
    fn test_goalkeeper_in_scorer_market_stays_in_table() {
        let records = vec![record("Jordan Pickford", "Pickford", Position::Goalkeeper, "Everton")];
        let mut markets = BTreeMap::new();
        markets.insert(
            Market::AnytimeGoalscorer.as_str().to_string(),
            market(&[("Jordan Pickford", &[50.0][..])]),
        );
        let mut odds = GameweekOdds::new();
        odds.insert(
            "Everton v Arsenal".to_string(),
            MatchOdds {
                home_team: "Everton".to_string(),
                away_team: "Arsenal".to_string(),
                home_position: 14,
                away_position: 1,
                link: "https://example.com/everton-v-arsenal".to_string(),
                markets,
            },
        );

        let players = score_gameweek(records, &odds);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].position, Position::Goalkeeper);
        assert_eq!(players[0].games, 1);
        assert_eq!(players[0].expected_goals, 0.0);
    }

    #[test]
    fn test_score_gameweek() {
        let records = vec![
            record("Bukayo Saka", "Saka", Position::Midfielder, "Arsenal"),
            record("David Raya Martín", "Raya", Position::Goalkeeper, "Arsenal"),
            record("Cole Palmer", "Palmer", Position::Midfielder, "Chelsea"),
            record("Erling Haaland", "Haaland", Position::Forward, "Man City"),
        ];

        let mut markets = BTreeMap::new();
        markets.insert(
            Market::AnytimeGoalscorer.as_str().to_string(),
            market(&[
                ("Bukayo Saka", &[2.5, 2.5][..]),
                ("Cole Palmer", &[2.0][..]),
                ("Mystery Man", &[10.0][..]),
            ]),
        );
        markets.insert(
            Market::PlayerAssists.as_str().to_string(),
            market(&[("Bukayo Saka Over 0.5", &[3.8][..])]),
        );
        markets.insert(
            Market::TotalHomeGoals.as_str().to_string(),
            market(&[("Over 0.5", &[1.25][..]), ("Over 1.5", &[2.0][..])]),
        );
        markets.insert(
            Market::TotalAwayGoals.as_str().to_string(),
            market(&[("Over 0.5", &[1.9][..]), ("Over 1.5", &[4.75][..])]),
        );
        let mut odds = GameweekOdds::new();
        odds.insert(
            "Arsenal v Chelsea".to_string(),
            MatchOdds {
                home_team: "Arsenal".to_string(),
                away_team: "Chelsea".to_string(),
                home_position: 1,
                away_position: 4,
                link: "https://example.com/arsenal-v-chelsea".to_string(),
                markets,
            },
        );

        let players = score_gameweek(records, &odds);
        assert_eq!(players.len(), 5);

        let saka = players.iter().find(|p| p.name == "Bukayo Saka").unwrap();
        assert_eq!(saka.games, 1);
        assert_eq!(saka.opponents, "Chelsea");
        assert!(close(saka.expected_goals, 0.4));
        assert!(close(saka.expected_assists, 0.25));
        assert_eq!(saka.matched_by, "name");

        let raya = players.iter().find(|p| p.position == Position::Goalkeeper).unwrap();
        assert!(raya.clean_sheets > 0.0);
        assert!(raya.goals_conceded > 0.0);

        let haaland = players.iter().find(|p| p.name == "Erling Haaland").unwrap();
        assert_eq!(haaland.games, 0);
        assert_eq!(haaland.predicted_points, 0.0);

        let unknown = players.iter().find(|p| p.name == "Mystery Man").unwrap();
        assert_eq!(unknown.position, Position::Unknown);
        assert_eq!(unknown.games, 1);
        assert!(close(unknown.predicted_points, 2.0 + 4.0 * 0.1));

        // ranked best first
        assert!(players
            .windows(2)
            .all(|w| w[0].predicted_points >= w[1].predicted_points));

        let filtered = filter_players(&players, &PointsFilter::default());
        assert_eq!(filtered.len(), 4);
        let best = best_by_position(&players);
        assert_eq!(best.len(), 3);
    }
}
