use crate::models::{Market, MarketOdds};
use crate::utils::odds::{implied_probability, BOOKMAKER_MARGIN};
use serde::Serialize;

/// Over lines quoted for player assists
pub const ASSIST_LINES: usize = 3;
/// Over lines quoted for goalkeeper saves
pub const SAVE_LINES: usize = 10;
/// Over lines used for a team's total goals
const GOAL_LINES: usize = 6;

/// Probability of a team scoring exactly 0..=6 goals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalDistribution {
    pub probs: [f64; 7],
}

/// P(exactly k) from P(over k-0.5) and P(over k+0.5). A missing upper line
/// leaves the lower probability as is. Inverted lines are not corrected.
fn exact_from_over(lower: f64, upper: f64) -> f64 {
    if lower != 0.0 && upper != 0.0 {
        lower - upper
    } else {
        lower
    }
}

impl GoalDistribution {
    /// Build from a "Total Home Goals"/"Total Away Goals" market with outcomes
    /// "Over 0.5" .. "Over 5.5"
    pub fn from_market(odds: &MarketOdds) -> Self {
        let mut over = [0.0; GOAL_LINES];
        for (i, slot) in over.iter_mut().enumerate() {
            let outcome = format!("Over {}.5", i);
            if let Some(prices) = odds.get(&outcome) {
                *slot = implied_probability(prices, BOOKMAKER_MARGIN);
            }
        }
        Self::from_over_probabilities(over)
    }

    pub fn from_over_probabilities(over: [f64; GOAL_LINES]) -> Self {
        let mut probs = [0.0; 7];
        probs[0] = if over[0] != 0.0 { 1.0 - over[0] } else { 0.0 };
        for k in 1..GOAL_LINES {
            probs[k] = exact_from_over(over[k - 1], over[k]);
        }
        probs[6] = over[5];
        Self { probs }
    }

    pub fn expected_goals(&self) -> f64 {
        self.probs
            .iter()
            .enumerate()
            .map(|(k, p)| k as f64 * p)
            .sum()
    }

    pub fn zero_goals(&self) -> f64 {
        self.probs[0]
    }
}

/// Clean sheet probability for the side facing `opponent`: the mean of the
/// bookmaker's zero-goal probability and a Poisson zero at the opponent's mean.
pub fn clean_sheet_probability(opponent: &GoalDistribution) -> f64 {
    (opponent.zero_goals() + (-opponent.expected_goals()).exp()) / 2.0
}

/// Expected count from P(at least 1), P(at least 2) and P(at least 3)
pub fn expected_from_thresholds(p1: f64, p2: f64, p3: f64) -> f64 {
    let three = p3;
    let two = exact_from_over(p2, p3);
    let one = exact_from_over(p1, p2);
    3.0 * three + 2.0 * two + one
}

/// Expected saves from P(over 0.5 saves) .. P(over 9.5 saves). A gap in the
/// quoted lines takes whatever probability mass is left over.
pub fn expected_saves(over: &[f64; SAVE_LINES]) -> f64 {
    let mut exact = [0.0; SAVE_LINES + 1];
    exact[0] = 1.0 - over[0];
    for k in 1..SAVE_LINES {
        exact[k] = if over[k - 1] != 0.0 && over[k] != 0.0 {
            over[k - 1] - over[k]
        } else {
            let assigned: f64 = exact[..k].iter().sum();
            (1.0 - assigned).max(0.0)
        };
    }
    exact[SAVE_LINES] = over[SAVE_LINES - 1];

    exact
        .iter()
        .enumerate()
        .map(|(k, p)| k as f64 * p)
        .sum()
}

/// Split a player line outcome ("Bukayo Saka Over 0.5", "Jordan Pickford Over 2.5 Saves")
/// into the player name and the index of the line (0 for Over 0.5).
pub fn parse_over_outcome(outcome: &str, market: Market) -> Option<(String, usize)> {
    let idx = outcome.find("Over")?;
    let (name, line) = outcome.split_at(idx);
    let line = line.trim_start_matches("Over").trim();

    let (line, name) = match market {
        Market::GoalkeeperSaves => (
            line.trim_end_matches("Saves").trim(),
            name.replace("Saves", ""),
        ),
        _ => (line, name.to_string()),
    };

    let line: f64 = line.parse().ok()?;
    if line.fract() != 0.5 {
        return None;
    }
    let index = line.floor() as usize;
    let max_lines = match market {
        Market::PlayerAssists => ASSIST_LINES,
        Market::GoalkeeperSaves => SAVE_LINES,
        _ => return None,
    };
    if index >= max_lines {
        return None;
    }

    let name = name.trim().to_string();
    if name.is_empty() {
        return None;
    }
    Some((name, index))
}

fn column(values: &[f64], i: usize) -> f64 {
    values.get(i).copied().unwrap_or(0.0)
}

/// Everything the bookmaker odds say about one player, one entry per match
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerProjection {
    pub opponents: Vec<String>,
    pub anytime: Vec<f64>,
    pub two_or_more: Vec<f64>,
    pub hat_trick: Vec<f64>,
    pub assists_over: [Vec<f64>; ASSIST_LINES],
    pub saves_over: [Vec<f64>; SAVE_LINES],
    pub clean_sheets: Vec<f64>,
    pub goals_conceded: Vec<f64>,
    pub goals_scored: Vec<f64>,
}

impl PlayerProjection {
    /// Record a goalscorer market probability
    pub fn add_scorer_probability(&mut self, market: Market, probability: f64) {
        match market {
            Market::AnytimeGoalscorer => self.anytime.push(probability),
            Market::TwoOrMoreGoals => self.two_or_more.push(probability),
            Market::HatTrick => self.hat_trick.push(probability),
            _ => {}
        }
    }

    pub fn add_over_probability(&mut self, market: Market, line: usize, probability: f64) {
        match market {
            Market::PlayerAssists if line < ASSIST_LINES => self.assists_over[line].push(probability),
            Market::GoalkeeperSaves if line < SAVE_LINES => self.saves_over[line].push(probability),
            _ => {}
        }
    }

    /// Record the team outlook for one match
    pub fn add_team_outlook(&mut self, own: &GoalDistribution, opponent: &GoalDistribution) {
        self.clean_sheets.push(clean_sheet_probability(opponent));
        self.goals_conceded.push(opponent.expected_goals());
        self.goals_scored.push(own.expected_goals());
    }

    /// Expected goals per match with a non-zero value
    pub fn expected_goals(&self) -> Vec<f64> {
        let n = self
            .anytime
            .len()
            .max(self.two_or_more.len())
            .max(self.hat_trick.len());
        (0..n)
            .map(|i| {
                expected_from_thresholds(
                    column(&self.anytime, i),
                    column(&self.two_or_more, i),
                    column(&self.hat_trick, i),
                )
            })
            .filter(|xg| *xg != 0.0)
            .collect()
    }

    /// Expected assists per match with a non-zero value
    pub fn expected_assists(&self) -> Vec<f64> {
        let n = self.assists_over.iter().map(Vec::len).max().unwrap_or(0);
        (0..n)
            .map(|i| {
                expected_from_thresholds(
                    column(&self.assists_over[0], i),
                    column(&self.assists_over[1], i),
                    column(&self.assists_over[2], i),
                )
            })
            .filter(|xa| *xa != 0.0)
            .collect()
    }

    /// Expected saves per match with a non-zero value
    pub fn expected_saves(&self) -> Vec<f64> {
        let n = self.saves_over.iter().map(Vec::len).max().unwrap_or(0);
        (0..n)
            .map(|i| {
                let mut over = [0.0; SAVE_LINES];
                for (line, slot) in over.iter_mut().enumerate() {
                    *slot = column(&self.saves_over[line], i);
                }
                expected_saves(&over)
            })
            .filter(|xs| *xs != 0.0)
            .collect()
    }
}
