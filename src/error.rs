use thiserror::Error;

/// Domain errors that callers may want to match on
#[derive(Debug, Error)]
pub enum FplError {
    #[error("no upcoming gameweek found")]
    NoUpcomingGameweek,

    #[error("invalid fractional odds: {0:?}")]
    InvalidOdds(String),

    #[error("team name not found: {0:?}")]
    UnknownTeam(String),
}
