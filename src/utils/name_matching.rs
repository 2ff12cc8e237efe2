use serde::Serialize;
use std::fmt;
use strsim::jaro_winkler;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Bookmaker spellings that no normalisation step can recover
pub const PLAYER_NAMES_ODDSCHECKER: [(&str, &str); 2] = [
    ("Diogo Jota", "Diogo Teixeira Da Silva"),
    ("Yegor Yarmolyuk", "Yehor Yarmoliuk"),
];

/// Minimum Jaro-Winkler similarity for the last-resort fuzzy match
pub const FUZZY_THRESHOLD: f64 = 0.92;

const FOREIGN_LETTERS: [(char, &str); 16] = [
    ('ø', "o"),
    ('å', "a"),
    ('æ', "ae"),
    ('ä', "a"),
    ('ö', "o"),
    ('ú', "u"),
    ('ü', "u"),
    ('é', "e"),
    ('ñ', "n"),
    ('ï', "i"),
    ('í', "i"),
    ('ã', "a"),
    ('á', "a"),
    ('č', "c"),
    ('ć', "c"),
    ('š', "s"),
];

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Normalise a name into capitalised ASCII tokens.
///
/// "Martin Ødegaard" -> ["Martin", "Odegaard"], "Pierre-Emile Højbjerg" ->
/// ["Pierre", "Emile", "Hojbjerg"].
pub fn prepare_name(name: &str) -> Vec<String> {
    let mut lowered = name.to_lowercase();
    for (foreign, ascii) in FOREIGN_LETTERS {
        lowered = lowered.replace(foreign, ascii);
    }

    let ascii: String = lowered.nfkd().filter(char::is_ascii).collect();

    ascii
        .replace('-', " ")
        .replace('\'', "")
        .split_whitespace()
        .map(capitalize)
        .collect()
}

/// Two spellings of an FPL web name with dotted initials.
///
/// The first keeps initials as separate words ("B.Fernandes" -> "B Fernandes"),
/// the second keeps only what follows the last dot ("Fernandes").
pub fn prepare_nickname(web_name: &str) -> (String, String) {
    let base = web_name.replace('\'', "");

    let mut first = base.clone();
    while let Some(idx) = first.find('.') {
        if idx + 1 != first.len() {
            first = format!("{} {}", &first[..idx], first[idx + 1..].trim());
            if first.contains('.') {
                first = first[idx + 1..].to_string();
            }
        } else {
            first.truncate(idx);
        }
    }

    let mut second = base;
    while let Some(idx) = second.find('.') {
        if idx + 1 != second.len() {
            second = second[idx + 1..].to_string();
        } else {
            second.truncate(idx);
        }
    }

    let clean = |s: String| s.replace('-', " ").replace('\'', "").trim().to_string();
    (clean(first), clean(second))
}

/// Which stage of the matcher produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MatchMethod {
    Fuzzy,
    Nickname,
    TokenSubset,
    Alias,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::Nickname => "nickname",
            MatchMethod::TokenSubset => "name",
            MatchMethod::Alias => "alias",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An FPL player as seen by the matcher
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub team: String,
    tokens: Vec<String>,
    joined: String,
    nicknames: [String; 2],
}

impl MatchCandidate {
    /// `team` must be spelled the way the odds site spells it
    pub fn new(full_name: &str, web_name: &str, team: &str) -> Self {
        let tokens = prepare_name(full_name);
        let joined = tokens.join(" ");
        let (nick1, nick2) = prepare_nickname(web_name);
        Self {
            team: team.to_string(),
            tokens,
            joined,
            nicknames: [prepare_name(&nick1).join(" "), prepare_name(&nick2).join(" ")],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NameMatch {
    /// Index into the candidate list the matcher was built from
    pub index: usize,
    pub method: MatchMethod,
    pub score: f64,
}

fn is_token_subset(a: &[String], b: &[String]) -> bool {
    !a.is_empty() && a.iter().all(|t| b.contains(t))
}

/// Joins bookmaker player names onto FPL players
pub struct PlayerMatcher {
    candidates: Vec<MatchCandidate>,
}

impl PlayerMatcher {
    pub fn new(candidates: Vec<MatchCandidate>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[MatchCandidate] {
        &self.candidates
    }

    /// Find the FPL player behind a bookmaker name in the match `home` v `away`.
    ///
    /// Stages, first hit wins: the alias table, token subset on the full name
    /// (players of the two teams preferred), nickname contained in the bookmaker
    /// name for a player of either team, then Jaro-Winkler similarity restricted
    /// to the two teams.
    pub fn find(&self, bookmaker_name: &str, home: &str, away: &str) -> Option<NameMatch> {
        let bookmaker_name = bookmaker_name.trim();
        let in_match = |c: &MatchCandidate| c.team == home || c.team == away;

        if let Some((_, fpl_name)) = PLAYER_NAMES_ODDSCHECKER
            .iter()
            .find(|(odds_name, _)| *odds_name == bookmaker_name)
        {
            let alias = prepare_name(fpl_name).join(" ");
            if let Some(index) = self.candidates.iter().position(|c| c.joined == alias) {
                return Some(NameMatch {
                    index,
                    method: MatchMethod::Alias,
                    score: 1.0,
                });
            }
        }

        let tokens = prepare_name(bookmaker_name);
        if tokens.is_empty() {
            return None;
        }
        let joined = tokens.join(" ");

        let subset_hits: Vec<usize> = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| is_token_subset(&c.tokens, &tokens) || is_token_subset(&tokens, &c.tokens))
            .map(|(i, _)| i)
            .collect();
        let subset_hit = subset_hits
            .iter()
            .copied()
            .find(|&i| in_match(&self.candidates[i]))
            .or_else(|| subset_hits.first().copied());
        if let Some(index) = subset_hit {
            return Some(NameMatch {
                index,
                method: MatchMethod::TokenSubset,
                score: 1.0,
            });
        }

        let nickname_hit = self.candidates.iter().position(|c| {
            in_match(c)
                && c
                    .nicknames
                    .iter()
                    .any(|nick| !nick.is_empty() && joined.contains(nick.as_str()))
        });
        if let Some(index) = nickname_hit {
            return Some(NameMatch {
                index,
                method: MatchMethod::Nickname,
                score: 1.0,
            });
        }

        let fuzzy_hit = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| in_match(c))
            .map(|(i, c)| (i, jaro_winkler(&joined, &c.joined)))
            .filter(|(_, score)| *score >= FUZZY_THRESHOLD)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        if let Some((index, score)) = fuzzy_hit {
            debug!(
                "Fuzzy matched {:?} to {:?} ({:.3})",
                bookmaker_name, self.candidates[index].joined, score
            );
            return Some(NameMatch {
                index,
                method: MatchMethod::Fuzzy,
                score,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PlayerMatcher {
        PlayerMatcher::new(vec![
            MatchCandidate::new("Martin Ødegaard", "Ødegaard", "Arsenal"),
            MatchCandidate::new("Bruno Borges Fernandes", "B.Fernandes", "Man Utd"),
            MatchCandidate::new("Diogo Teixeira Da Silva", "Diogo J.", "Liverpool"),
            MatchCandidate::new("Heung-Min Son", "Son", "Tottenham"),
            MatchCandidate::new("Ben White", "White", "Arsenal"),
            MatchCandidate::new("Ben White", "White", "Brighton"),
            MatchCandidate::new("Yehor Yarmoliuk", "Yarmoliuk", "Brentford"),
            MatchCandidate::new("Dominic Solanke-Mitchell", "Solanke", "Tottenham"),
        ])
    }

    #[test]
    fn test_prepare_name() {
        assert_eq!(prepare_name("Martin Ødegaard"), vec!["Martin", "Odegaard"]);
        assert_eq!(
            prepare_name("Pierre-Emile Højbjerg"),
            vec!["Pierre", "Emile", "Hojbjerg"]
        );
        assert_eq!(prepare_name("N'Golo KANTÉ"), vec!["Ngolo", "Kante"]);
        // letters without a decomposition are dropped
        assert_eq!(prepare_name("Đorđe Petrović"), vec!["Ore", "Petrovic"]);
        assert!(prepare_name("   ").is_empty());
    }

    #[test]
    fn test_prepare_nickname() {
        assert_eq!(
            prepare_nickname("B.Fernandes"),
            ("B Fernandes".to_string(), "Fernandes".to_string())
        );
        assert_eq!(
            prepare_nickname("Diogo J."),
            ("Diogo J".to_string(), "Diogo J".to_string())
        );
        assert_eq!(
            prepare_nickname("J.P.Mateta"),
            ("P Mateta".to_string(), "Mateta".to_string())
        );
        assert_eq!(
            prepare_nickname("Alexander-Arnold"),
            ("Alexander Arnold".to_string(), "Alexander Arnold".to_string())
        );
        assert_eq!(
            prepare_nickname("O'Reilly"),
            ("OReilly".to_string(), "OReilly".to_string())
        );
    }

    #[test]
    fn test_token_subset_match() {
        let m = matcher();
        let hit = m.find("Martin Odegaard", "Arsenal", "Chelsea").unwrap();
        assert_eq!(hit.index, 0);
        assert_eq!(hit.method, MatchMethod::TokenSubset);

        // bookmaker names are often shorter than the registered name
        let hit = m.find("Bruno Fernandes", "Man Utd", "Everton").unwrap();
        assert_eq!(hit.index, 1);
    }

    #[test]
    fn test_token_subset_prefers_players_in_the_match() {
        let m = matcher();
        assert_eq!(m.find("Ben White", "Brighton", "Fulham").unwrap().index, 5);
        assert_eq!(m.find("Ben White", "Arsenal", "Fulham").unwrap().index, 4);
    }

    #[test]
    fn test_nickname_match_requires_team() {
        let m = matcher();
        let hit = m.find("Son Heung-min", "Tottenham", "Arsenal").unwrap();
        assert_eq!(hit.index, 3);

        let hit = m.find("Dom Solanke", "Tottenham", "Arsenal").unwrap();
        assert_eq!(hit.index, 7);
        assert_eq!(hit.method, MatchMethod::Nickname);

        assert!(m.find("Dom Solanke", "Chelsea", "Arsenal").is_none());
    }

    #[test]
    fn test_alias_match() {
        let m = matcher();
        let hit = m.find("Diogo Jota", "Liverpool", "Everton").unwrap();
        assert_eq!(hit.index, 2);
        assert_eq!(hit.method, MatchMethod::Alias);

        let hit = m.find("Yegor Yarmolyuk", "Brentford", "Everton").unwrap();
        assert_eq!(hit.index, 6);
    }

    #[test]
    fn test_fuzzy_match() {
        let m = matcher();
        let hit = m.find("Martin Odegard", "Arsenal", "Chelsea").unwrap();
        assert_eq!(hit.index, 0);
        assert_eq!(hit.method, MatchMethod::Fuzzy);
        assert!(hit.score >= FUZZY_THRESHOLD);

        assert!(m.find("Martin Odegard", "Liverpool", "Chelsea").is_none());
        assert!(m.find("Cole Palmer", "Arsenal", "Chelsea").is_none());
    }
}
