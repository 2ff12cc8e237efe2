use crate::models::GameweekOdds;
use crate::utils::predicted_points::PlayerPoints;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Save any serializable value to a JSON cache file, creating parent directories
pub fn save_to_cache<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize cache data")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write cache file {}", path.display()))?;
    Ok(())
}

/// Load a value from a JSON cache file
pub fn load_from_cache<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cache file {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to deserialize cache file {}", path.display()))
}

fn gameweek_key(gameweeks: &[u32]) -> String {
    gameweeks
        .iter()
        .map(|gw| gw.to_string())
        .collect::<Vec<_>>()
        .join("-")
}

/// File name prefix shared by every odds snapshot of these gameweeks
pub fn snapshot_prefix(gameweeks: &[u32]) -> String {
    format!("gw{}_all_odds_", gameweek_key(gameweeks))
}

/// Write scraped odds to `dir/gw{gws}_all_odds_{dd-mm_HH-MM}.json`
pub fn save_odds_snapshot(
    odds: &GameweekOdds,
    dir: &Path,
    gameweeks: &[u32],
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let path = dir.join(format!(
        "{}{}.json",
        snapshot_prefix(gameweeks),
        now.format("%d-%m_%H-%M")
    ));
    save_to_cache(odds, &path)?;
    Ok(path)
}

/// Most recently modified snapshot for these gameweeks, if any
pub fn latest_odds_snapshot(dir: &Path, gameweeks: &[u32]) -> Option<PathBuf> {
    let prefix = snapshot_prefix(gameweeks);
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(&prefix) && name.ends_with(".json")
        })
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((modified, entry.path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

pub fn load_odds_snapshot(path: &Path) -> Result<GameweekOdds> {
    load_from_cache(path)
}

pub fn points_csv_filename(gameweeks: &[u32]) -> String {
    format!("gw{}_filtered_predicted_points.csv", gameweek_key(gameweeks))
}

/// Write the points table as CSV, one row per player
pub fn write_points_csv<W: Write>(players: &[PlayerPoints], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for player in players {
        wtr.serialize(player).context("Failed to write CSV row")?;
    }
    wtr.flush().context("Failed to flush CSV")?;
    Ok(())
}

pub fn save_points_to_csv(players: &[PlayerPoints], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
    write_points_csv(players, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchOdds;
    use chrono::TimeZone;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fpl_odds_points_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn sample_odds() -> GameweekOdds {
        let mut odds = GameweekOdds::new();
        let mut m = MatchOdds {
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            home_position: 1,
            away_position: 4,
            link: "https://www.oddschecker.com/football/english/premier-league/arsenal-v-chelsea".to_string(),
            markets: Default::default(),
        };
        m.markets
            .entry("Anytime Goalscorer".to_string())
            .or_default()
            .insert("Bukayo Saka".to_string(), vec![2.5, 2.625]);
        odds.insert(m.title(), m);
        odds
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = temp_dir("cache");
        let path = dir.join("nested").join("values.json");
        save_to_cache(&vec![1u32, 2, 3], &path).unwrap();
        let loaded: Vec<u32> = load_from_cache(&path).unwrap();
        assert_eq!(loaded, vec![1, 2, 3]);
        assert!(load_from_cache::<Vec<u32>>(dir.join("missing.json")).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_snapshot_naming_and_latest() {
        let dir = temp_dir("snapshots");
        let now = Local.with_ymd_and_hms(2025, 9, 12, 18, 5, 0).unwrap();
        let path = save_odds_snapshot(&sample_odds(), &dir, &[4, 5], now).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "gw4-5_all_odds_12-09_18-05.json"
        );

        assert_eq!(latest_odds_snapshot(&dir, &[4, 5]), Some(path.clone()));
        assert_eq!(latest_odds_snapshot(&dir, &[4]), None);
        assert_eq!(latest_odds_snapshot(&dir.join("absent"), &[4, 5]), None);

        let loaded = load_odds_snapshot(&path).unwrap();
        assert_eq!(loaded, sample_odds());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_points_csv() {
        let player = PlayerPoints {
            name: "Bukayo Saka".to_string(),
            position: crate::models::Position::Midfielder,
            team: "Arsenal".to_string(),
            price: 10.0,
            games: 1,
            opponents: "Chelsea".to_string(),
            minutes: 900,
            chance_of_playing: 1.0,
            expected_goals: 0.4,
            expected_assists: 0.3,
            expected_saves: 0.0,
            clean_sheets: 0.35,
            goals_conceded: 1.1,
            estimated_bps: 18.5,
            dc_points: 0.0,
            save_points: 0.0,
            predicted_points: 6.8,
            matched_by: "name".to_string(),
        };
        let mut buf = Vec::new();
        write_points_csv(&[player], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Player,Position,Team,Price,Games,Opponents"));
        assert!(header.ends_with("xP,Matched By"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("Bukayo Saka,MID,Arsenal,10.0,1,Chelsea,900"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_points_csv_filename() {
        assert_eq!(points_csv_filename(&[7]), "gw7_filtered_predicted_points.csv");
        assert_eq!(points_csv_filename(&[7, 8]), "gw7-8_filtered_predicted_points.csv");
    }
}
