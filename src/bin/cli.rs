use anyhow::Result;
use clap::{Parser, Subcommand};
use fpl_odds_points::utils::data::{points_csv_filename, save_points_to_csv};
use fpl_odds_points::utils::fdr::{
    best_partner, best_partner_for_two, best_rotation_pair, best_rotation_trio, fdr_table,
    RotationResult, StrengthKind,
};
use fpl_odds_points::utils::predicted_points::{
    best_by_position, filter_players, PlayerPoints, PointsFilter,
};
use fpl_odds_points::{compute_fdr, compute_points, load_season, scrape_odds, AppConfig, Position};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fpl-odds", about = "FPL predicted points from bookmaker odds")]
struct Cli {
    /// Directory for caches, odds snapshots and CSV output
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Reuse cached FPL API responses
    #[arg(long, global = true)]
    use_cache: bool,

    /// Cover the gameweek after the next one as well
    #[arg(long, global = true)]
    extra_gameweek: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape bookmaker odds for the next gameweek(s)
    Scrape,
    /// Predicted points from the latest odds snapshot
    Points {
        /// GKP, DEF, MID or FWD; repeat for several
        #[arg(long = "position")]
        positions: Vec<String>,
        #[arg(long, default_value_t = 20.0)]
        max_price: f64,
        /// Write the filtered table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long, default_value_t = 30)]
        top: usize,
        /// Keep players only the bookmaker knows about
        #[arg(long)]
        include_unknown: bool,
    },
    /// Fixture difficulty tickers and rotation picks
    Fdr {
        #[arg(long, default_value_t = 5)]
        gameweeks: usize,
        /// Find partners for one or two teams
        #[arg(long = "team")]
        teams: Vec<String>,
        /// Look for the best trio instead of the best pair
        #[arg(long)]
        three: bool,
    },
}

fn print_points(players: &[PlayerPoints], top: usize) {
    println!(
        "{:<4} {:<28} {:<4} {:<18} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}  {}",
        "#", "Player", "Pos", "Team", "Price", "xG", "xA", "CS", "BPS", "xP", "Matched"
    );
    for (i, p) in players.iter().take(top).enumerate() {
        println!(
            "{:<4} {:<28} {:<4} {:<18} {:>6.1} {:>6.2} {:>6.2} {:>6.2} {:>6.1} {:>6.2}  {}",
            i + 1,
            p.name,
            p.position.as_str(),
            p.team,
            p.price,
            p.expected_goals,
            p.expected_assists,
            p.clean_sheets,
            p.estimated_bps,
            p.predicted_points,
            p.matched_by
        );
    }
}

fn print_rotation(label: &str, result: &RotationResult) {
    println!(
        "{} attack: {} (FDR {})",
        label,
        result.attack.teams.join(", "),
        result.attack.fdr_sum
    );
    println!(
        "{} defense: {} (FDR {})",
        label,
        result.defense.teams.join(", "),
        result.defense.fdr_sum
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    config.use_cache |= cli.use_cache;
    config.extra_gameweek |= cli.extra_gameweek;

    let season = load_season(&config).await?;

    match cli.command {
        Command::Scrape => {
            let path = scrape_odds(&config, &season).await?;
            println!("Saved odds to {}", path.display());
        }
        Command::Points {
            positions,
            max_price,
            csv,
            top,
            include_unknown,
        } => {
            let report = compute_points(&config, &season).await?;
            let filter = PointsFilter {
                positions: positions
                    .iter()
                    .map(|p| Position::from_short_name(&p.to_uppercase()))
                    .collect(),
                max_price,
                include_unknown,
            };
            let players = filter_players(&report.players, &filter);

            println!(
                "\nPREDICTED POINTS - GAMEWEEK {} ({} players)\n",
                report.gameweek_label(),
                players.len()
            );
            print_points(&players, top);

            println!("\nBest by position:");
            for p in best_by_position(&players) {
                println!("  {:<4} {} ({:.2})", p.position.as_str(), p.name, p.predicted_points);
            }

            if let Some(path) = csv {
                let path = if path.is_dir() {
                    path.join(points_csv_filename(&report.gameweeks))
                } else {
                    path
                };
                save_points_to_csv(&players, &path)?;
                println!("\nSaved predicted points to {}", path.display());
            }
        }
        Command::Fdr {
            gameweeks,
            teams,
            three,
        } => {
            let report = compute_fdr(&config, &season).await?;

            for (title, kind) in [("ATTACK", StrengthKind::Attack), ("DEFENSE", StrengthKind::Defense)] {
                let table = fdr_table(&report.teams, report.next_gameweek, gameweeks, kind);
                println!("\n{} FDR FROM GAMEWEEK {}\n", title, report.next_gameweek);
                print!("{:<6}", "Team");
                for header in &table.headers {
                    print!(" {:<12}", header);
                }
                println!(" {:>4}", "Sum");
                for row in &table.rows {
                    print!("{:<6}", row.team);
                    for cell in &row.cells {
                        print!(" {:<12}", cell.label);
                    }
                    println!(" {:>4}", row.sum);
                }
            }

            println!();
            match teams.as_slice() {
                [] if three => match best_rotation_trio(&report.teams, gameweeks) {
                    Some(result) => print_rotation("Best trio", &result),
                    None => println!("Not enough teams for a rotation"),
                },
                [] => match best_rotation_pair(&report.teams, gameweeks) {
                    Some(result) => print_rotation("Best pair", &result),
                    None => println!("Not enough teams for a rotation"),
                },
                [team] => {
                    let result = best_partner(&report.teams, gameweeks, team)?;
                    print_rotation(&format!("Best partner for {}", team), &result);
                }
                [first, second, ..] => {
                    let result = best_partner_for_two(&report.teams, gameweeks, first, second)?;
                    print_rotation(&format!("Best partner for {} and {}", first, second), &result);
                }
            }
        }
    }

    Ok(())
}
