use askama::Template;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use fpl_odds_points::utils::data::{points_csv_filename, write_points_csv};
use fpl_odds_points::utils::fdr::{
    best_partner, best_partner_for_two, best_rotation_pair, best_rotation_trio, fdr_table,
    FdrTable, RotationResult, StrengthKind, SUM_COLOUR,
};
use fpl_odds_points::utils::predicted_points::{
    best_by_position, filter_players, PlayerPoints, PointsFilter,
};
use fpl_odds_points::{
    fetch_dashboard_data, load_season, scrape_odds, AppConfig, DashboardData, PointsReport,
    Position,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod filters {
    pub fn format_points(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:.2}", value))
    }

    pub fn format_price(value: &f64) -> ::askama::Result<String> {
        Ok(format!("£{:.1}m", value))
    }

    pub fn format_percent(value: &f64) -> ::askama::Result<String> {
        Ok(format!("{:.1}%", value * 100.0))
    }
}

const MAX_FDR_GAMEWEEKS: usize = 10;

struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

fn select_options(values: &[(String, String)], selected: &str) -> Vec<SelectOption> {
    values
        .iter()
        .map(|(value, label)| SelectOption {
            value: value.clone(),
            label: label.clone(),
            selected: value == selected,
        })
        .collect()
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    active_page: String,
    loaded: bool,
    loaded_at: String,
    scraping: bool,
    gameweek_label: String,
    odds_file: String,
    player_count: usize,
    best_players: Vec<PlayerPoints>,
    fdr_gameweek: String,
    easiest_fixtures: Vec<(String, u32, u32)>,
}

#[derive(Template)]
#[template(path = "points.html")]
struct PointsTemplate {
    active_page: String,
    gameweek_label: String,
    odds_file: String,
    positions: Vec<SelectOption>,
    max_price: f64,
    include_unknown: bool,
    csv_query: String,
    players: Vec<PlayerPoints>,
}

#[derive(Template)]
#[template(path = "fdr.html")]
struct FdrTemplate {
    active_page: String,
    next_gameweek: u32,
    gameweeks: usize,
    sum_colour: &'static str,
    attack: FdrTable,
    defense: FdrTable,
    team1_options: Vec<SelectOption>,
    team2_options: Vec<SelectOption>,
    three: bool,
    rotation_label: String,
    rotation: Option<RotationResult>,
    error: Option<String>,
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

type SharedData = Arc<RwLock<Option<DashboardData>>>;

#[derive(Clone)]
struct AppState {
    data: SharedData,
    config: Arc<AppConfig>,
    scraping: Arc<AtomicBool>,
}

fn not_loaded(what: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("{} not loaded yet", what),
    )
        .into_response()
}

/// "true", "on" and "1" switch a query flag on
fn flag(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("true" | "on" | "1"))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let data = state.data.read().await;
    let scraping = state.scraping.load(Ordering::SeqCst);

    let mut template = HomeTemplate {
        active_page: "home".to_string(),
        loaded: data.is_some(),
        loaded_at: String::new(),
        scraping,
        gameweek_label: String::new(),
        odds_file: String::new(),
        player_count: 0,
        best_players: Vec::new(),
        fdr_gameweek: String::new(),
        easiest_fixtures: Vec::new(),
    };

    if let Some(data) = data.as_ref() {
        template.loaded_at = data.loaded_at.format("%Y-%m-%d %H:%M").to_string();
        if let Some(points) = &data.points {
            template.gameweek_label = points.gameweek_label();
            template.odds_file = points.odds_file.display().to_string();
            template.player_count = points.players.len();
            let known = filter_players(&points.players, &PointsFilter::default());
            template.best_players = best_by_position(&known).into_iter().cloned().collect();
        }
        if let Some(fdr) = &data.fdr {
            template.fdr_gameweek = fdr.next_gameweek.to_string();
            let mut teams: Vec<(String, u32, u32)> = fdr
                .teams
                .iter()
                .map(|t| (t.name.clone(), t.attack_next_5, t.defense_next_5))
                .collect();
            teams.sort_by_key(|(_, attack, defense)| attack + defense);
            teams.truncate(5);
            template.easiest_fixtures = teams;
        }
    }

    HtmlTemplate(template).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct PointsQuery {
    position: Option<String>,
    max_price: Option<String>,
    include_unknown: Option<String>,
}

impl PointsQuery {
    fn filter(&self) -> PointsFilter {
        let defaults = PointsFilter::default();
        PointsFilter {
            positions: non_empty(&self.position)
                .map(|p| vec![Position::from_short_name(&p.to_uppercase())])
                .unwrap_or_default(),
            max_price: non_empty(&self.max_price)
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.max_price),
            include_unknown: flag(&self.include_unknown),
        }
    }

    /// The same filter as a query string, for the CSV link
    fn query_string(&self) -> String {
        let filter = self.filter();
        let mut parts = vec![format!("max_price={}", filter.max_price)];
        if let Some(position) = non_empty(&self.position) {
            parts.push(format!("position={}", position));
        }
        if filter.include_unknown {
            parts.push("include_unknown=true".to_string());
        }
        parts.join("&")
    }
}

async fn points_report(state: &AppState) -> Option<PointsReport> {
    state
        .data
        .read()
        .await
        .as_ref()
        .and_then(|d| d.points.clone())
}

async fn points(State(state): State<AppState>, Query(query): Query<PointsQuery>) -> impl IntoResponse {
    let Some(report) = points_report(&state).await else {
        return not_loaded("Predicted points");
    };

    let filter = query.filter();
    let position_values: Vec<(String, String)> = std::iter::once((String::new(), "All".to_string()))
        .chain(
            Position::PLAYING
                .iter()
                .map(|p| (p.as_str().to_string(), p.as_str().to_string())),
        )
        .collect();

    let template = PointsTemplate {
        active_page: "points".to_string(),
        gameweek_label: report.gameweek_label(),
        odds_file: report.odds_file.display().to_string(),
        positions: select_options(
            &position_values,
            &non_empty(&query.position).unwrap_or_default().to_uppercase(),
        ),
        max_price: filter.max_price,
        include_unknown: filter.include_unknown,
        csv_query: query.query_string(),
        players: filter_players(&report.players, &filter),
    };

    HtmlTemplate(template).into_response()
}

async fn points_csv(State(state): State<AppState>, Query(query): Query<PointsQuery>) -> Response {
    let Some(report) = points_report(&state).await else {
        return not_loaded("Predicted points");
    };

    let players = filter_players(&report.players, &query.filter());
    let mut body = Vec::new();
    if let Err(e) = write_points_csv(&players, &mut body) {
        error!("Failed to write CSV: {:#}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to write CSV").into_response();
    }

    let disposition = format!(
        "attachment; filename=\"{}\"",
        points_csv_filename(&report.gameweeks)
    );
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
struct FdrQuery {
    gameweeks: Option<String>,
    team1: Option<String>,
    team2: Option<String>,
    three: Option<String>,
}

async fn fdr(State(state): State<AppState>, Query(query): Query<FdrQuery>) -> impl IntoResponse {
    let report = state.data.read().await.as_ref().and_then(|d| d.fdr.clone());
    let Some(report) = report else {
        return not_loaded("Fixture difficulty");
    };

    let gameweeks = non_empty(&query.gameweeks)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(5)
        .clamp(1, MAX_FDR_GAMEWEEKS);
    let three = flag(&query.three);
    let team1 = non_empty(&query.team1);
    let team2 = non_empty(&query.team2);

    let (rotation_label, rotation) = match (team1, team2) {
        (Some(first), Some(second)) => (
            format!("Best partner for {} and {}", first, second),
            best_partner_for_two(&report.teams, gameweeks, first, second).map_err(|e| e.to_string()),
        ),
        (Some(team), None) | (None, Some(team)) => (
            format!("Best partner for {}", team),
            best_partner(&report.teams, gameweeks, team).map_err(|e| e.to_string()),
        ),
        (None, None) if three => (
            "Best trio".to_string(),
            best_rotation_trio(&report.teams, gameweeks)
                .ok_or_else(|| "Not enough teams for a trio".to_string()),
        ),
        (None, None) => (
            "Best pair".to_string(),
            best_rotation_pair(&report.teams, gameweeks)
                .ok_or_else(|| "Not enough teams for a pair".to_string()),
        ),
    };
    let (rotation, error) = match rotation {
        Ok(result) => (Some(result), None),
        Err(e) => (None, Some(e)),
    };

    let team_values: Vec<(String, String)> = std::iter::once((String::new(), "-".to_string()))
        .chain(
            report
                .teams
                .iter()
                .map(|t| (t.name.clone(), t.name.clone())),
        )
        .collect();

    let template = FdrTemplate {
        active_page: "fdr".to_string(),
        next_gameweek: report.next_gameweek,
        gameweeks,
        sum_colour: SUM_COLOUR,
        attack: fdr_table(&report.teams, report.next_gameweek, gameweeks, StrengthKind::Attack),
        defense: fdr_table(&report.teams, report.next_gameweek, gameweeks, StrengthKind::Defense),
        team1_options: select_options(&team_values, team1.unwrap_or_default()),
        team2_options: select_options(&team_values, team2.unwrap_or_default()),
        three,
        rotation_label,
        rotation,
        error,
    };

    HtmlTemplate(template).into_response()
}

/// Clears the scraping flag when the scrape task ends, panics included
struct ScrapeGuard(Arc<AtomicBool>);

impl Drop for ScrapeGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Start a scrape in the background, then rebuild the dashboard data
async fn scrape(State(state): State<AppState>) -> Response {
    if state.scraping.swap(true, Ordering::SeqCst) {
        return (StatusCode::CONFLICT, "A scrape is already running").into_response();
    }

    let guard = ScrapeGuard(Arc::clone(&state.scraping));
    tokio::spawn(async move {
        let _guard = guard;
        let config = state.config.as_ref();
        let result: anyhow::Result<DashboardData> = async {
            let season = load_season(config).await?;
            let path = scrape_odds(config, &season).await?;
            info!("Scrape finished: {}", path.display());
            fetch_dashboard_data(config).await
        }
        .await;

        match result {
            Ok(data) => *state.data.write().await = Some(data),
            Err(e) => error!("Scrape failed: {:#}", e),
        }
    });

    Redirect::to("/").into_response()
}

fn app(state: AppState) -> Router {
    Router::new()
        .nest_service("/static", ServeDir::new("static"))
        .route("/", get(home))
        .route("/points", get(points))
        .route("/points.csv", get(points_csv))
        .route("/fdr", get(fdr))
        .route("/scrape", post(scrape))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    println!("Fetching FPL data...");

    let data = match fetch_dashboard_data(&config).await {
        Ok(data) => {
            println!("Data loaded successfully");
            if let Some(points) = &data.points {
                println!(
                    "  - {} players scored for gameweek {}",
                    points.players.len(),
                    points.gameweek_label()
                );
            }
            if let Some(fdr) = &data.fdr {
                println!(
                    "  - {} teams rated from gameweek {}",
                    fdr.teams.len(),
                    fdr.next_gameweek
                );
            }
            Some(data)
        }
        Err(e) => {
            eprintln!("Error fetching data: {:#}", e);
            eprintln!("Server will start but pages may show errors");
            None
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        data: Arc::new(RwLock::new(data)),
        config: Arc::new(config),
        scraping: Arc::new(AtomicBool::new(false)),
    };

    println!("\nStarting web server at http://{}", bind_addr);
    println!("Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
