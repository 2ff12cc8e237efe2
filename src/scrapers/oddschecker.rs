use crate::models::{Fixture, GameweekOdds, Market, MarketOdds, MatchOdds, Team};
use crate::utils::odds::{filter_outliers, parse_fractional_odds};
use anyhow::{Context, Result};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

const ODDSCHECKER_URL: &str = "https://www.oddschecker.com/football/english/premier-league/";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Headings, outcome names and odds rows of a match page, in document order
const MARKET_PAGE_SELECTOR: &str =
    "h2, h4, span[class^='BetRowLeftBetName'], div[class^='oddsAreaWrapper']";

pub struct OddscheckerScraper {
    client: reqwest::Client,
    league_url: String,
    request_delay: Duration,
}

impl Default for OddscheckerScraper {
    fn default() -> Self {
        Self::new(ODDSCHECKER_URL, Duration::from_millis(1500))
    }
}

impl OddscheckerScraper {
    pub fn new(league_url: impl Into<String>, request_delay: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            league_url: league_url.into(),
            request_delay,
        }
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Oddschecker returned error for {}: {}", url, response.status());
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }

    /// Find the page of every fixture on the league page
    pub async fn fetch_match_links(
        &self,
        fixtures: &[&Fixture],
        teams: &[Team],
    ) -> Result<GameweekOdds> {
        let html = self.fetch_html(&self.league_url).await?;
        parse_match_links(&html, &self.league_url, fixtures, teams)
    }

    /// All supported markets of one match page
    pub async fn fetch_match_odds(&self, link: &str) -> Result<BTreeMap<String, MarketOdds>> {
        let html = self.fetch_html(link).await?;
        Ok(parse_match_markets(&html))
    }

    /// Scrape every fixture of the given gameweek(s). Matches without a link,
    /// or whose page fails to load, are kept with no markets.
    pub async fn scrape_gameweek(&self, fixtures: &[&Fixture], teams: &[Team]) -> Result<GameweekOdds> {
        let mut odds = self.fetch_match_links(fixtures, teams).await?;
        let total = odds.len();
        let mut scraped = 0;

        for (title, match_odds) in odds.iter_mut() {
            if !match_odds.has_link() {
                warn!("No link found for {}, skipping", title);
                continue;
            }
            if scraped > 0 {
                tokio::time::sleep(self.request_delay).await;
            }
            match self.fetch_match_odds(&match_odds.link).await {
                Ok(markets) => {
                    info!("Scraped {} markets for {}", markets.len(), title);
                    match_odds.markets = markets;
                    scraped += 1;
                }
                Err(e) => warn!("Failed to scrape {}: {:#}", title, e),
            }
        }

        info!("Scraped {} of {} matches", scraped, total);
        Ok(odds)
    }
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// One entry per fixture keyed by "Home v Away", with the match page link
/// taken from the anchor titled the same way
pub fn parse_match_links(
    html: &str,
    base_url: &str,
    fixtures: &[&Fixture],
    teams: &[Team],
) -> Result<GameweekOdds> {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).with_context(|| format!("Invalid league URL {}", base_url))?;
    let mut odds = GameweekOdds::new();

    for fixture in fixtures {
        let home = teams.iter().find(|t| t.id == fixture.team_h);
        let away = teams.iter().find(|t| t.id == fixture.team_a);
        let (Some(home), Some(away)) = (home, away) else {
            warn!("Fixture {} has an unknown team", fixture.id);
            continue;
        };

        let mut match_odds = MatchOdds::new(home, away);
        let title = match_odds.title();
        let selector = Selector::parse(&format!("a[title=\"{}\"]", title.replace('"', "")))
            .ok()
            .context("Invalid selector")?;

        if let Some(href) = document
            .select(&selector)
            .find_map(|a| a.value().attr("href"))
        {
            match base.join(href) {
                Ok(url) => match_odds.link = url.to_string(),
                Err(e) => warn!("Bad link {:?} for {}: {}", href, title, e),
            }
        } else {
            debug!("No anchor titled {:?}", title);
        }

        odds.insert(title, match_odds);
    }

    Ok(odds)
}

/// Decimal prices inside an odds row. Only fractional prices (and EVS) are
/// kept, and outliers are dropped.
fn parse_odds_row(row: &ElementRef, button: &Selector) -> Vec<f64> {
    let prices: Vec<f64> = row
        .select(button)
        .map(|b| element_text(&b))
        .filter(|text| text.contains('/') || text.eq_ignore_ascii_case("EVS"))
        .filter_map(|text| parse_fractional_odds(&text).ok())
        .collect();
    let kept = filter_outliers(&prices);
    if kept.len() < prices.len() {
        debug!("Dropped {} outlier price(s)", prices.len() - kept.len());
    }
    kept
}

/// Parse every supported market on a match page into outcome -> prices
pub fn parse_match_markets(html: &str) -> BTreeMap<String, MarketOdds> {
    let document = Html::parse_document(html);
    let mut markets: BTreeMap<String, MarketOdds> = BTreeMap::new();

    let (Ok(items), Ok(button)) = (Selector::parse(MARKET_PAGE_SELECTOR), Selector::parse("button"))
    else {
        return markets;
    };

    let mut current: Option<Market> = None;
    let mut outcome: Option<String> = None;

    for item in document.select(&items) {
        let class = item.value().attr("class").unwrap_or_default();
        match item.value().name() {
            "h2" | "h4" => {
                let title = element_text(&item);
                if let Some(market) = Market::from_title(&title) {
                    current = Some(market);
                    outcome = None;
                } else if item.value().name() == "h2" {
                    current = None;
                }
            }
            "span" if class.starts_with("BetRowLeftBetName") => {
                outcome = Some(element_text(&item));
            }
            "div" if class.starts_with("oddsAreaWrapper") => {
                let (Some(market), Some(name)) = (current, outcome.take()) else {
                    continue;
                };
                let prices = parse_odds_row(&item, &button);
                if prices.is_empty() {
                    debug!("No prices for {} in {}", name, market);
                    continue;
                }
                markets
                    .entry(market.as_str().to_string())
                    .or_default()
                    .insert(name, prices);
            }
            _ => {}
        }
    }

    markets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: u32, name: &str, short: &str) -> Team {
        Team {
            id,
            name: name.to_string(),
            short_name: short.to_string(),
            position: id,
            strength: 3,
        }
    }

    fn fixture(id: u32, h: u32, a: u32) -> Fixture {
        Fixture {
            id,
            event: Some(5),
            team_h: h,
            team_a: a,
            team_h_score: None,
            team_a_score: None,
            started: Some(false),
            finished: false,
            finished_provisional: false,
            kickoff_time: None,
        }
    }

    const LEAGUE_PAGE: &str = r#"
        <html><body>
          <a title="Arsenal v Tottenham" href="/football/english/premier-league/arsenal-v-tottenham/winner">Arsenal v Tottenham</a>
          <a title="Chelsea v Everton" href="https://www.oddschecker.com/football/english/premier-league/chelsea-v-everton/winner">Chelsea v Everton</a>
        </body></html>
    "#;

    #[test]
    fn test_parse_match_links() {
        let teams = vec![
            team(1, "Arsenal", "ARS"),
            team(2, "Spurs", "TOT"),
            team(3, "Chelsea", "CHE"),
            team(4, "Everton", "EVE"),
            team(5, "Wolves", "WOL"),
        ];
        let fixtures = vec![fixture(1, 1, 2), fixture(2, 3, 4), fixture(3, 5, 1)];
        let refs: Vec<&Fixture> = fixtures.iter().collect();

        let odds = parse_match_links(LEAGUE_PAGE, ODDSCHECKER_URL, &refs, &teams).unwrap();
        assert_eq!(odds.len(), 3);
        assert_eq!(
            odds["Arsenal v Tottenham"].link,
            "https://www.oddschecker.com/football/english/premier-league/arsenal-v-tottenham/winner"
        );
        assert!(odds["Chelsea v Everton"].has_link());
        assert_eq!(odds["Arsenal v Tottenham"].away_position, 2);

        let wolves = &odds["Wolverhampton v Arsenal"];
        assert!(!wolves.has_link());
        assert!(wolves.markets.is_empty());
    }

    const MATCH_PAGE: &str = r#"
        <html><body>
          <h2>Anytime Goalscorer</h2>
          <span class="BetRowLeftBetName_b1m53rgx">Bukayo Saka</span>
          <div class="oddsAreaWrapper_o17xb9rs">
            <button>6/4</button><button>13/8</button><button>EVS</button><button>SP</button>
          </div>
          <span class="BetRowLeftBetName_b1m53rgx">Kai Havertz</span>
          <div class="oddsAreaWrapper_o17xb9rs"><button>2/1</button></div>
          <h2>Match Result</h2>
          <span class="BetRowLeftBetName_b1m53rgx">Arsenal</span>
          <div class="oddsAreaWrapper_o17xb9rs"><button>1/2</button></div>
          <h2>Total Home Goals</h2>
          <span class="BetRowLeftBetName_b1m53rgx">Over 0.5</span>
          <div class="oddsAreaWrapper_o17xb9rs"><button>1/5</button><button>1/4</button></div>
          <span class="BetRowLeftBetName_b1m53rgx">Over 1.5</span>
          <div class="oddsAreaWrapper_o17xb9rs"><button>-</button></div>
        </body></html>
    "#;

    #[test]
    fn test_parse_match_markets() {
        let markets = parse_match_markets(MATCH_PAGE);
        assert_eq!(markets.len(), 2);
        assert!(!markets.contains_key("Match Result"));

        let scorers = &markets["Anytime Goalscorer"];
        assert_eq!(scorers["Bukayo Saka"], vec![2.5, 2.625, 2.0]);
        assert_eq!(scorers["Kai Havertz"], vec![3.0]);

        let home_goals = &markets["Total Home Goals"];
        assert_eq!(home_goals["Over 0.5"], vec![1.2, 1.25]);
        assert!(!home_goals.contains_key("Over 1.5"));
    }

    #[test]
    fn test_parse_match_markets_without_markets() {
        assert!(parse_match_markets("<html><body><p>Nothing</p></body></html>").is_empty());
    }

    #[tokio::test]
    #[ignore] // requires network access
    async fn test_fetch_league_page() {
        let scraper = OddscheckerScraper::default();
        let result = scraper.fetch_match_links(&[], &[]).await;
        assert!(result.is_ok());
    }
}
