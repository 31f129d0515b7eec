//! ESPNcricinfo series pages: standings, fixtures and results.

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use super::fetch::Fetch;
use super::names::{franchise_for, parse_match_date, venue_city, TBA};
use super::provider::{AdapterError, Produced, ScrapedSeason, SourceAdapter};
use super::rules::{element_text, parse_count};
use crate::db::models::{Dataset, Fixture, MatchResult, Standings, StandingsRow};

const SERIES_URL: &str =
    "https://www.espncricinfo.com/series/pakistan-super-league-2024-25-1512433";

/// Page URLs for one series.
#[derive(Debug, Clone)]
pub struct SeriesPages {
    pub standings: String,
    pub fixtures: String,
    pub results: String,
    pub matches: String,
}

impl SeriesPages {
    pub fn for_series(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        SeriesPages {
            standings: format!("{}/points-table-standings", base),
            fixtures: format!("{}/match-schedule-fixtures", base),
            results: format!("{}/match-results", base),
            matches: format!("{}/matches", base),
        }
    }
}

impl Default for SeriesPages {
    fn default() -> Self {
        Self::for_series(SERIES_URL)
    }
}

pub struct CricinfoScraper {
    fetch: Arc<dyn Fetch>,
    pages: SeriesPages,
    tournament_year: i32,
}

impl CricinfoScraper {
    pub fn new(fetch: Arc<dyn Fetch>, tournament_year: i32) -> Self {
        CricinfoScraper {
            fetch,
            pages: SeriesPages::default(),
            tournament_year,
        }
    }

    async fn page(&self, url: &str) -> Result<Html, AdapterError> {
        let page = self.fetch.fetch(url).await?;
        Ok(Html::parse_document(&page.body))
    }

    /// Completed matches from the matches page, falling back to the results
    /// page when that fails or lists nothing finished.
    async fn completed_matches(&self) -> Vec<MatchResult> {
        match self.page(&self.pages.matches).await {
            Ok(doc) => {
                let found = parse_completed_matches(&doc, self.tournament_year);
                if !found.is_empty() {
                    return found;
                }
                debug!("No completed matches listed, trying results page");
            }
            Err(e) => warn!("Matches page failed, trying results page: {}", e),
        }

        match self.page(&self.pages.results).await {
            Ok(doc) => parse_results(&doc, self.tournament_year),
            Err(e) => {
                warn!("Results page failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for CricinfoScraper {
    fn name(&self) -> &str {
        "espncricinfo"
    }

    async fn produce(&self, _prior: Option<&Dataset>) -> Result<Option<Produced>, AdapterError> {
        let standings = parse_standings(&self.page(&self.pages.standings).await?);
        if standings.is_empty() {
            return Err(AdapterError::Parse("standings table not found".into()));
        }

        let fixtures = match self.page(&self.pages.fixtures).await {
            Ok(doc) => parse_fixtures(&doc, self.tournament_year),
            Err(e) => {
                warn!("Fixtures page failed: {}", e);
                Vec::new()
            }
        };
        let results = self.completed_matches().await;

        info!(
            "Cricinfo: {} teams, {} fixtures, {} results",
            standings.len(),
            fixtures.len(),
            results.len()
        );
        Ok(Some(Produced::Season(ScrapedSeason {
            standings,
            fixtures,
            results,
        })))
    }
}

// ── Selectors ───────────────────────────────────────────────────────────────

struct Selectors {
    standings_row: Selector,
    team_link: Selector,
    stat_cells: [Selector; 6],
    form_item: Selector,
    card: Selector,
    result_card: Selector,
    team_name: [Selector; 2],
    team_score: [Selector; 2],
    date_time: Selector,
    description: Selector,
    venue: Selector,
    status: Selector,
    result_text: Selector,
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| Selectors {
        standings_row: sel("table.standings tbody tr"),
        team_link: sel("td.team-names a"),
        stat_cells: [
            sel("td:nth-child(3)"),
            sel("td:nth-child(4)"),
            sel("td:nth-child(5)"),
            sel("td:nth-child(6)"),
            sel("td:nth-child(7)"),
            sel("td:nth-child(8)"),
        ],
        form_item: sel("td.form-data .form-item"),
        card: sel(".match-card"),
        result_card: sel(".match-card.result"),
        team_name: [sel(".team:nth-child(1) .name"), sel(".team:nth-child(2) .name")],
        team_score: [sel(".team:nth-child(1) .score"), sel(".team:nth-child(2) .score")],
        date_time: sel(".date-time"),
        description: sel(".match-header .description"),
        venue: sel(".venue"),
        status: sel(".status"),
        result_text: sel(".result-text"),
    })
}

fn first_text(el: &ElementRef, selector: &Selector) -> Option<String> {
    el.select(selector)
        .next()
        .map(|e| element_text(&e))
        .filter(|t| !t.is_empty())
}

// ── Parsers ─────────────────────────────────────────────────────────────────

fn parse_standings(doc: &Html) -> Standings {
    let s = selectors();
    let mut table = Standings::new();

    for row in doc.select(&s.standings_row) {
        let Some(franchise) = first_text(&row, &s.team_link).and_then(|t| franchise_for(&t))
        else {
            continue;
        };
        let cell = |i: usize| first_text(&row, &s.stat_cells[i]);
        let codes: String = row
            .select(&s.form_item)
            .map(|item| match element_text(&item).as_str() {
                "W" => 'W',
                "L" => 'L',
                "N" => 'N',
                _ => '-',
            })
            .collect();

        table.insert(
            franchise.name.to_string(),
            StandingsRow {
                matches: cell(0).as_deref().and_then(parse_count),
                wins: cell(1).as_deref().and_then(parse_count),
                losses: cell(2).as_deref().and_then(parse_count),
                no_results: cell(3).as_deref().and_then(parse_count),
                points: cell(4).as_deref().and_then(parse_count),
                nrr: cell(5),
                form: (!codes.is_empty()).then_some(codes),
                form_approximate: false,
            },
        );
    }
    table
}

fn match_time(text: &str) -> String {
    static TIME: OnceLock<Option<Regex>> = OnceLock::new();
    TIME.get_or_init(|| Regex::new(r"(?i)\d{1,2}:\d{2}\s*(?:AM|PM)?").ok())
        .as_ref()
        .and_then(|re| re.find(text))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Canonical franchise name, or `TBA` for an unannounced playoff side.
fn card_team(raw: &str) -> Option<String> {
    if raw.trim().eq_ignore_ascii_case(TBA) {
        return Some(TBA.to_string());
    }
    franchise_for(raw).map(|f| f.name.to_string())
}

/// Both sides of a card; cards naming a team outside the league are skipped.
fn card_teams(card: &ElementRef) -> Option<(String, String)> {
    let s = selectors();
    let team1 = card_team(&first_text(card, &s.team_name[0])?)?;
    let team2 = card_team(&first_text(card, &s.team_name[1])?)?;
    Some((team1, team2))
}

fn card_scores(card: &ElementRef, team1: &str, team2: &str) -> String {
    let s = selectors();
    let score = |i: usize| first_text(card, &s.team_score[i]).unwrap_or_default();
    format!("{}: {}, {}: {}", team1, score(0), team2, score(1))
}

/// Fixture cards, keyed `Match1`, `Match2`, ... in page order.
fn parse_fixtures(doc: &Html, year: i32) -> Vec<(String, Fixture)> {
    let s = selectors();
    doc.select(&s.card)
        .enumerate()
        .filter_map(|(i, card)| {
            let (team1, team2) = card_teams(&card)?;
            let when = first_text(&card, &s.date_time).unwrap_or_default();
            let venue = first_text(&card, &s.venue).unwrap_or_default();
            Some((
                format!("Match{}", i + 1),
                Fixture {
                    team1,
                    team2,
                    date: parse_match_date(&when, year),
                    time: match_time(&when),
                    venue: venue_city(&venue),
                },
            ))
        })
        .collect()
}

fn is_completed(status: &str) -> bool {
    let status = status.to_lowercase();
    ["won", "tied", "no result"].iter().any(|k| status.contains(k))
}

fn parse_completed_matches(doc: &Html, year: i32) -> Vec<MatchResult> {
    let s = selectors();
    doc.select(&s.card)
        .filter_map(|card| {
            let status = first_text(&card, &s.status)?;
            if !is_completed(&status) {
                return None;
            }
            let (team1, team2) = card_teams(&card)?;
            let when = first_text(&card, &s.description).unwrap_or_default();
            Some(MatchResult {
                scores: card_scores(&card, &team1, &team2),
                date: parse_match_date(&when, year),
                result: status,
                team1,
                team2,
            })
        })
        .collect()
}

fn parse_results(doc: &Html, year: i32) -> Vec<MatchResult> {
    let s = selectors();
    doc.select(&s.result_card)
        .filter_map(|card| {
            let (team1, team2) = card_teams(&card)?;
            let when = first_text(&card, &s.date_time).unwrap_or_default();
            Some(MatchResult {
                scores: card_scores(&card, &team1, &team2),
                date: parse_match_date(&when, year),
                result: first_text(&card, &s.result_text).unwrap_or_default(),
                team1,
                team2,
            })
        })
        .collect()
}
