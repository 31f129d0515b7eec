use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::fetch::Fetch;
use super::names::FRANCHISES;
use super::provider::{AdapterError, Produced, SourceAdapter};
use super::rules::{extract_standings, visible_text, DIRECT_STANDINGS_RULES};
use crate::db::models::{Dataset, FORM_LEN};
use crate::pipeline::random::Randomness;

pub const POINTS_TABLE_URL: &str = "https://psl-t20.com/points-table/";
pub const RESULTS_URL: &str = "https://psl-t20.com/results/";

/// Scrapes the league's own points table.
///
/// The page carries no match-by-match history, so each team's form is
/// sampled from its win/loss record and flagged as approximate. The output is
/// a bare standings table that the merger folds into the cached Dataset.
pub struct DirectScraper {
    fetch: Arc<dyn Fetch>,
    rng: Arc<Randomness>,
    points_table_url: String,
    results_url: String,
}

impl DirectScraper {
    pub fn new(fetch: Arc<dyn Fetch>, rng: Arc<Randomness>) -> Self {
        DirectScraper {
            fetch,
            rng,
            points_table_url: POINTS_TABLE_URL.to_string(),
            results_url: RESULTS_URL.to_string(),
        }
    }

    /// Win/loss mentions per franchise on the results page. Best effort:
    /// any failure yields an empty map.
    async fn result_counts(&self) -> BTreeMap<&'static str, (u32, u32)> {
        let page = match self.fetch.fetch(&self.results_url).await {
            Ok(page) => page,
            Err(e) => {
                debug!("Results page unavailable, sampling form from table: {}", e);
                return BTreeMap::new();
            }
        };
        count_results(&visible_text(&Html::parse_document(&page.body)))
    }
}

#[async_trait]
impl SourceAdapter for DirectScraper {
    fn name(&self) -> &str {
        "psl-t20.com"
    }

    async fn produce(&self, prior: Option<&Dataset>) -> Result<Option<Produced>, AdapterError> {
        if prior.map_or(true, Dataset::is_empty) {
            return Err(AdapterError::NotFound(
                "no cached dataset to merge standings into".into(),
            ));
        }

        let page = self.fetch.fetch(&self.points_table_url).await?;
        let (rule, mut table) = extract_standings(&page.body, DIRECT_STANDINGS_RULES)
            .ok_or_else(|| AdapterError::Parse("no points table rows found".into()))?;
        info!("Points table: {} teams via {:?}", table.len(), rule);

        let counts = self.result_counts().await;
        for (team, row) in table.iter_mut() {
            let (wins, losses) = counts
                .get(team.as_str())
                .copied()
                .filter(|(w, l)| w + l > 0)
                .unwrap_or((row.wins.unwrap_or(0), row.losses.unwrap_or(0)));
            let form = synthesize_form(wins, losses, &self.rng);
            if !form.is_empty() {
                row.form = Some(form);
                row.form_approximate = true;
            }
        }

        Ok(Some(Produced::Standings(table)))
    }
}

/// Count "<Team> won by" and "<Team> lost by" mentions per franchise.
fn count_results(text: &str) -> BTreeMap<&'static str, (u32, u32)> {
    let mut counts = BTreeMap::new();
    for franchise in FRANCHISES.iter() {
        let name = regex::escape(franchise.name);
        let count = |verb: &str| {
            Regex::new(&format!(r"(?i){}\s+{}\s+by", name, verb))
                .map(|re| re.find_iter(text).count() as u32)
                .unwrap_or_else(|e| {
                    warn!("Bad result pattern for {}: {}", franchise.name, e);
                    0
                })
        };
        let tally = (count("won"), count("lost"));
        if tally.0 + tally.1 > 0 {
            counts.insert(franchise.name, tally);
        }
    }
    counts
}

/// Sample a W/L sequence of up to `FORM_LEN` codes. Each draw is weighted by
/// the wins and losses still unassigned, so the sequence never contains more
/// W or L codes than the record allows.
pub fn synthesize_form(wins: u32, losses: u32, rng: &Randomness) -> String {
    let (mut wins_left, mut losses_left) = (wins, losses);
    let len = (wins + losses).min(FORM_LEN as u32);
    let mut form = String::with_capacity(len as usize);

    for _ in 0..len {
        let ratio = f64::from(wins_left) / f64::from(wins_left + losses_left);
        if losses_left == 0 || (wins_left > 0 && rng.unit() < ratio) {
            form.push('W');
            wins_left -= 1;
        } else {
            form.push('L');
            losses_left -= 1;
        }
    }
    form
}
