use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of results kept in a form string and a recent-matches list.
pub const FORM_LEN: usize = 5;

/// One franchise's row in the standings, plus its recent matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecord {
    #[serde(default)]
    pub matches: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    /// Older snapshots omit this column entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_results: Option<u32>,
    #[serde(default)]
    pub points: u32,
    /// Signed decimal string such as "+1.285"; kept opaque.
    #[serde(default = "default_nrr")]
    pub nrr: String,
    /// W / L / N / '-' codes, most recent last, at most `FORM_LEN` long.
    #[serde(default)]
    pub form: String,
    /// Set when `form` was sampled rather than read from match-by-match data.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub form_approximate: bool,
    /// Most recent first, at most `FORM_LEN` entries.
    #[serde(default)]
    pub recent_matches: Vec<RecentMatch>,
}

fn default_nrr() -> String {
    "0.000".to_string()
}

impl Default for TeamRecord {
    fn default() -> Self {
        TeamRecord {
            matches: 0,
            wins: 0,
            losses: 0,
            no_results: None,
            points: 0,
            nrr: default_nrr(),
            form: String::new(),
            form_approximate: false,
            recent_matches: Vec::new(),
        }
    }
}

/// A past match from one team's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentMatch {
    pub opponent: String,
    /// Team-relative text: "Won by 5 wickets", "Lost by 88 runs", "No result (Rain)".
    pub result: String,
    /// `YYYY-MM-DD`, or empty when unknown.
    pub date: String,
}

/// A scheduled match. Keyed in the Dataset by match id ("Match27", "Qualifier 1").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub team1: String,
    pub team2: String,
    /// `YYYY-MM-DD`, or empty when unknown.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub venue: String,
}

/// A completed match as scraped. Not persisted directly; the merger derives
/// head-to-head, recent matches, form and news from these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub team1: String,
    pub team2: String,
    /// Shared wording, e.g. "Lahore Qalandars won by 5 wickets".
    pub result: String,
    /// `YYYY-MM-DD`, or empty when unknown.
    pub date: String,
    pub scores: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadToHeadMatch {
    pub date: String,
    pub result: String,
    pub scores: String,
}

/// All meetings between one unordered pair of teams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub total: u32,
    pub matches: Vec<HeadToHeadMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueStats {
    pub matches: u32,
    pub avg_first_innings: u32,
    pub avg_second_innings: u32,
    pub toss_decision: String,
    pub winning_toss: String,
}

/// The unit that is persisted, published and rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub teams: BTreeMap<String, TeamRecord>,
    #[serde(default)]
    pub head_to_head: BTreeMap<String, HeadToHead>,
    #[serde(default)]
    pub venues: BTreeMap<String, VenueStats>,
    /// Fixtures by match id.
    #[serde(default, rename = "matches")]
    pub fixtures: BTreeMap<String, Fixture>,
    #[serde(default)]
    pub news_items: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl Dataset {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Dataset {
            teams: BTreeMap::new(),
            head_to_head: BTreeMap::new(),
            venues: BTreeMap::new(),
            fixtures: BTreeMap::new(),
            news_items: Vec::new(),
            last_updated: now,
        }
    }

    /// A Dataset without teams carries nothing worth showing.
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

/// Partial team stats as scraped from a standings page. `None` means the
/// column was absent or unreadable, and the cached value is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub matches: Option<u32>,
    pub wins: Option<u32>,
    pub losses: Option<u32>,
    pub no_results: Option<u32>,
    pub points: Option<u32>,
    pub nrr: Option<String>,
    pub form: Option<String>,
    pub form_approximate: bool,
}

/// Standings table keyed by canonical team name.
pub type Standings = BTreeMap<String, StandingsRow>;

/// Keep only the `FORM_LEN` most recent codes (the tail of the string).
pub fn trim_form(form: &str) -> String {
    let codes: Vec<char> = form.chars().collect();
    let start = codes.len().saturating_sub(FORM_LEN);
    codes[start..].iter().collect()
}
