//! Folding adapter output into a complete Dataset.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::news::generate_news;
use super::random::Randomness;
use crate::db::models::{
    trim_form, Dataset, HeadToHead, HeadToHeadMatch, MatchResult, RecentMatch, Standings,
    StandingsRow, TeamRecord, VenueStats, FORM_LEN,
};
use crate::sources::names::normalize_team_name;
use crate::sources::ScrapedSeason;

/// Key for an unordered pair of teams: both names sorted, joined by "-".
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}-{}", a, b)
    } else {
        format!("{}-{}", b, a)
    }
}

/// Overwrite the fields `row` carries; absent columns keep the cached value.
pub fn apply_row(team: &mut TeamRecord, row: &StandingsRow) {
    if let Some(v) = row.matches {
        team.matches = v;
    }
    if let Some(v) = row.wins {
        team.wins = v;
    }
    if let Some(v) = row.losses {
        team.losses = v;
    }
    if row.no_results.is_some() {
        team.no_results = row.no_results;
    }
    if let Some(v) = row.points {
        team.points = v;
    }
    if let Some(v) = &row.nrr {
        team.nrr = v.clone();
    }
    if let Some(form) = &row.form {
        team.form = trim_form(form);
        team.form_approximate = row.form_approximate;
    }
}

/// Merge a bare standings table into the prior Dataset. Fixtures,
/// head-to-head, venues and news are carried over untouched.
pub fn merge_standings(prior: &Dataset, table: &Standings) -> Dataset {
    let mut merged = prior.clone();
    for (name, row) in table {
        apply_row(merged.teams.entry(name.clone()).or_default(), row);
    }
    merged
}

/// Build a Dataset from a full season scrape. Teams are exactly the scraped
/// standings; anything the scrape lacks is taken from `prior`.
pub fn merge_season(
    prior: Option<&Dataset>,
    season: &ScrapedSeason,
    rng: &Randomness,
    now: DateTime<Utc>,
) -> Dataset {
    let empty = Dataset::empty(now);
    let prior = prior.unwrap_or(&empty);
    let results = &season.results;

    let mut teams = BTreeMap::new();
    for (name, row) in &season.standings {
        let mut team = prior.teams.get(name).cloned().unwrap_or_default();
        apply_row(&mut team, row);

        let form = derive_form(name, results);
        if !form.is_empty() {
            team.form = form;
            team.form_approximate = false;
        }
        let recent = extract_recent_matches(name, results);
        if !recent.is_empty() {
            team.recent_matches = recent;
        }
        teams.insert(name.clone(), team);
    }

    let (head_to_head, news_items) = if results.is_empty() {
        (prior.head_to_head.clone(), prior.news_items.clone())
    } else {
        (derive_head_to_head(results), generate_news(results, rng))
    };

    let fixtures = if season.fixtures.is_empty() {
        prior.fixtures.clone()
    } else {
        season.fixtures.iter().cloned().collect()
    };

    Dataset {
        teams,
        head_to_head,
        venues: static_venues(),
        fixtures,
        news_items,
        last_updated: now,
    }
}

// ── Result interpretation ───────────────────────────────────────────────────

fn won_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(.+?)\s+won\s+(.*)$").expect("static regex"))
}

/// Winning team (canonical name) and the margin text ("by 5 wickets").
pub fn winner_and_margin(result: &str) -> Option<(String, String)> {
    let caps = won_re().captures(result)?;
    let winner = normalize_team_name(caps.get(1)?.as_str());
    let margin = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
    Some((winner, margin))
}

fn is_no_decision(result: &str) -> bool {
    let lower = result.to_lowercase();
    ["no result", "abandoned", "tied"].iter().any(|k| lower.contains(k))
}

fn involves(result: &MatchResult, team: &str) -> Option<String> {
    let (t1, t2) = (
        normalize_team_name(&result.team1),
        normalize_team_name(&result.team2),
    );
    if t1 == team {
        Some(t2)
    } else if t2 == team {
        Some(t1)
    } else {
        None
    }
}

fn oldest_first(a: &MatchResult, b: &MatchResult) -> Ordering {
    match (a.date.is_empty(), b.date.is_empty()) {
        (false, false) => a.date.cmp(&b.date),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    }
}

/// Dated results, most recent first. Undated results are left out.
pub fn newest_results(results: &[MatchResult]) -> Vec<&MatchResult> {
    let mut sorted: Vec<&MatchResult> = results.iter().filter(|r| !r.date.is_empty()).collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

/// Winner, loser and margin, only when the named winner is one of the two
/// sides. A winner that matches neither team leaves the result undecided.
pub fn decided(result: &MatchResult) -> Option<(String, String, String)> {
    let (winner, margin) = winner_and_margin(&result.result)?;
    let (t1, t2) = (
        normalize_team_name(&result.team1),
        normalize_team_name(&result.team2),
    );
    if winner == t1 {
        Some((t1, t2, margin))
    } else if winner == t2 {
        Some((t2, t1, margin))
    } else {
        None
    }
}

/// Form codes from the `FORM_LEN` most recent dated results of `team`.
pub fn derive_form(team: &str, results: &[MatchResult]) -> String {
    let mut dated: Vec<&MatchResult> = results
        .iter()
        .filter(|r| !r.date.is_empty() && involves(r, team).is_some())
        .collect();
    dated.sort_by(|a, b| oldest_first(a, b));

    let codes: String = dated
        .iter()
        .filter_map(|r| match decided(r) {
            Some((winner, _, _)) if winner == team => Some('W'),
            Some(_) => Some('L'),
            None if is_no_decision(&r.result) => Some('N'),
            None => None,
        })
        .collect();
    trim_form(&codes)
}

/// A team's recent dated matches, most recent first, with the shared result text
/// rewritten from the team's side ("Won by ..." / "Lost by ...").
pub fn extract_recent_matches(team: &str, results: &[MatchResult]) -> Vec<RecentMatch> {
    newest_results(results)
        .into_iter()
        .filter_map(|r| {
            let opponent = involves(r, team)?;
            let result = match decided(r) {
                Some((winner, _, margin)) if winner == team => format!("Won {}", margin),
                Some((_, _, margin)) => format!("Lost {}", margin),
                None => r.result.clone(),
            };
            Some(RecentMatch {
                opponent,
                result: result.trim().to_string(),
                date: r.date.clone(),
            })
        })
        .take(FORM_LEN)
        .collect()
}

/// Group results by unordered team pair, oldest meeting first.
pub fn derive_head_to_head(results: &[MatchResult]) -> BTreeMap<String, HeadToHead> {
    let mut sorted: Vec<&MatchResult> = results.iter().collect();
    sorted.sort_by(|a, b| oldest_first(a, b));

    let mut table: BTreeMap<String, HeadToHead> = BTreeMap::new();
    for r in sorted {
        let (t1, t2) = (
            normalize_team_name(&r.team1),
            normalize_team_name(&r.team2),
        );
        if t1 == t2 {
            continue;
        }
        let entry = table.entry(pair_key(&t1, &t2)).or_default();
        entry.matches.push(HeadToHeadMatch {
            date: r.date.clone(),
            result: r.result.clone(),
            scores: r.scores.clone(),
        });
        entry.total = entry.matches.len() as u32;
    }
    table
}

/// Pre-computed venue figures. These are reference values and are not
/// recomputed from scraped results.
pub fn static_venues() -> BTreeMap<String, VenueStats> {
    let venue = |matches, first, second, toss: &str, wins: &str| VenueStats {
        matches,
        avg_first_innings: first,
        avg_second_innings: second,
        toss_decision: toss.to_string(),
        winning_toss: wins.to_string(),
    };
    BTreeMap::from([
        (
            "Lahore".to_string(),
            venue(11, 185, 162, "72% elected to field first", "59% matches won by team winning toss"),
        ),
        (
            "Karachi".to_string(),
            venue(5, 198, 184, "80% elected to field first", "60% matches won by team winning toss"),
        ),
        (
            "Multan".to_string(),
            venue(4, 168, 152, "64% elected to field first", "52% matches won by team winning toss"),
        ),
        (
            "Rawalpindi".to_string(),
            venue(4, 198, 178, "75% elected to field first", "50% matches won by team winning toss"),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Fixture;
    use crate::sources::names::FRANCHISES;
    use crate::sources::snapshots::default_dataset;

    fn result(t1: &str, t2: &str, text: &str, date: &str) -> MatchResult {
        MatchResult {
            team1: t1.into(),
            team2: t2.into(),
            result: text.into(),
            date: date.into(),
            scores: format!("{t1}: 150, {t2}: 151/4"),
        }
    }

    #[test]
    fn test_pair_key_is_symmetric() {
        for a in FRANCHISES.iter() {
            for b in FRANCHISES.iter().filter(|b| b.name != a.name) {
                assert_eq!(pair_key(a.name, b.name), pair_key(b.name, a.name));
            }
        }
        assert_eq!(
            pair_key("Karachi Kings", "Islamabad United"),
            "Islamabad United-Karachi Kings"
        );
    }

    #[test]
    fn test_bundled_head_to_head_keys_are_sorted() {
        let ds = default_dataset().unwrap();
        for key in ds.head_to_head.keys() {
            let names: Vec<&str> = FRANCHISES
                .iter()
                .map(|f| f.name)
                .filter(|n| key.starts_with(n) || key.ends_with(n))
                .collect();
            assert_eq!(names.len(), 2, "{key}");
            assert_eq!(&pair_key(names[0], names[1]), key);
        }
    }

    #[test]
    fn test_recent_match_rewritten_for_loser() {
        let results = vec![result(
            "Lahore Qalandars",
            "Karachi Kings",
            "Lahore Qalandars won by 5 wickets",
            "2025-04-26",
        )];
        assert_eq!(
            extract_recent_matches("Karachi Kings", &results),
            vec![RecentMatch {
                opponent: "Lahore Qalandars".into(),
                result: "Lost by 5 wickets".into(),
                date: "2025-04-26".into(),
            }]
        );
        assert_eq!(
            extract_recent_matches("Lahore Qalandars", &results)[0].result,
            "Won by 5 wickets"
        );
        assert!(extract_recent_matches("Multan Sultans", &results).is_empty());
    }

    #[test]
    fn test_recent_matches_capped_and_newest_first() {
        let results: Vec<MatchResult> = (1..=7)
            .map(|d| {
                result(
                    "Multan Sultans",
                    "PZ",
                    "Peshawar Zalmi won by 7 wickets",
                    &format!("2025-04-0{d}"),
                )
            })
            .chain([result("MS", "QG", "No result (Rain)", "")])
            .collect();
        let recent = extract_recent_matches("Multan Sultans", &results);
        assert_eq!(recent.len(), FORM_LEN);
        assert_eq!(recent[0].date, "2025-04-07");
        assert_eq!(recent[0].opponent, "Peshawar Zalmi");
        assert_eq!(recent[0].result, "Lost by 7 wickets");
    }

    #[test]
    fn test_form_uses_latest_dated_results() {
        let mut results = vec![
            result("IU", "QG", "Quetta Gladiators won by 2 wickets", "2025-05-05"),
            result("IU", "LQ", "No result (Rain)", "2025-04-10"),
            result("IU", "PZ", "Peshawar Zalmi won by 6 wickets", "2025-05-02"),
            result("IU", "MS", "Islamabad United won by 7 wickets", "2025-04-23"),
            result("IU", "KK", "Islamabad United won by 6 wickets", "2025-04-20"),
            result("IU", "LQ", "Lahore Qalandars won by 88 runs", "2025-04-30"),
        ];
        // undated results never count
        results.push(result("IU", "KK", "Islamabad United won by 9 runs", ""));

        let form = derive_form("Islamabad United", &results);
        assert_eq!(form, "WWLLL");
        assert_eq!(derive_form("Lahore Qalandars", &results), "NW");
        assert_eq!(derive_form("Multan Sultans", &[]), "");
    }

    #[test]
    fn test_head_to_head_groups_pairs_chronologically() {
        let results = vec![
            result("KK", "LQ", "Karachi Kings won by 4 wickets", "2025-05-04"),
            result("Lahore Qalandars", "Karachi Kings", "Lahore Qalandars won by 65 runs", "2025-04-15"),
            result("QG", "MS", "Quetta Gladiators won by 10 wickets", ""),
        ];
        let h2h = derive_head_to_head(&results);
        assert_eq!(h2h.len(), 2);

        let kk_lq = &h2h["Karachi Kings-Lahore Qalandars"];
        assert_eq!(kk_lq.total, 2);
        assert_eq!(kk_lq.matches[0].date, "2025-04-15");
        assert_eq!(kk_lq.matches[1].date, "2025-05-04");
        assert_eq!(h2h["Multan Sultans-Quetta Gladiators"].total, 1);
    }

    #[test]
    fn test_merge_standings_keeps_cached_sections() {
        let prior = default_dataset().unwrap();
        let mut table = Standings::new();
        table.insert(
            "Multan Sultans".into(),
            StandingsRow {
                wins: Some(2),
                form: Some("LLLLWLL".into()),
                form_approximate: true,
                ..Default::default()
            },
        );
        let merged = merge_standings(&prior, &table);

        let multan = &merged.teams["Multan Sultans"];
        assert_eq!(multan.wins, 2);
        assert_eq!(multan.points, prior.teams["Multan Sultans"].points);
        assert_eq!(multan.form, "LLWLL");
        assert!(multan.form_approximate);
        assert_eq!(merged.fixtures, prior.fixtures);
        assert_eq!(merged.head_to_head, prior.head_to_head);
        assert_eq!(merged.teams.len(), 6);
    }

    #[test]
    fn test_merge_season_fills_from_prior() {
        let mut prior = Dataset::empty(Utc::now());
        prior.teams.insert(
            "Karachi Kings".into(),
            TeamRecord {
                points: 10,
                nrr: "+0.433".into(),
                ..Default::default()
            },
        );
        prior.teams.insert("Multan Sultans".into(), TeamRecord::default());
        prior.fixtures.insert(
            "Final".into(),
            Fixture {
                team1: "TBA".into(),
                team2: "TBA".into(),
                date: "2025-05-18".into(),
                time: "7:00 PM".into(),
                venue: "Lahore".into(),
            },
        );
        prior.news_items = vec!["cached headline".into()];

        let mut season = ScrapedSeason::default();
        season.standings.insert(
            "Karachi Kings".into(),
            StandingsRow {
                wins: Some(5),
                losses: Some(3),
                ..Default::default()
            },
        );

        let now = Utc::now();
        let ds = merge_season(Some(&prior), &season, &Randomness::seeded(1), now);
        assert_eq!(ds.teams.len(), 1);
        let kk = &ds.teams["Karachi Kings"];
        assert_eq!((kk.wins, kk.losses, kk.points), (5, 3, 10));
        assert_eq!(kk.nrr, "+0.433");
        assert_eq!(ds.fixtures, prior.fixtures);
        assert_eq!(ds.news_items, prior.news_items);
        assert_eq!(ds.venues.len(), 4);
        assert_eq!(ds.last_updated, now);
    }

    #[test]
    fn test_merge_season_derives_from_results() {
        let mut season = ScrapedSeason::default();
        for name in ["Lahore Qalandars", "Karachi Kings"] {
            season.standings.insert(name.into(), StandingsRow::default());
        }
        season.results = vec![result(
            "Lahore Qalandars",
            "Karachi Kings",
            "Lahore Qalandars won by 5 wickets",
            "2025-04-26",
        )];

        let ds = merge_season(None, &season, &Randomness::seeded(1), Utc::now());
        assert_eq!(ds.teams["Lahore Qalandars"].form, "W");
        assert_eq!(ds.teams["Karachi Kings"].form, "L");
        assert_eq!(ds.teams["Karachi Kings"].recent_matches[0].result, "Lost by 5 wickets");
        assert_eq!(ds.head_to_head["Karachi Kings-Lahore Qalandars"].total, 1);
        let headline = &ds.news_items[0];
        assert!(headline.starts_with("Lahore Qalandars beat Karachi Kings by 5 wickets in a "));
        assert!(headline.ends_with(" contest"));
    }

    #[test]
    fn test_unrecognised_winner_records_nothing() {
        let results = vec![result("LQ", "KK", "Qalandars won by 5 wickets", "2025-04-26")];
        assert_eq!(decided(&results[0]), None);
        assert_eq!(derive_form("Lahore Qalandars", &results), "");
        assert_eq!(derive_form("Karachi Kings", &results), "");

        let recent = extract_recent_matches("Karachi Kings", &results);
        assert_eq!(recent[0].result, "Qalandars won by 5 wickets");
    }

    #[test]
    fn test_undated_results_stay_out_of_recent_matches() {
        let results = vec![
            result("LQ", "KK", "Lahore Qalandars won by 5 wickets", "2025-04-26"),
            result("LQ", "MS", "Multan Sultans won by 3 runs", ""),
        ];
        let recent = extract_recent_matches("Lahore Qalandars", &results);
        assert_eq!(
            recent,
            vec![RecentMatch {
                opponent: "Karachi Kings".into(),
                result: "Won by 5 wickets".into(),
                date: "2025-04-26".into(),
            }]
        );
        assert_eq!(derive_form("Lahore Qalandars", &results), "W");
    }
}
