//! Declarative standings extraction.
//!
//! A standings page is run through an ordered list of rules; the first rule
//! that yields at least one franchise row wins. Selector rules read a table
//! laid out as `Team | M | W | L | T | NR | Pts | NRR`; the text rules read the
//! same column order from the page's visible text and act as the last resort.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::debug;

use super::names::{franchise_for, FRANCHISES};
use crate::db::models::{Standings, StandingsRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandingsRule {
    /// Table rows matched by a CSS selector.
    TableRows(&'static str),
    /// Each franchise's full name, city or abbreviation followed by the stat
    /// columns, searched in the points-table section of the page text.
    TeamText,
    /// Any name followed by the stat columns, anywhere in the page text.
    LooseText,
}

/// Rule cascade for the psl-t20.com points table.
pub const DIRECT_STANDINGS_RULES: &[StandingsRule] = &[
    StandingsRule::TableRows(".points-table tbody tr"),
    StandingsRule::TableRows(".points-table tr"),
    StandingsRule::TableRows("table tbody tr"),
    StandingsRule::TableRows("table tr"),
    StandingsRule::TableRows("tr"),
    StandingsRule::TeamText,
    StandingsRule::LooseText,
];

/// Minimum cells for a table row: team plus M W L T NR Pts.
const MIN_CELLS: usize = 7;

/// The stat columns after a team name, as a regex fragment.
const STAT_COLUMNS: &str =
    r"\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+([+-]?\d+(?:\.\d+)?)";

/// Run `rules` in order over `html`, returning the first non-empty table
/// together with the rule that produced it.
pub fn extract_standings(
    html: &str,
    rules: &[StandingsRule],
) -> Option<(StandingsRule, Standings)> {
    let doc = Html::parse_document(html);
    let text = visible_text(&doc);

    for rule in rules {
        let table = match rule {
            StandingsRule::TableRows(selector) => table_rows(&doc, selector),
            StandingsRule::TeamText => team_text(points_table_section(&text)),
            StandingsRule::LooseText => loose_text(&text),
        };
        if table.is_empty() {
            debug!("Standings rule {:?} found nothing", rule);
            continue;
        }
        return Some((*rule, table));
    }
    None
}

/// Whitespace-collapsed text content of the whole document.
pub fn visible_text(doc: &Html) -> String {
    doc.root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text content of an element, trimmed and whitespace-collapsed.
pub fn element_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Leading digits of a cell, if any.
pub fn parse_count(cell: &str) -> Option<u32> {
    let digits: String = cell
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn non_empty(cell: &str) -> Option<String> {
    let cell = cell.trim();
    (!cell.is_empty()).then(|| cell.to_string())
}

fn table_rows(doc: &Html, selector: &str) -> Standings {
    let mut table = Standings::new();
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse(selector), Selector::parse("td")) else {
        return table;
    };

    for row in doc.select(&row_sel) {
        let cells: Vec<String> = row.select(&cell_sel).map(|c| element_text(&c)).collect();
        if cells.len() < MIN_CELLS {
            continue;
        }
        let Some(franchise) = franchise_for(&cells[0]) else {
            continue;
        };
        table.insert(
            franchise.name.to_string(),
            StandingsRow {
                matches: parse_count(&cells[1]),
                wins: parse_count(&cells[2]),
                losses: parse_count(&cells[3]),
                no_results: parse_count(&cells[5]),
                points: parse_count(&cells[6]),
                nrr: cells.get(7).and_then(|c| non_empty(c)),
                form: None,
                form_approximate: false,
            },
        );
    }
    table
}

fn row_from_captures(caps: &regex::Captures, first: usize) -> StandingsRow {
    let num = |i: usize| caps.get(first + i).and_then(|m| parse_count(m.as_str()));
    StandingsRow {
        matches: num(0),
        wins: num(1),
        losses: num(2),
        no_results: num(4),
        points: num(5),
        nrr: caps.get(first + 6).map(|m| m.as_str().to_string()),
        form: None,
        form_approximate: false,
    }
}

/// The part of the text from a "POINTS TABLE" heading on, or all of it.
fn points_table_section(text: &str) -> &str {
    static HEADING: OnceLock<Option<Regex>> = OnceLock::new();
    let heading = HEADING.get_or_init(|| Regex::new(r"(?i)points\s+table").ok());
    match heading.as_ref().and_then(|re| re.find(text)) {
        Some(m) => &text[m.start()..],
        None => text,
    }
}

fn team_text(text: &str) -> Standings {
    let mut table = Standings::new();
    for franchise in FRANCHISES.iter() {
        for alias in [franchise.name, franchise.city, franchise.abbr] {
            let pattern = format!(r"(?i)\b{}\b{}", regex::escape(alias), STAT_COLUMNS);
            let Ok(re) = Regex::new(&pattern) else {
                continue;
            };
            if let Some(caps) = re.captures(text) {
                table.insert(franchise.name.to_string(), row_from_captures(&caps, 1));
                break;
            }
        }
    }
    table
}

fn loose_text(text: &str) -> Standings {
    let mut table = Standings::new();
    let pattern = format!(r"([A-Za-z][A-Za-z ]*?){}", STAT_COLUMNS);
    let Ok(re) = Regex::new(&pattern) else {
        return table;
    };
    for caps in re.captures_iter(text) {
        let Some(franchise) = caps.get(1).and_then(|m| franchise_for(m.as_str())) else {
            continue;
        };
        table
            .entry(franchise.name.to_string())
            .or_insert_with(|| row_from_captures(&caps, 2));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE_PAGE: &str = r#"
        <html><body>
        <table class="points-table">
          <thead><tr><th>Teams</th><th>M</th><th>W</th><th>L</th><th>T</th><th>NR</th><th>Pts</th><th>NRR</th></tr></thead>
          <tbody>
            <tr><td>Quetta Gladiators</td><td>9</td><td>6</td><td>2</td><td>0</td><td>1</td><td>13</td><td>+1.530</td></tr>
            <tr><td>KK</td><td>8</td><td>5</td><td>3</td><td>0</td><td>0</td><td>10</td><td>+0.433</td></tr>
            <tr><td>Teams</td><td>M</td><td>W</td><td>L</td><td>T</td><td>NR</td><td>Pts</td></tr>
            <tr><td>Short row</td><td>1</td></tr>
          </tbody>
        </table>
        </body></html>"#;

    #[test]
    fn test_table_rule_reads_columns() {
        let (rule, table) = extract_standings(TABLE_PAGE, DIRECT_STANDINGS_RULES).unwrap();
        assert_eq!(rule, StandingsRule::TableRows(".points-table tbody tr"));
        assert_eq!(table.len(), 2);

        let quetta = &table["Quetta Gladiators"];
        assert_eq!(quetta.matches, Some(9));
        assert_eq!(quetta.wins, Some(6));
        assert_eq!(quetta.losses, Some(2));
        assert_eq!(quetta.no_results, Some(1));
        assert_eq!(quetta.points, Some(13));
        assert_eq!(quetta.nrr.as_deref(), Some("+1.530"));

        // abbreviation normalised
        assert_eq!(table["Karachi Kings"].points, Some(10));
    }

    #[test]
    fn test_missing_nrr_cell_is_none() {
        let html = r#"<table><tr><td>Lahore Qalandars</td><td>9</td><td>4</td><td>4</td><td>0</td><td>1</td><td>9</td></tr></table>"#;
        let (_, table) = extract_standings(html, DIRECT_STANDINGS_RULES).unwrap();
        assert_eq!(table["Lahore Qalandars"].nrr, None);
        assert_eq!(table["Lahore Qalandars"].points, Some(9));
    }

    #[test]
    fn test_team_text_rule_when_no_table() {
        let html = r#"<div><h2>POINTS TABLE</h2>
            <p>Islamabad United 9 5 4 0 0 10 -0.044</p>
            <p>Peshawar 8 4 4 0 0 8 -0.082</p></div>"#;
        let (rule, table) = extract_standings(html, DIRECT_STANDINGS_RULES).unwrap();
        assert_eq!(rule, StandingsRule::TeamText);
        assert_eq!(table["Islamabad United"].wins, Some(5));
        assert_eq!(table["Peshawar Zalmi"].nrr.as_deref(), Some("-0.082"));
    }

    #[test]
    fn test_loose_text_is_last_resort() {
        let html = "<p>Standings: Multan Sultans 9 1 8 0 0 2 -2.708 and more</p>";
        let (_, table) = extract_standings(
            html,
            &[StandingsRule::TableRows("table tr"), StandingsRule::LooseText],
        )
        .unwrap();
        assert_eq!(table["Multan Sultans"].losses, Some(8));
        assert_eq!(table["Multan Sultans"].points, Some(2));
    }

    #[test]
    fn test_nothing_found() {
        assert!(extract_standings("<p>Page moved</p>", DIRECT_STANDINGS_RULES).is_none());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(" 12 "), Some(12));
        assert_eq!(parse_count("9*"), Some(9));
        assert_eq!(parse_count("-"), None);
        assert_eq!(parse_count(""), None);
    }
}
