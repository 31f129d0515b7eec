//! Name, date and venue normalization for scraped text.
//!
//! Scraped pages spell franchises in full ("Lahore Qalandars"), by city
//! ("Lahore") or by abbreviation ("LQ"). Everything the pipeline stores uses
//! the canonical full name so that pair keys and lookups line up.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Placeholder used for playoff fixtures whose teams are not yet known.
pub const TBA: &str = "TBA";

/// One PSL franchise and the spellings it is scraped under.
#[derive(Debug, Clone, Copy)]
pub struct Franchise {
    pub name: &'static str,
    pub city: &'static str,
    pub abbr: &'static str,
}

/// The closed set of six franchises.
pub const FRANCHISES: [Franchise; 6] = [
    Franchise { name: "Islamabad United", city: "Islamabad", abbr: "IU" },
    Franchise { name: "Lahore Qalandars", city: "Lahore", abbr: "LQ" },
    Franchise { name: "Karachi Kings", city: "Karachi", abbr: "KK" },
    Franchise { name: "Quetta Gladiators", city: "Quetta", abbr: "QG" },
    Franchise { name: "Peshawar Zalmi", city: "Peshawar", abbr: "PZ" },
    Franchise { name: "Multan Sultans", city: "Multan", abbr: "MS" },
];

/// Map a scraped team string onto its canonical franchise name.
///
/// Full and city names match as case-insensitive substrings; abbreviations
/// only as a whole word, since two letters occur inside too many other words.
/// Unrecognised input comes back trimmed but otherwise unchanged.
pub fn normalize_team_name(raw: &str) -> String {
    let trimmed = raw.trim();
    franchise_for(trimmed)
        .map(|f| f.name.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

pub fn franchise_for(raw: &str) -> Option<&'static Franchise> {
    let lower = raw.to_lowercase();
    if lower.is_empty() {
        return None;
    }
    if let Some(f) = FRANCHISES.iter().find(|f| {
        lower.contains(&f.name.to_lowercase()) || lower.contains(&f.city.to_lowercase())
    }) {
        return Some(f);
    }
    FRANCHISES.iter().find(|f| {
        lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == f.abbr.to_lowercase())
    })
}

/// True for one of the six canonical names or the playoff placeholder.
#[cfg(test)]
pub fn is_known_team(name: &str) -> bool {
    name == TBA || FRANCHISES.iter().any(|f| f.name == name)
}

/// Month number for an English month name or its three-letter prefix.
pub fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn month_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "May 11", "Sat, May 11", "May 5, 2025, 7:00 PM"
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z]{3,9})\.?\s+(\d{1,2})\b(?:,?\s+(\d{4})\b)?")
            .expect("static regex")
    })
}

fn day_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "11 May 2025", "11 May"
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})\s+([A-Za-z]{3,9})\b(?:,?\s+(\d{4})\b)?").expect("static regex")
    })
}

/// Extract a `YYYY-MM-DD` date from free text such as "Sat, May 11" or
/// "May 5, 2025, 7:00 PM". A missing year defaults to `default_year`.
/// Text without a recognisable, valid calendar date yields an empty string.
pub fn parse_match_date(text: &str, default_year: i32) -> String {
    let candidates = month_day_re()
        .captures_iter(text)
        .map(|c| (c.get(1), c.get(2), c.get(3)))
        .chain(
            day_month_re()
                .captures_iter(text)
                .map(|c| (c.get(2), c.get(1), c.get(3))),
        );

    for (month, day, year) in candidates {
        let (Some(month), Some(day)) = (month, day) else {
            continue;
        };
        let Some(month) = month_number(month.as_str()) else {
            continue;
        };
        let Ok(day) = day.as_str().parse::<u32>() else {
            continue;
        };
        let year = year
            .and_then(|y| y.as_str().parse::<i32>().ok())
            .unwrap_or(default_year);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    String::new()
}

const VENUE_CITIES: &[(&str, &str)] = &[
    ("Gaddafi Stadium", "Lahore"),
    ("Lahore", "Lahore"),
    ("National Stadium", "Karachi"),
    ("Karachi", "Karachi"),
    ("Multan Cricket Stadium", "Multan"),
    ("Multan", "Multan"),
    ("Rawalpindi Cricket Stadium", "Rawalpindi"),
    ("Rawalpindi", "Rawalpindi"),
];

/// City for a stadium string; falls back to the first word, then "Unknown".
pub fn venue_city(venue: &str) -> String {
    if let Some((_, city)) = VENUE_CITIES.iter().find(|(v, _)| venue.contains(v)) {
        return city.to_string();
    }
    venue
        .split_whitespace()
        .next()
        .map(|w| w.trim_end_matches(',').to_string())
        .filter(|w| !w.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_aliases() {
        assert_eq!(normalize_team_name("Lahore"), "Lahore Qalandars");
        assert_eq!(normalize_team_name("  LQ "), "Lahore Qalandars");
        assert_eq!(normalize_team_name("karachi kings"), "Karachi Kings");
        assert_eq!(normalize_team_name("Quetta Gladiators (Q)"), "Quetta Gladiators");
        assert_eq!(normalize_team_name("ms"), "Multan Sultans");
    }

    #[test]
    fn test_normalize_unknown_passes_through() {
        assert_eq!(normalize_team_name("TBA"), "TBA");
        assert_eq!(normalize_team_name("Teams"), "Teams");
        assert_eq!(normalize_team_name(" Hyderabad Kingsmen "), "Hyderabad Kingsmen");
    }

    #[test]
    fn test_abbreviation_needs_whole_word() {
        // "ms" inside "Teams" must not resolve to Multan Sultans
        assert_eq!(normalize_team_name("Teams"), "Teams");
        assert_eq!(normalize_team_name("PZ (Q)"), "Peshawar Zalmi");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for f in FRANCHISES.iter() {
            for raw in [f.name, f.city, f.abbr] {
                let once = normalize_team_name(raw);
                assert_eq!(normalize_team_name(&once), once, "alias {raw}");
                assert_eq!(once, f.name);
            }
        }
    }

    #[test]
    fn test_known_teams() {
        assert!(is_known_team("Peshawar Zalmi"));
        assert!(is_known_team(TBA));
        assert!(!is_known_team("Peshawar"));
    }

    #[test]
    fn test_parse_date_without_year() {
        assert_eq!(parse_match_date("Sat, May 11", 2025), "2025-05-11");
        assert_eq!(parse_match_date("Sat, May 11, 7:00 PM", 2025), "2025-05-11");
        assert_eq!(parse_match_date("Apr 5", 2025), "2025-04-05");
    }

    #[test]
    fn test_parse_date_with_year() {
        assert_eq!(parse_match_date("May 5, 2025, 7:00 PM", 2024), "2025-05-05");
        assert_eq!(parse_match_date("1st Match, 26 April 2025", 2024), "2025-04-26");
        assert_eq!(parse_match_date("September 3 2024", 2025), "2024-09-03");
    }

    #[test]
    fn test_parse_date_skips_weekday_before_day() {
        assert_eq!(parse_match_date("Sun 11 May", 2025), "2025-05-11");
    }

    #[test]
    fn test_parse_date_malformed_is_empty() {
        assert_eq!(parse_match_date("", 2025), "");
        assert_eq!(parse_match_date("Live now", 2025), "");
        assert_eq!(parse_match_date("Feb 30", 2025), "");
        assert_eq!(parse_match_date("Foo 12", 2025), "");
    }

    #[test]
    fn test_venue_city() {
        assert_eq!(venue_city("Gaddafi Stadium, Lahore"), "Lahore");
        assert_eq!(venue_city("National Stadium"), "Karachi");
        assert_eq!(venue_city("Pindi Cricket Ground"), "Pindi");
        assert_eq!(venue_city("Dubai, UAE"), "Dubai");
        assert_eq!(venue_city("   "), "Unknown");
    }
}
