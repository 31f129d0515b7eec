use regex::Regex;
use std::sync::OnceLock;

use super::merge::{decided, newest_results};
use super::random::Randomness;
use crate::db::models::MatchResult;

/// Headlines generated from results; at most this many.
const RESULT_HEADLINES: usize = 5;

/// Editorial items appended after the generated headlines.
pub const STATIC_NEWS: [&str; 4] = [
    "PSL confirms final to be held at Gaddafi Stadium on May 18 as scheduled",
    "PSL X trophy 'Luminara' unveiled, adorned with over 22,000 zircon stones",
    "Babar Azam reaches 2000 runs in PSL history, becomes fastest to milestone",
    "Shadab Khan takes 100th PSL wicket, third bowler to achieve feat",
];

const NEUTRAL_ADJECTIVES: [&str; 4] = ["exciting", "competitive", "quality", "entertaining"];

/// One headline per recent dated result, newest first, then the static
/// items. Results whose winner is neither side produce no headline.
pub fn generate_news(results: &[MatchResult], rng: &Randomness) -> Vec<String> {
    let mut news: Vec<String> = newest_results(results)
        .into_iter()
        .take(RESULT_HEADLINES)
        .filter_map(|r| {
            let (winner, loser, margin) = decided(r)?;
            Some(format!(
                "{} beat {} {} in a {} contest",
                winner,
                loser,
                margin,
                describe_contest(&r.result, rng)
            ))
        })
        .collect();
    news.extend(STATIC_NEWS.iter().map(|s| s.to_string()));
    news
}

fn margin_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)by\s+(\d+)\s+(run|wicket)").expect("static regex"))
}

/// Adjective for a result. Close and lopsided finishes are described by rule;
/// everything else draws a neutral adjective at random.
pub fn describe_contest(result: &str, rng: &Randomness) -> &'static str {
    let lower = result.to_lowercase();
    if lower.contains("super over") || lower.contains("last ball") {
        return "thrilling";
    }
    if let Some(caps) = margin_re().captures(&lower) {
        let size: u32 = caps[1].parse().unwrap_or(0);
        let one_sided = match &caps[2] {
            "wicket" => size >= 10,
            _ => size >= 100,
        };
        if one_sided {
            return "one-sided";
        }
        if size <= 2 {
            return "nail-biting";
        }
    }
    NEUTRAL_ADJECTIVES[rng.index(NEUTRAL_ADJECTIVES.len())]
}
