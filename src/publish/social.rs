use serde::Serialize;

use super::views::standings;
use crate::db::models::Dataset;
use crate::pipeline::random::Randomness;
use crate::sources::names::FRANCHISES;

pub const OFFICIAL: &str = "PSL Official";
pub const ANALYST: &str = "Cricket Analyst";

/// A generated highlight post. Engagement counts are random placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialPost {
    pub author: String,
    pub content: String,
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
    pub engagement_approximate: bool,
}

const PLAYER_STATS: &[&str] = &[
    "Mohammad Rizwan (Multan Sultans) has scored 368 runs in 10 innings at an average of 58.25",
    "Babar Azam (Peshawar Zalmi) leads the run charts with 386 runs at a strike rate of 156.32",
    "Shadab Khan (Islamabad United) has taken 14 wickets while maintaining an economy of 7.26",
    "Shaheen Afridi (Lahore Qalandars) has picked up 12 wickets in 8 matches",
    "Fakhar Zaman (Lahore Qalandars) has hit the most sixes (24) in the tournament",
    "Hasan Ali (Karachi Kings) has been impressive with 11 wickets",
    "Saud Shakeel (Quetta Gladiators) has scored 275 runs at an average of 45.83",
];

/// The franchise named earliest in a headline (the winner, for result
/// headlines), else the league account.
pub fn headline_author(headline: &str) -> &'static str {
    FRANCHISES
        .iter()
        .filter_map(|f| headline.find(f.name).map(|at| (at, f.name)))
        .min_by_key(|(at, _)| *at)
        .map_or(OFFICIAL, |(_, name)| name)
}

/// Ranges are inclusive `(low, high)` pairs.
fn post(
    author: &str,
    content: String,
    rng: &Randomness,
    likes: (u32, u32),
    comments: (u32, u32),
    shares: (u32, u32),
) -> SocialPost {
    SocialPost {
        author: author.to_string(),
        content,
        likes: rng.between(likes.0, likes.1),
        comments: rng.between(comments.0, comments.1),
        shares: rng.between(shares.0, shares.1),
        engagement_approximate: true,
    }
}

/// Standings post, latest-headline post (when there is news) and an analyst post.
pub fn social_highlights(dataset: &Dataset, rng: &Randomness) -> Vec<SocialPost> {
    let top: Vec<String> = standings(dataset)
        .into_iter()
        .take(3)
        .map(|e| format!("{} ({})", e.team, e.record.points))
        .collect();

    let mut posts = vec![post(
        OFFICIAL,
        format!(
            "Points Table Update: {} leading the table! Which teams do you think will make it to the playoffs? #PSL2025",
            top.join(", ")
        ),
        rng,
        (2_000, 7_900),
        (500, 900),
        (1_000, 3_900),
    )];

    if let Some(headline) = dataset.news_items.first() {
        posts.push(post(
            headline_author(headline),
            format!("{} What a game! Thanks to all our fans for their support. #PSL2025", headline),
            rng,
            (3_000, 8_900),
            (300, 700),
            (1_000, 4_900),
        ));
    }

    let stat = PLAYER_STATS[rng.index(PLAYER_STATS.len())];
    posts.push(post(
        ANALYST,
        format!(
            "{} and continues to impress in #PSL2025. Teams are fighting for playoff spots. #CricketStats",
            stat
        ),
        rng,
        (1_000, 4_900),
        (200, 600),
        (500, 900),
    ));
    posts
}
