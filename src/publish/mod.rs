pub mod social;
pub mod views;

pub use social::{social_highlights, SocialPost};

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::db::models::Dataset;
use crate::pipeline::{Randomness, RefreshOutcome, RefreshReport};

/// Consumer of published data. Calls may repeat with the same input and
/// must be safe to do so.
pub trait Renderer: Send + Sync {
    fn render(&self, dataset: &Dataset);
    fn render_news(&self, news_items: &[String]);
    fn render_social_highlights(&self, dataset: &Dataset, posts: &[SocialPost]);
}

/// Everything consumers can read. Owned by `main` and injected into the
/// Publisher and the dashboard.
#[derive(Default)]
pub struct AppState {
    pub dataset: RwLock<Option<Dataset>>,
    pub social: RwLock<Vec<SocialPost>>,
    pub last_report: RwLock<Option<RefreshReport>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct Publisher {
    state: Arc<AppState>,
    renderers: Vec<Arc<dyn Renderer>>,
    rng: Arc<Randomness>,
}

impl Publisher {
    pub fn new(state: Arc<AppState>, renderers: Vec<Arc<dyn Renderer>>, rng: Arc<Randomness>) -> Self {
        Publisher {
            state,
            renderers,
            rng,
        }
    }

    /// Record the cycle's report and, when it produced a Dataset, replace the
    /// published state and re-render. A cycle without data leaves the previous
    /// state in place.
    pub async fn publish(&self, outcome: RefreshOutcome) {
        *self.state.last_report.write().await = Some(outcome.report);

        let Some(dataset) = outcome.dataset else {
            warn!("Nothing to publish; previous state kept");
            return;
        };
        let posts = social_highlights(&dataset, &self.rng);

        for renderer in &self.renderers {
            renderer.render(&dataset);
            renderer.render_news(&dataset.news_items);
            renderer.render_social_highlights(&dataset, &posts);
        }

        *self.state.social.write().await = posts;
        *self.state.dataset.write().await = Some(dataset);
    }
}

/// Writes published data to the log.
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn render(&self, dataset: &Dataset) {
        info!(
            "── Standings (updated {}) ──",
            dataset.last_updated.format("%Y-%m-%d %H:%M UTC")
        );
        for entry in views::standings(dataset) {
            let r = &entry.record;
            info!(
                "{:>2}. {:<18} M{:>2} W{:>2} L{:>2} Pts{:>3} NRR {:>7} {}{}",
                entry.position,
                entry.team,
                r.matches,
                r.wins,
                r.losses,
                r.points,
                r.nrr,
                r.form,
                if r.form_approximate { " (approx.)" } else { "" }
            );
        }
        let today = chrono::Utc::now().date_naive();
        for upcoming in views::upcoming_fixtures(dataset, today).iter().take(3) {
            let f = &upcoming.fixture;
            info!(
                "Next: {} {} vs {} on {} at {}",
                upcoming.id, f.team1, f.team2, f.date, f.venue
            );
        }
    }

    fn render_news(&self, news_items: &[String]) {
        for item in news_items {
            info!("News: {}", item);
        }
    }

    fn render_social_highlights(&self, _dataset: &Dataset, posts: &[SocialPost]) {
        for post in posts {
            info!(
                "Social [{}] {} (~{} likes, approximate)",
                post.author, post.content, post.likes
            );
        }
    }
}
