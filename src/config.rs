use clap::Parser;
use std::time::Duration;

/// PSL standings, fixtures and results with multi-source fallback
#[derive(Parser, Debug, Clone)]
#[command(name = "psl-stats", version, about)]
pub struct Config {
    /// SQLite database path (":memory:" for a throwaway store)
    #[arg(long, env = "DATABASE_PATH", default_value = "psl_stats.db")]
    pub database_path: String,

    /// Minimum age of the stored snapshot before sources are queried again
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value = "3600")]
    pub refresh_interval_secs: u64,

    /// Upper bound on a single source adapter
    #[arg(long, env = "ADAPTER_TIMEOUT_SECS", default_value = "20")]
    pub adapter_timeout_secs: u64,

    /// Per-request HTTP timeout
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "10")]
    pub http_timeout_secs: u64,

    /// Relay prefixes tried in turn when a direct fetch fails
    #[arg(
        long,
        env = "RELAY_URLS",
        value_delimiter = ',',
        default_value = "https://corsproxy.io/?,https://api.allorigins.win/raw?url="
    )]
    pub relay_urls: Vec<String>,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "127.0.0.1:8080")]
    pub dashboard_addr: String,

    /// Season year used for Cricinfo series pages
    #[arg(long, env = "TOURNAMENT_YEAR", default_value = "2025")]
    pub tournament_year: i32,

    /// Keep running: serve the dashboard and refresh on an interval
    #[arg(long, env = "SERVE", default_value = "false")]
    pub serve: bool,

    /// Drop the stored snapshot before the first refresh
    #[arg(long, env = "FORCE_REFRESH", default_value = "false")]
    pub force_refresh: bool,

    /// Skip the embedded manual update source
    #[arg(long, env = "DISABLE_HARDCODED", default_value = "false")]
    pub disable_hardcoded: bool,

    /// Seed for form synthesis, news adjectives and engagement counts
    #[arg(long, env = "RNG_SEED")]
    pub rng_seed: Option<u64>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.refresh_interval_secs == 0 {
            anyhow::bail!("refresh_interval_secs must be positive");
        }
        if self.adapter_timeout_secs == 0 {
            anyhow::bail!("adapter_timeout_secs must be positive");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be positive");
        }
        if self.relay_urls.iter().all(|r| r.trim().is_empty()) {
            anyhow::bail!("at least one relay URL is required");
        }
        if !(2016..=2100).contains(&self.tournament_year) {
            anyhow::bail!(
                "tournament_year {} is outside the PSL era",
                self.tournament_year
            );
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Relay prefixes with blanks removed.
    pub fn relays(&self) -> Vec<String> {
        self.relay_urls
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect()
    }
}
