//! HTTP transport shared by the scraping adapters.
//!
//! Every page is fetched directly first. When that fails (transport error or
//! non-success status) the request is retried once through the relay layer:
//! an ordered list of relay prefixes that take the target URL as a query
//! parameter. The relay layer starts from the relay that last worked and
//! rotates through the list at most once.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::provider::AdapterError;

/// A fetched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Page transport used by adapters. Implementations include any retry policy.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page, AdapterError>;
}

/// Build the relay URL for `target` behind `prefix`.
pub fn relay_url(prefix: &str, target: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{}{}", prefix, encoded)
}

/// reqwest-backed transport: direct fetch, then one relayed retry.
pub struct HttpFetcher {
    http: Client,
    relays: Vec<String>,
    /// Index of the relay that succeeded most recently.
    last_good_relay: AtomicUsize,
}

impl HttpFetcher {
    pub fn new(relays: Vec<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("psl-stats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(HttpFetcher {
            http,
            relays,
            last_good_relay: AtomicUsize::new(0),
        })
    }

    async fn get(&self, url: &str) -> Result<Page, AdapterError> {
        let network = |reason: String| AdapterError::Network {
            url: url.to_string(),
            reason,
        };

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| network(e.to_string()))?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await.map_err(|e| network(e.to_string()))?;

        let page = Page {
            status,
            content_type,
            body,
        };
        if !page.is_success() {
            return Err(network(format!("HTTP {}", status)));
        }
        Ok(page)
    }

    /// Try each relay once, starting at the last one that worked.
    async fn fetch_via_relay(&self, url: &str) -> Result<Page, AdapterError> {
        if self.relays.is_empty() {
            return Err(AdapterError::Network {
                url: url.to_string(),
                reason: "no relay configured".to_string(),
            });
        }

        let start = self.last_good_relay.load(Ordering::Relaxed) % self.relays.len();
        let mut last_err = None;
        for offset in 0..self.relays.len() {
            let idx = (start + offset) % self.relays.len();
            let relayed = relay_url(&self.relays[idx], url);
            debug!("Fetching via relay {}: {}", idx, relayed);
            match self.get(&relayed).await {
                Ok(page) => {
                    self.last_good_relay.store(idx, Ordering::Relaxed);
                    return Ok(page);
                }
                Err(e) => {
                    warn!("Relay {} failed for {}: {}", idx, url, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| AdapterError::Network {
            url: url.to_string(),
            reason: "all relays failed".to_string(),
        }))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, AdapterError> {
        match self.get(url).await {
            Ok(page) => Ok(page),
            Err(e) => {
                info!("Direct fetch failed ({}), retrying via relay", e);
                self.fetch_via_relay(url).await
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted transport for adapter tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct ScriptedFetch {
        pages: HashMap<String, String>,
        pub requested: Mutex<Vec<String>>,
    }

    impl ScriptedFetch {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }
    }

    #[async_trait]
    impl Fetch for ScriptedFetch {
        async fn fetch(&self, url: &str) -> Result<Page, AdapterError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(body) => Ok(Page {
                    status: 200,
                    content_type: Some("text/html".into()),
                    body: body.clone(),
                }),
                None => Err(AdapterError::Network {
                    url: url.to_string(),
                    reason: "HTTP 404".into(),
                }),
            }
        }
    }

    /// Serve `app` on an ephemeral local port.
    pub async fn serve(app: axum::Router) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }
}
