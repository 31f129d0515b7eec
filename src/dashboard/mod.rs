use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::controller::Controller;
use crate::publish::{views, AppState};

#[derive(Clone)]
pub struct DashboardState {
    pub app: Arc<AppState>,
    pub controller: Arc<Controller>,
    /// Client for the relay endpoint.
    pub http: reqwest::Client,
}

/// Build the Axum router for the dashboard.
pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/dataset", get(dataset_handler))
        .route("/api/standings", get(standings_handler))
        .route("/api/upcoming", get(upcoming_handler))
        .route("/api/news", get(news_handler))
        .route("/api/social", get(social_handler))
        .route("/api/debug", get(debug_handler))
        .route("/api/refresh", post(refresh_handler))
        .route("/api/proxy", get(proxy_handler).options(preflight_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn index_handler() -> impl IntoResponse {
    Html(DASHBOARD_HTML)
}

fn not_ready() -> (StatusCode, String) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "no dataset published yet".to_string(),
    )
}

/// GET /api/dataset
async fn dataset_handler(
    State(state): State<Arc<DashboardState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let dataset = state.app.dataset.read().await;
    dataset.clone().map(Json).ok_or_else(not_ready)
}

/// GET /api/standings
async fn standings_handler(
    State(state): State<Arc<DashboardState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let dataset = state.app.dataset.read().await;
    dataset
        .as_ref()
        .map(|ds| Json(views::standings(ds)))
        .ok_or_else(not_ready)
}

/// GET /api/upcoming
async fn upcoming_handler(
    State(state): State<Arc<DashboardState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let today = chrono::Utc::now().date_naive();
    let dataset = state.app.dataset.read().await;
    dataset
        .as_ref()
        .map(|ds| Json(views::upcoming_fixtures(ds, today)))
        .ok_or_else(not_ready)
}

/// GET /api/news
async fn news_handler(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let dataset = state.app.dataset.read().await;
    Json(
        dataset
            .as_ref()
            .map(|ds| ds.news_items.clone())
            .unwrap_or_default(),
    )
}

/// GET /api/social
async fn social_handler(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    Json(state.app.social.read().await.clone())
}

/// GET /api/debug
async fn debug_handler(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let report = state.app.last_report.read().await.clone();
    let last_updated = state
        .app
        .dataset
        .read()
        .await
        .as_ref()
        .map(|ds| ds.last_updated);
    Json(json!({
        "lastReport": report,
        "publishedLastUpdated": last_updated,
    }))
}

/// POST /api/refresh
async fn refresh_handler(
    State(state): State<Arc<DashboardState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .controller
        .force_cycle()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[derive(Debug, Deserialize)]
struct ProxyParams {
    url: Option<String>,
}

/// GET /api/proxy?url=<target>
///
/// Relays the target's status, content type and body.
async fn proxy_handler(
    State(state): State<Arc<DashboardState>>,
    Query(params): Query<ProxyParams>,
) -> Response {
    let Some(target) = params.url.filter(|u| !u.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "URL parameter is required" })),
        )
            .into_response();
    };

    let fetched = async {
        let resp = state.http.get(&target).send().await?;
        let status = resp.status();
        let content_type = resp.headers().get(header::CONTENT_TYPE).cloned();
        let body = resp.text().await?;
        Ok::<_, reqwest::Error>((status, content_type, body))
    }
    .await;

    match fetched {
        Ok((status, content_type, body)) => {
            let status =
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = (status, body).into_response();
            if let Some(ct) = content_type
                .as_ref()
                .and_then(|v| v.to_str().ok())
                .and_then(|v| header::HeaderValue::from_str(v).ok())
            {
                response.headers_mut().insert(header::CONTENT_TYPE, ct);
            }
            response
        }
        Err(e) => {
            warn!("Proxy fetch of {} failed: {}", target, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch the URL", "details": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// OPTIONS /api/proxy
async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>PSL Stats</title>
<style>
  :root {
    --bg: #0f1117;
    --card: #1a1d27;
    --border: #2a2d3a;
    --accent: #00a651;
    --red: #ff4f6a;
    --text: #e0e0e0;
    --muted: #8888aa;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: center; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; overflow: hidden; }
  .panel-header { padding: .9rem 1.2rem; border-bottom: 1px solid var(--border); font-weight: 600; display: flex; justify-content: space-between; align-items: center; }
  table { width: 100%; border-collapse: collapse; }
  th { padding: .7rem 1rem; text-align: left; font-size: .75rem; text-transform: uppercase; color: var(--muted); border-bottom: 1px solid var(--border); }
  td { padding: .65rem 1rem; font-size: .88rem; border-bottom: 1px solid #1e2130; }
  tr:last-child td { border-bottom: none; }
  .form span { display: inline-block; width: 1.3rem; text-align: center; border-radius: 3px; margin-right: 2px; font-size: .75rem; font-weight: 700; }
  .form .W { background: var(--accent); color: #000; }
  .form .L { background: var(--red); color: #000; }
  .form .N { background: var(--muted); color: #000; }
  .approx { color: var(--muted); font-size: .75rem; }
  .two-col { display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; }
  @media (max-width: 768px) { .two-col { grid-template-columns: 1fr; } }
  ul { list-style: none; }
  li { padding: .6rem 1.2rem; border-bottom: 1px solid #1e2130; font-size: .88rem; }
  .empty { color: var(--muted); text-align: center; padding: 2rem; font-size: .9rem; }
  .refresh-btn { background: none; border: 1px solid var(--border); color: var(--muted); padding: .3rem .8rem; border-radius: 6px; cursor: pointer; font-size: .8rem; }
  .refresh-btn:hover { border-color: var(--accent); color: var(--accent); }
  pre { padding: 1rem 1.2rem; font-size: .78rem; color: var(--muted); white-space: pre-wrap; }
</style>
</head>
<body>
<header>
  <h1>🏏 PSL Stats</h1>
  <span style="margin-left:auto;color:var(--muted);font-size:.8rem;" id="last-updated"></span>
  <button class="refresh-btn" onclick="forceRefresh()">↻ Force refresh</button>
</header>

<main>
  <div class="panel">
    <div class="panel-header">Points Table</div>
    <table>
      <thead><tr><th>#</th><th>Team</th><th>M</th><th>W</th><th>L</th><th>NR</th><th>Pts</th><th>NRR</th><th>Form</th></tr></thead>
      <tbody id="standings-tbody"><tr><td colspan="9" class="empty">Loading…</td></tr></tbody>
    </table>
  </div>

  <div class="two-col">
    <div class="panel">
      <div class="panel-header">Upcoming Matches</div>
      <table>
        <thead><tr><th>Match</th><th>Teams</th><th>Date</th><th>Venue</th></tr></thead>
        <tbody id="upcoming-tbody"><tr><td colspan="4" class="empty">Loading…</td></tr></tbody>
      </table>
    </div>
    <div class="panel">
      <div class="panel-header">News</div>
      <ul id="news-list"><li class="empty">Loading…</li></ul>
    </div>
  </div>

  <div class="two-col">
    <div class="panel">
      <div class="panel-header">Social Highlights <span class="approx">engagement approximate</span></div>
      <ul id="social-list"><li class="empty">Loading…</li></ul>
    </div>
    <div class="panel">
      <div class="panel-header">Last Refresh</div>
      <pre id="debug">Loading…</pre>
    </div>
  </div>
</main>

<script>
const formCells = f => [...(f || '')].map(c => `<span class="${c}">${c}</span>`).join('');

async function loadStandings() {
  const r = await fetch('/api/standings');
  if (!r.ok) return;
  const rows = await r.json();
  const tbody = document.getElementById('standings-tbody');
  if (!rows.length) { tbody.innerHTML = '<tr><td colspan="9" class="empty">No teams</td></tr>'; return; }
  tbody.innerHTML = rows.map(t => `<tr>
    <td>${t.position}</td>
    <td>${t.team}</td>
    <td>${t.matches}</td>
    <td>${t.wins}</td>
    <td>${t.losses}</td>
    <td>${t.noResults ?? '–'}</td>
    <td>${t.points}</td>
    <td>${t.nrr}</td>
    <td class="form">${formCells(t.form)}${t.formApproximate ? ' <span class="approx">approx.</span>' : ''}</td>
  </tr>`).join('');
}

async function loadUpcoming() {
  const r = await fetch('/api/upcoming');
  if (!r.ok) return;
  const rows = await r.json();
  const tbody = document.getElementById('upcoming-tbody');
  if (!rows.length) { tbody.innerHTML = '<tr><td colspan="4" class="empty">No fixtures</td></tr>'; return; }
  tbody.innerHTML = rows.map(m => `<tr>
    <td>${m.id}</td>
    <td>${m.team1} vs ${m.team2}</td>
    <td>${m.date} ${m.time}</td>
    <td>${m.venue}</td>
  </tr>`).join('');
}

async function loadNews() {
  const r = await fetch('/api/news');
  if (!r.ok) return;
  const items = await r.json();
  document.getElementById('news-list').innerHTML = items.length
    ? items.map(n => `<li>${n}</li>`).join('')
    : '<li class="empty">No news</li>';
}

async function loadSocial() {
  const r = await fetch('/api/social');
  if (!r.ok) return;
  const posts = await r.json();
  document.getElementById('social-list').innerHTML = posts.length
    ? posts.map(p => `<li><strong>${p.author}</strong><br>${p.content}<br><span class="approx">❤️ ~${p.likes} 💬 ~${p.comments} 🔄 ~${p.shares}</span></li>`).join('')
    : '<li class="empty">No posts</li>';
}

async function loadDebug() {
  const r = await fetch('/api/debug');
  if (!r.ok) return;
  const d = await r.json();
  document.getElementById('debug').textContent = JSON.stringify(d, null, 2);
  if (d.publishedLastUpdated) {
    document.getElementById('last-updated').textContent =
      'Data updated ' + new Date(d.publishedLastUpdated).toLocaleString();
  }
}

async function forceRefresh() {
  await fetch('/api/refresh', { method: 'POST' });
  loadAll();
}

async function loadAll() {
  await Promise.all([loadStandings(), loadUpcoming(), loadNews(), loadSocial(), loadDebug()]);
}

loadAll();
setInterval(loadAll, 60000);
</script>
</body>
</html>"#;
