//! HTTP endpoints
//!
//! REST API over the pipeline. Run triggering is guarded by the cron
//! secret; config writes and run deletion need dashboard credentials.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use newscast_config::DashboardConfig;
use newscast_core::{EpisodeManifest, RunStatus};
use newscast_pipeline::feed::{render_feed, FeedEpisode};
use newscast_pipeline::stages::publish::FEED_KEY;
use newscast_pipeline::RunRequest;

use crate::auth::{check_cron_secret, check_dashboard_auth};
use crate::state::AppState;

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/run", post(trigger_run))
        .route("/runs", get(list_runs))
        .route("/runs/:id", axum::routing::delete(delete_run))
        .route("/progress", get(run_progress))
        .route("/podcast/feed", get(podcast_feed))
        .route("/podcast/episodes", get(podcast_episode))
        .route("/config", get(get_config).put(put_config))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// POST /run - trigger the orchestrator. Parameters come from the JSON
/// body, falling back to query parameters.
async fn trigger_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RunRequest>,
    body: Option<Json<RunRequest>>,
) -> Response {
    if let Err(status) = check_cron_secret(&state.settings, &headers) {
        return error_response(status, "invalid or missing cron secret");
    }

    let request = match body {
        Some(Json(body)) => RunRequest {
            date: body.date.or(query.date),
            force_overwrite: body.force_overwrite.or(query.force_overwrite),
            window_hours: body.window_hours.or(query.window_hours),
        },
        None => query,
    };

    let outcome = state.orchestrator.run(request).await;
    let metrics = serde_json::json!({
        "timings": outcome.timings,
        "llm_calls": state
            .orchestrator
            .llm_calls(&outcome.run_id)
            .into_iter()
            .map(|(agent, calls)| serde_json::json!({"agent": agent, "calls": calls}))
            .collect::<Vec<_>>(),
    });

    if outcome.success {
        let episode = outcome.manifest.as_ref().map(|m| {
            serde_json::json!({
                "run_id": m.run_id,
                "date": m.date,
                "mp3_url": m.mp3_url,
                "duration_sec": m.duration_sec,
                "word_count": m.word_count,
                "stories": m.picks.len(),
                "reused": outcome.reused,
            })
        });
        Json(serde_json::json!({
            "success": true,
            "episode": episode,
            "metrics": metrics,
        }))
        .into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "success": false,
                "error": outcome.error,
                "metrics": metrics,
            })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
struct RunsQuery {
    #[serde(default)]
    page: Option<usize>,
    #[serde(rename = "pageSize")]
    page_size: Option<usize>,
    #[serde(rename = "runId")]
    run_id: Option<String>,
}

/// GET /runs - paginated summaries, or `{summary, manifest}` for one run.
async fn list_runs(State(state): State<AppState>, Query(query): Query<RunsQuery>) -> Response {
    if let Some(run_id) = query.run_id {
        let Some(summary) = state.registry.get(&run_id).await else {
            return error_response(StatusCode::NOT_FOUND, "run not found");
        };
        let manifest = state.registry.get_manifest(&run_id).await.ok();
        return Json(serde_json::json!({
            "summary": summary,
            "manifest": manifest,
        }))
        .into_response();
    }

    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);
    let (runs, total) = state.registry.list(page, page_size).await;
    Json(serde_json::json!({
        "runs": runs,
        "total": total,
        "page": page,
        "pageSize": page_size,
    }))
    .into_response()
}

/// DELETE /runs/:id - remove mp3, manifest, and the index entry.
async fn delete_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(run_id): Path<String>,
) -> Response {
    if let Err(status) = check_dashboard_auth(&state.settings, &headers) {
        return error_response(status, "authentication required");
    }
    match state.registry.remove(&run_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct ProgressQuery {
    #[serde(rename = "runId")]
    run_id: String,
}

/// GET /progress?runId= - latest progress snapshot.
async fn run_progress(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> Response {
    match state.progress.get(&query.run_id) {
        Some(progress) => Json(progress).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no progress for run"),
    }
}

/// GET /podcast/feed - the stored feed, or one synthesized from the runs
/// index when none has been published yet.
async fn podcast_feed(State(state): State<AppState>) -> Response {
    match state.store.get(FEED_KEY).await {
        Ok(xml) => feed_response(xml, "public, max-age=3600"),
        Err(_) => {
            let cfg = state.config_store.load().await;
            let index = state.registry.load_index().await;
            let episodes: Vec<FeedEpisode> = index
                .runs
                .iter()
                .filter(|r| r.status == RunStatus::Success)
                .filter_map(|r| {
                    r.episode_url.as_ref().map(|url| FeedEpisode {
                        title: format!("{} - {}", cfg.podcast.title, r.date),
                        description: format!("Daily episode for {}.", r.date),
                        pub_date: r.completed_at.unwrap_or(r.started_at),
                        enclosure_url: url.clone(),
                        enclosure_length: 0,
                        guid: r.run_id.clone(),
                        duration_sec: 0,
                    })
                })
                .collect();
            let xml = render_feed(&cfg.podcast, &episodes, Utc::now());
            feed_response(Bytes::from(xml), "public, max-age=300")
        }
    }
}

fn feed_response(xml: Bytes, cache_control: &str) -> Response {
    (
        [
            (
                header::CONTENT_TYPE,
                "application/rss+xml; charset=utf-8".to_string(),
            ),
            (header::CACHE_CONTROL, cache_control.to_string()),
        ],
        xml,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct EpisodeQuery {
    date: String,
}

/// GET /podcast/episodes?date=YYYY-MM-DD - stream the MP3, honoring
/// single-range requests with 206 responses.
async fn podcast_episode(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<EpisodeQuery>,
) -> Response {
    let key = EpisodeManifest::mp3_key(&query.date);
    let Ok(audio) = state.store.get(&key).await else {
        return error_response(StatusCode::NOT_FOUND, "no episode for date");
    };
    let total = audio.len() as u64;

    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .map(|raw| parse_range(raw, total));
    match range {
        None => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "audio/mpeg")
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::CONTENT_LENGTH, total)
            .body(axum::body::Body::from(audio))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Some(None) => Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{total}"))
            .body(axum::body::Body::empty())
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Some(Some((start, end))) => {
            let slice = audio.slice(start as usize..=end as usize);
            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, "audio/mpeg")
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_LENGTH, end - start + 1)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{total}"),
                )
                .body(axum::body::Body::from(slice))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

/// Parse a single-range `Range` header against a resource of `total`
/// bytes. Returns the inclusive (start, end), or None when unsatisfiable
/// or malformed.
pub fn parse_range(raw: &str, total: u64) -> Option<(u64, u64)> {
    if total == 0 {
        return None;
    }
    let spec = raw.strip_prefix("bytes=")?;
    // Only the first range of a multi-range request is honored.
    let spec = spec.split(',').next()?.trim();
    let (start_raw, end_raw) = spec.split_once('-')?;
    match (start_raw.is_empty(), end_raw.is_empty()) {
        // "-500": the final 500 bytes.
        (true, false) => {
            let suffix: u64 = end_raw.parse().ok()?;
            if suffix == 0 {
                return None;
            }
            let start = total.saturating_sub(suffix);
            Some((start, total - 1))
        }
        // "500-": from 500 to the end.
        (false, true) => {
            let start: u64 = start_raw.parse().ok()?;
            if start >= total {
                return None;
            }
            Some((start, total - 1))
        }
        // "0-499"
        (false, false) => {
            let start: u64 = start_raw.parse().ok()?;
            let end: u64 = end_raw.parse().ok()?;
            if start > end || start >= total {
                return None;
            }
            Some((start, end.min(total - 1)))
        }
        (true, true) => None,
    }
}

/// GET /config - the stored dashboard record.
async fn get_config(State(state): State<AppState>) -> Response {
    Json(state.config_store.load().await).into_response()
}

/// PUT /config - validate and persist a new dashboard record.
async fn put_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(cfg): Json<DashboardConfig>,
) -> Response {
    let principal = match check_dashboard_auth(&state.settings, &headers) {
        Ok(principal) => principal,
        Err(status) => return error_response(status, "authentication required"),
    };
    match state.config_store.save(cfg, &principal).await {
        Ok(saved) => Json(saved).into_response(),
        Err(err) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}

/// GET /health - env-var presence, an object-store round-trip, index
/// presence, and the episode count.
async fn health(State(state): State<AppState>) -> Response {
    let mut healthy = true;

    let probe = Bytes::from(format!("{{\"at\":\"{}\"}}", Utc::now().to_rfc3339()));
    let storage_ok = match state.store.put("health/probe.json", probe, "application/json").await {
        Ok(_) => state.store.get("health/probe.json").await.is_ok(),
        Err(_) => false,
    };
    if !storage_ok {
        healthy = false;
    }

    let index_present = state
        .store
        .exists("runs/index.json")
        .await
        .unwrap_or(false);
    let episode_count = state
        .store
        .list("episodes/")
        .await
        .map(|keys| keys.iter().filter(|k| k.ends_with("_manifest.json")).count())
        .unwrap_or(0);

    let body = serde_json::json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "env": state.settings.present_env_vars(),
        "checks": {
            "storage": if storage_ok { "ok" } else { "error" },
            "runs_index": if index_present { "present" } else { "missing" },
            "episodes": episode_count,
        },
    });
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
        .into_response()
}
