//! JSON publisher for both datasets.
//!
//! Each request runs one full extraction. Failures are logged with their
//! cause and reported to clients only as a generic error body.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Local;
use ffws_web::{Dataset, Record, Scraper};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<Scraper>,
}

#[derive(Serialize)]
struct DataResponse<'a> {
    status: &'static str,
    data: &'a [Record],
    timestamp: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn router(scraper: Arc<Scraper>) -> Router {
    Router::new()
        .route("/api/water-level", get(water_level_handler))
        .route("/api/rainfall", get(rainfall_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { scraper })
}

pub async fn serve(scraper: Arc<Scraper>, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(target: "ffws.server", addr = %listener.local_addr()?, "server.listening");

    axum::serve(listener, router(scraper))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!(target: "ffws.server", "server.shutdown");
        })
        .await
        .context("server error")
}

async fn water_level_handler(State(state): State<AppState>) -> Response {
    publish(&state, Dataset::WaterLevel).await
}

async fn rainfall_handler(State(state): State<AppState>) -> Response {
    publish(&state, Dataset::Rainfall).await
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn publish(state: &AppState, dataset: Dataset) -> Response {
    match state.scraper.fetch(dataset).await {
        Ok(extraction) if !extraction.is_empty() => Json(DataResponse {
            status: "success",
            data: &extraction.records,
            timestamp: Local::now().to_rfc3339(),
        })
        .into_response(),
        // An empty table is published as a failure, matching the error
        // contract clients of the JSON endpoints already rely on.
        Ok(_) => {
            warn!(target: "ffws.server", %dataset, "publish.empty");
            failure()
        }
        Err(err) => {
            error!(target: "ffws.server", %dataset, error = %err, "publish.failed");
            failure()
        }
    }
}

fn failure() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            status: "error",
            message: "Failed to fetch data",
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use ffws_common::retry::RetryPolicy;
    use ffws_drivers::ffws_browser::testing::{Script, ScriptedLauncher};
    use ffws_drivers::{Navigator, SessionManager, SettlePolicy};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    const PAGE: &str = "<table class=\"table-type1\"><thead><tr><th>Station</th><th>Current</th>\
        <th>30min</th><th>1hr</th><th>2hr</th><th>Alert</th><th>Alarm</th><th>Critical</th></tr></thead>\
        <tbody><tr><th>Sto Nino</th><td>12.43</td><td>12.40</td><td>12.38</td><td>12.31</td>\
        <td>15.00</td><td>16.00</td><td>18.00</td></tr></tbody></table>";

    fn app(script: Script) -> (Router, ScriptedLauncher) {
        let launcher = ScriptedLauncher::new(script);
        let retry = RetryPolicy::new(3, Duration::ZERO);
        let sessions = SessionManager::new(Arc::new(launcher.clone())).with_retry(retry);
        let scraper = Scraper::new(sessions, Navigator::new(retry, SettlePolicy::None));
        (router(Arc::new(scraper)), launcher)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn water_level_success_body() {
        let (app, launcher) = app(Script::serving(PAGE));
        let (status, body) = get_json(app, "/api/water-level").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"][0]["station"], "Sto Nino");
        assert_eq!(body["data"][0]["wl_2hr"], "12.31");
        assert!(body["data"][0]["timestamp"].is_string());
        assert!(
            chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok()
        );
        assert_eq!(launcher.ledger().released, 1);
    }

    #[tokio::test]
    async fn rainfall_maps_its_own_fields() {
        let (app, _) = app(Script::serving(PAGE));
        let (status, body) = get_json(app, "/api/rainfall").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["rf_24hr"], "18.00");
    }

    #[tokio::test]
    async fn failure_hides_the_cause() {
        let (app, launcher) = app(Script {
            launch_failures: u32::MAX,
            ..Script::default()
        });
        let (status, body) = get_json(app, "/api/water-level").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            serde_json::json!({"status": "error", "message": "Failed to fetch data"})
        );
        assert_eq!(launcher.ledger().launch_attempts, 3);
    }

    #[tokio::test]
    async fn empty_table_is_reported_as_an_error() {
        let (app, _) = app(Script::serving(
            "<table class=\"table-type1\"><thead><tr><th>Station</th></tr></thead></table>",
        ));
        let (status, body) = get_json(app, "/api/rainfall").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn health_is_static() {
        let (app, launcher) = app(Script::default());
        let (status, body) = get_json(app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "ok"}));
        assert_eq!(launcher.ledger().launch_attempts, 0);
    }
}
