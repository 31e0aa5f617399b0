// BI Analytics Demo - Dashboard Server
// Serves the dashboard page plus the one-shot figure endpoint its load script calls

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use bi_analytics::{logging, render_page, ChartKind, DashboardConfig, SyntheticDataset};

/// Shared application state (read-only after startup)
#[derive(Clone)]
struct AppState {
    config: Arc<DashboardConfig>,
    dataset: Arc<SyntheticDataset>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET / - Dashboard page
async fn serve_index(State(state): State<AppState>) -> impl IntoResponse {
    Html(render_page(&state.config, &state.dataset))
}

/// GET /_dash-figure/:id - Build one chart for its placeholder
async fn get_figure(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let kind = match ChartKind::from_id(&id) {
        Ok(kind) => kind,
        Err(e) => {
            tracing::warn!(chart = %id, "unknown chart requested");
            return (StatusCode::NOT_FOUND, Json(ApiResponse::<()>::error(e.to_string()))).into_response();
        }
    };

    match kind.build(&state.dataset) {
        Ok(figure) => {
            tracing::debug!(chart = %id, traces = figure.trace_count(), "figure built");
            (StatusCode::OK, Json(figure)).into_response()
        }
        Err(e) => {
            tracing::error!(chart = %id, error = %e, "failed to build figure");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::<()>::error(e.to_string()))).into_response()
        }
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/_dash-figure/:id", get(get_figure))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(false);

    println!("🚀 Starting Interactive Dashboard Demo...");

    let config = DashboardConfig::from_env();
    let dataset = SyntheticDataset::generate(&config.generator).context("Failed to generate dashboard data")?;
    tracing::info!(
        customers = dataset.customers.len(),
        days = dataset.financials.len(),
        seed = config.generator.seed,
        "dashboard data generated"
    );

    let addr = config.bind_addr();
    let url = config.url();

    let state = AppState {
        config: Arc::new(config),
        dataset: Arc::new(dataset),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("📊 Navigate to {} to view the dashboard", url);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, build_router(state))
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use bi_analytics::GeneratorConfig;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = DashboardConfig {
            generator: GeneratorConfig {
                customers: 50,
                ..Default::default()
            },
            ..Default::default()
        };
        let dataset = SyntheticDataset::generate(&config.generator).unwrap();

        AppState {
            config: Arc::new(config),
            dataset: Arc::new(dataset),
        }
    }

    async fn get_body(uri: &str) -> (StatusCode, String) {
        let response = build_router(test_state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_index_page() {
        let (status, body) = get_body("/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("📊 Customer Analytics Dashboard"));
        assert!(body.contains("id=\"high-risk-table\""));
        for kind in ChartKind::ALL {
            assert!(body.contains(&format!("<div id=\"{}\"", kind.id())));
        }
    }

    #[tokio::test]
    async fn test_figure_endpoint() {
        let (status, body) = get_body("/_dash-figure/revenue-trend").await;
        assert_eq!(status, StatusCode::OK);

        let figure: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(figure["data"].as_array().unwrap().len(), 2);
        assert_eq!(figure["data"][0]["name"], "Revenue");

        let (_, body) = get_body("/_dash-figure/customer-segments").await;
        let figure: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(figure["data"][0]["type"], "pie");
    }

    #[tokio::test]
    async fn test_unknown_figure_is_404() {
        let (status, body) = get_body("/_dash-figure/does-not-exist").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("unknown chart id: does-not-exist"));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_body("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"success\":true"));
    }
}
