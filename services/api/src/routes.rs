use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use carshare::clock::Clock;
use carshare::marketplace::{marketplace_router, CarBrand, MarketplaceRepository, MarketplaceService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_marketplace_routes<R, C>(service: Arc<MarketplaceService<R, C>>) -> axum::Router
where
    R: MarketplaceRepository + 'static,
    C: Clock + 'static,
{
    marketplace_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/brands", axum::routing::get(brands_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Brand choices offered by the listing form.
pub(crate) async fn brands_endpoint() -> Json<Vec<&'static str>> {
    Json(CarBrand::ALL.iter().map(|brand| brand.label()).collect())
}
