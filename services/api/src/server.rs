use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use carshare::clock::SystemClock;
use carshare::config::AppConfig;
use carshare::error::AppError;
use carshare::marketplace::{InMemoryMarketplace, MarketplaceService, RentalPolicy};
use carshare::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let policy = RentalPolicy::from(&config.rental);
    let repository = Arc::new(InMemoryMarketplace::default());
    let clock = Arc::new(SystemClock);
    let marketplace = Arc::new(MarketplaceService::new(repository, clock.clone(), policy));

    let sweeper = marketplace
        .refresher()
        .spawn_daily(clock, config.rental.refresh_interval());

    let app = with_marketplace_routes(marketplace)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        max_rent_days = policy.max_rent_days(),
        booking_window_days = policy.booking_window_days(),
        refresh_interval_secs = config.rental.refresh_interval_secs,
        "car-sharing marketplace ready"
    );

    let served = axum::serve(listener, app).await;
    sweeper.abort();
    served?;
    Ok(())
}
