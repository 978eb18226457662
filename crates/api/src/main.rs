//! API server entry point.

use std::error::Error;
use std::sync::Arc;

use api::AppState;
use api::config::{Config, LogFormat};
use domain::AccountService;
use gateways::{
    DisabledGeocoder, DisabledPaymentGateway, Geocoder, GoogleGeocoder, MidtransSnapGateway,
    PaymentGateway,
};
use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::ExposeSecret;
use store::{InMemoryStore, PostgresStore, Store};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn payment_gateway(config: &Config) -> Result<Arc<dyn PaymentGateway>, BoxError> {
    let gateway: Arc<dyn PaymentGateway> = match &config.midtrans {
        Some(midtrans) => {
            tracing::info!(production = midtrans.is_production, "Midtrans payments enabled");
            Arc::new(MidtransSnapGateway::new(midtrans.clone())?)
        }
        None => {
            tracing::warn!("MIDTRANS_SERVER_KEY not set, gateway payments are disabled");
            Arc::new(DisabledPaymentGateway)
        }
    };
    Ok(gateway)
}

fn geocoder(config: &Config) -> Result<Arc<dyn Geocoder>, BoxError> {
    let geocoder: Arc<dyn Geocoder> = match &config.google_maps_api_key {
        Some(key) => Arc::new(GoogleGeocoder::new(key.clone())?),
        None => {
            tracing::warn!("GOOGLE_MAPS_API_KEY not set, branch geocoding is disabled");
            Arc::new(DisabledGeocoder)
        }
    };
    Ok(geocoder)
}

async fn serve<S: Store>(
    store: S,
    config: &Config,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError> {
    let accounts = AccountService::new(store.clone())
        .with_session_ttl(chrono::Duration::hours(config.session_ttl_hours));

    if let Some(admin) = &config.admin {
        accounts
            .ensure_admin(&admin.name, &admin.email, admin.password.expose_secret())
            .await?;
    }

    let state = AppState::new(store, payment_gateway(config)?, geocoder(config)?)
        .with_accounts(accounts);
    let app = api::create_app(Arc::new(state), metrics_handle, &config.allowed_origins);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // 1. Load configuration (.env is optional)
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    // 2. Initialize tracing
    init_tracing(&config);

    // 3. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 4. Pick the storage backend and start serving
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url.expose_secret()).await?;
            store.run_migrations().await?;
            tracing::info!("connected to PostgreSQL, migrations applied");
            serve(store, &config, metrics_handle).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            serve(InMemoryStore::new(), &config, metrics_handle).await
        }
    }
}
