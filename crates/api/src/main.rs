use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use glasslead_api::config::{LogFormat, ServerConfig};
use glasslead_api::router::build_app_router;
use glasslead_api::state::AppState;
use glasslead_db::store::PgLeadStore;
use glasslead_events::{EventBus, LeadNotifier, WebhookDelivery};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();
    init_tracing(config.log_format);
    tracing::info!(
        host = %config.host,
        port = config.port,
        duplicate_window_secs = config.duplicate_window_secs,
        "Loaded server configuration"
    );

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = glasslead_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    glasslead_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    glasslead_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    let event_bus = Arc::new(EventBus::default());
    let notifier = spawn_lead_notifier(&config, &event_bus);

    let state = AppState {
        store: Arc::new(PgLeadStore::new(pool)),
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
    };
    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "Accepting lead submissions");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // The router (and its bus handle) is gone; dropping ours closes the
    // channel so the relay drains and exits.
    drop(event_bus);
    if let Some(handle) = notifier {
        let grace = Duration::from_secs(config.shutdown_timeout_secs);
        match tokio::time::timeout(grace, handle).await {
            Ok(_) => tracing::info!("Lead notification relay stopped"),
            Err(_) => tracing::warn!("Lead notification relay did not stop in time"),
        }
    }

    tracing::info!("Shutdown complete");
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "glasslead_api=debug,glasslead_events=info,tower_http=debug".into());

    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

/// Start the webhook relay when `LEAD_WEBHOOK_URL` is configured.
fn spawn_lead_notifier(config: &ServerConfig, bus: &EventBus) -> Option<JoinHandle<()>> {
    let Some(url) = config.lead_webhook_url.clone() else {
        tracing::info!("LEAD_WEBHOOK_URL not set, lead notifications disabled");
        return None;
    };

    let delivery = WebhookDelivery::new().expect("Failed to build webhook HTTP client");
    tracing::info!(%url, "Relaying submitted leads to notification webhook");
    Some(tokio::spawn(LeadNotifier::new(delivery, url).run(bus.subscribe())))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
