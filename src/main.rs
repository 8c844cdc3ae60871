use std::net::SocketAddr;
use std::time::Duration;

use lumina_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes::{build_router, RateLimits},
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool)?;

    let max_idle = Duration::from_secs(config.session_idle_minutes * 60);
    app_state
        .sessions
        .spawn_idle_sweeper(max_idle, Duration::from_secs(60));
    info!(idle_minutes = config.session_idle_minutes, "Idle session sweeper started");

    let app = build_router(
        app_state,
        RateLimits {
            public_rps: config.public_rps,
            generation_rps: config.generation_rps,
        },
    );

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
