use std::net::SocketAddr;

use tracing::{Level, info};

use mixoff_server::config::AppConfig;
use mixoff_server::database::init_db;
use mixoff_server::state::AppState;
use mixoff_server::{build_router, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database.url).await?;
    seed::seed_role_permissions(&db).await?;
    seed::ensure_indexes(&db).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = build_router(AppState { db, config });

    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
