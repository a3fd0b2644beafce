use std::net::SocketAddr;

use anyhow::Context;
use db::{DBService, seed};
use server::{Deployment, app, config::Config};
use tracing::info;
use utils::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let config = Config::from_env()?;
    let db = DBService::new(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    if config.seed_defaults {
        seed::run(
            &db.pool,
            &seed::SeedOptions {
                admin_password: config.default_admin_password.clone(),
                password_cost: config.password_cost,
            },
        )
        .await
        .context("failed to seed default data")?;
    }

    let addr = SocketAddr::new(config.host, config.port);
    info!(%addr, env = %config.app_env, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app(Deployment::new(db, config)).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
