use dotenvy::dotenv;
use sqlx::PgPool;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use storefront_reviews::config::Config;
use storefront_reviews::db::pool::get_db_pool;
use storefront_reviews::startup::build_router;

#[tokio::main]
async fn main() {
    dotenv().ok();
    Config::init();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let pool = get_db_pool().await;
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    let app = build_router(pool.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], Config::get().server_port));
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind listener");
    tracing::info!("Server running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pool))
        .await
        .expect("Server encountered an error");

    tracing::info!("Shutdown complete.");
}

async fn shutdown_signal(pool: PgPool) {
    signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("🛠️ Closing database pool...");
    pool.close().await;
    tracing::info!("✅ Database pool closed. Server shutting down.");
}
