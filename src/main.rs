//! Bookstore Storefront Backend - service entrypoint

use std::sync::Arc;

use anyhow::Result;
use bookstore_backend::store::{PostgresStore, Store};
use bookstore_backend::{create_app, seed, AppState};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let store: Arc<dyn Store> = Arc::new(PostgresStore::new(db));
    seed::run(store.as_ref()).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => match async_nats::connect(&url).await {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, "NATS unavailable, order events disabled");
                None
            }
        },
        Err(_) => None,
    };

    let app = create_app(AppState { store, nats });

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    tracing::info!("🚀 bookstore backend listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
