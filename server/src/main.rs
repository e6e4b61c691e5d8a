// server/src/main.rs

use std::io;
use std::sync::Arc;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

use storefront::config::{AppConfig, LogFormat, StoreBackend};
use storefront::errors::AppError;
use storefront::state::AppState;
use storefront::store::{MemoryOrderStore, OrderStore, PgOrderStore};
use storefront::telemetry;
use storefront::web::configure_app_routes;

async fn build_store(config: &AppConfig) -> Result<Arc<dyn OrderStore>, AppError> {
  match config.store_backend {
    StoreBackend::Postgres => {
      let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| AppError::Config("DATABASE_URL is required for the postgres backend".to_string()))?;
      let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await?;
      info!("Successfully connected to the database.");
      if config.seed_db {
        warn!("SEED_DB only applies to the memory backend; ignoring.");
      }
      Ok(Arc::new(PgOrderStore::new(pool)))
    }
    StoreBackend::Memory => {
      let store = MemoryOrderStore::new();
      if config.seed_db {
        store.seed_demo();
      }
      info!("Using the in-memory store.");
      Ok(Arc::new(store))
    }
  }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      telemetry::init_tracing(LogFormat::Pretty);
      error!(error = %e, "Failed to load application configuration.");
      return Err(io::Error::new(io::ErrorKind::InvalidInput, e.to_string()));
    }
  };
  telemetry::init_tracing(app_config.log_format);
  info!(config = ?app_config, "Starting storefront server...");

  let store = match build_store(&app_config).await {
    Ok(store) => store,
    Err(e) => {
      error!(error = %e, "Failed to initialise the order store.");
      return Err(io::Error::new(io::ErrorKind::Other, e.to_string()));
    }
  };

  let app_state = AppState::build(store, app_config.clone());

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
