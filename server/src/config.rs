// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  Postgres,
  Memory,
}

impl FromStr for StoreBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
      "memory" => Ok(StoreBackend::Memory),
      other => Err(AppError::Config(format!(
        "Invalid STORE_BACKEND '{}': expected 'postgres' or 'memory'",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub store_backend: StoreBackend,
  pub database_url: Option<String>,
  pub database_max_connections: u32,

  /// HMAC secret for bearer tokens.
  pub auth_token_secret: String,
  /// Argon2 hash of the key trusted server callers present. `None` disables
  /// service access.
  pub service_key_hash: Option<String>,

  /// Put cancelled units back into product stock. Off by default: stock is
  /// only reconciled at order placement.
  pub restore_stock_on_cancel: bool,

  pub seed_db: bool,
  pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("store_backend", &self.store_backend)
      .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
      .field("database_max_connections", &self.database_max_connections)
      .field("auth_token_secret", &"[REDACTED]")
      .field("service_key_hash", &self.service_key_hash.is_some())
      .field("restore_stock_on_cancel", &self.restore_stock_on_cancel)
      .field("seed_db", &self.seed_db)
      .field("log_format", &self.log_format)
      .finish()
  }
}

fn parse_bool(var_name: &str, raw: &str) -> Result<bool> {
  raw
    .parse::<bool>()
    .map_err(|e| AppError::Config(format!("Invalid {} value: {}", var_name, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

    let store_backend = get_env("STORE_BACKEND")
      .unwrap_or_else(|_| "postgres".to_string())
      .parse::<StoreBackend>()?;
    let database_url = match store_backend {
      StoreBackend::Postgres => Some(get_env("DATABASE_URL")?),
      StoreBackend::Memory => get_env("DATABASE_URL").ok(),
    };
    let database_max_connections = get_env("DATABASE_MAX_CONNECTIONS")
      .unwrap_or_else(|_| "10".to_string())
      .parse::<u32>()
      .map_err(|e| AppError::Config(format!("Invalid DATABASE_MAX_CONNECTIONS: {}", e)))?;

    let auth_token_secret = get_env("AUTH_TOKEN_SECRET")?;
    if auth_token_secret.len() < 32 {
      return Err(AppError::Config(
        "AUTH_TOKEN_SECRET must be at least 32 bytes long".to_string(),
      ));
    }
    let service_key_hash = get_env("SERVICE_KEY_HASH").ok().filter(|h| !h.trim().is_empty());

    let restore_stock_on_cancel = parse_bool(
      "RESTORE_STOCK_ON_CANCEL",
      &get_env("RESTORE_STOCK_ON_CANCEL").unwrap_or_else(|_| "false".to_string()),
    )?;
    let seed_db = parse_bool("SEED_DB", &get_env("SEED_DB").unwrap_or_else(|_| "false".to_string()))?;

    let log_format = match get_env("LOG_FORMAT").unwrap_or_default().to_ascii_lowercase().as_str() {
      "json" => LogFormat::Json,
      "" | "pretty" | "text" => LogFormat::Pretty,
      other => return Err(AppError::Config(format!("Invalid LOG_FORMAT '{}'", other))),
    };

    Ok(Self {
      server_host,
      server_port,
      store_backend,
      database_url,
      database_max_connections,
      auth_token_secret,
      service_key_hash,
      restore_stock_on_cancel,
      seed_db,
      log_format,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| map.get(name).cloned()
  }

  const SECRET: &str = "0123456789abcdef0123456789abcdef";

  #[test]
  fn memory_backend_needs_no_database_url() {
    let cfg = AppConfig::from_lookup(lookup_from(&[("STORE_BACKEND", "memory"), ("AUTH_TOKEN_SECRET", SECRET)])).unwrap();
    assert_eq!(cfg.store_backend, StoreBackend::Memory);
    assert_eq!(cfg.server_port, 8080);
    assert!(!cfg.restore_stock_on_cancel);
    assert!(cfg.service_key_hash.is_none());
  }

  #[test]
  fn postgres_backend_requires_database_url() {
    let err = AppConfig::from_lookup(lookup_from(&[("AUTH_TOKEN_SECRET", SECRET)])).unwrap_err();
    assert!(err.to_string().contains("DATABASE_URL"));
  }

  #[test]
  fn short_token_secret_is_rejected() {
    let err =
      AppConfig::from_lookup(lookup_from(&[("STORE_BACKEND", "memory"), ("AUTH_TOKEN_SECRET", "short")])).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
  }

  #[test]
  fn flags_are_parsed() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
      ("STORE_BACKEND", "memory"),
      ("AUTH_TOKEN_SECRET", SECRET),
      ("RESTORE_STOCK_ON_CANCEL", "true"),
      ("LOG_FORMAT", "json"),
    ]))
    .unwrap();
    assert!(cfg.restore_stock_on_cancel);
    assert_eq!(cfg.log_format, LogFormat::Json);

    let err = AppConfig::from_lookup(lookup_from(&[
      ("STORE_BACKEND", "memory"),
      ("AUTH_TOKEN_SECRET", SECRET),
      ("SEED_DB", "maybe"),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("SEED_DB"));
  }
}
