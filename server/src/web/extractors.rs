// server/src/web/extractors.rs

//! Request extractors that turn credentials into a [`Caller`].

use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::Utc;
use futures_util::future::{ready, Ready};
use tracing::warn;

use crate::errors::AppError;
use crate::services::auth_service::{self, Caller};
use crate::services::tokens::{self, Role};
use crate::state::AppState;

pub const SERVICE_KEY_HEADER: &str = "X-Service-Key";

fn app_state(req: &HttpRequest) -> Result<&web::Data<AppState>, AppError> {
  req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured".to_string()))
}

fn caller_from_bearer(req: &HttpRequest, state: &AppState) -> Result<Caller, AppError> {
  let header = req
    .headers()
    .get(AUTHORIZATION)
    .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;
  let value = header
    .to_str()
    .map_err(|_| AppError::Auth("Malformed authorization header".to_string()))?;
  let token = value
    .strip_prefix("Bearer ")
    .or_else(|| value.strip_prefix("bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| AppError::Auth("Authorization header must be 'Bearer <token>'".to_string()))?;

  let claims = tokens::verify_token(token, state.config.auth_token_secret.as_bytes(), Utc::now())?;
  Ok(match claims.role {
    Role::Customer => Caller::Customer(claims.sub),
    Role::Admin => Caller::Admin(claims.sub),
  })
}

fn caller_from_service_key(presented: &str, state: &AppState) -> Result<Caller, AppError> {
  let stored_hash = state
    .config
    .service_key_hash
    .as_deref()
    .ok_or_else(|| AppError::Auth("Service key access is not enabled".to_string()))?;
  if auth_service::verify_service_key(stored_hash, presented)? {
    Ok(Caller::Service)
  } else {
    warn!("Rejected request with an invalid service key.");
    Err(AppError::Auth("Invalid service key".to_string()))
  }
}

/// Caller authenticated by bearer token or, for trusted integrations, by the
/// `X-Service-Key` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedCaller(pub Caller);

impl FromRequest for AuthenticatedCaller {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let resolved = app_state(req).and_then(|state| match req.headers().get(SERVICE_KEY_HEADER) {
      Some(key) => {
        let key = key
          .to_str()
          .map_err(|_| AppError::Auth("Malformed service key header".to_string()))?;
        caller_from_service_key(key, state)
      }
      None => caller_from_bearer(req, state),
    });
    ready(resolved.map(AuthenticatedCaller))
  }
}

/// Caller authenticated by bearer token only.
#[derive(Debug, Clone, Copy)]
pub struct BearerCaller(pub Caller);

impl FromRequest for BearerCaller {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    ready(app_state(req).and_then(|state| caller_from_bearer(req, state)).map(BearerCaller))
  }
}
