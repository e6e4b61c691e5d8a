// server/src/services/auth_service.rs

//! Caller identities, service key hashing and the order access policy.

use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Order;

/// Who is making a request, as established by the web layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
  Customer(Uuid),
  Admin(Uuid),
  /// A trusted server-side integration presenting the service key.
  Service,
}

impl Caller {
  /// Admins and services may act on any order.
  pub fn is_trusted(&self) -> bool {
    !matches!(self, Caller::Customer(_))
  }

  pub fn user_id(&self) -> Option<Uuid> {
    match self {
      Caller::Customer(id) | Caller::Admin(id) => Some(*id),
      Caller::Service => None,
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Caller::Customer(_) => "customer",
      Caller::Admin(_) => "admin",
      Caller::Service => "service",
    }
  }
}

/// Customers may only act on orders they own.
pub fn authorize_order_access(caller: &Caller, order: &Order) -> Result<(), AppError> {
  match caller {
    Caller::Customer(user_id) if !order.is_owned_by(*user_id) => Err(AppError::Forbidden(
      "You do not have permission to modify this order".to_string(),
    )),
    _ => Ok(()),
  }
}

pub fn require_admin(caller: &Caller) -> Result<(), AppError> {
  if caller.is_trusted() {
    Ok(())
  } else {
    Err(AppError::Forbidden("Administrator access required".to_string()))
  }
}

/// Hashes a service key with Argon2 for storage in `SERVICE_KEY_HASH`.
#[instrument(name = "auth_service::hash_service_key", skip(key), err(Display))]
pub fn hash_service_key(key: &str) -> Result<String, AppError> {
  if key.is_empty() {
    return Err(AppError::Validation("Service key cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(key.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 service key hashing failed.");
      AppError::Internal(format!("Service key hashing failed: {}", argon_err))
    })
}

/// Verifies a presented service key against the configured Argon2 hash.
///
/// A mismatch is `Ok(false)`; a malformed stored hash is an internal error.
#[instrument(name = "auth_service::verify_service_key", skip(stored_hash, provided_key), err(Display))]
pub fn verify_service_key(stored_hash: &str, provided_key: &str) -> Result<bool, AppError> {
  if provided_key.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(stored_hash).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored service key hash.");
    AppError::Internal(format!("Invalid stored service key hash: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_key.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Service key mismatch.");
      Ok(false)
    }
    Err(other) => {
      error!(error = %other, "Argon2 service key verification failed.");
      Err(AppError::Internal(format!("Service key verification failed: {}", other)))
    }
  }
}
