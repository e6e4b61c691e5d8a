// server/src/services/tokens.rs

//! Signed bearer tokens: `v1.<claims>.<signature>`, where `claims` is
//! base64url JSON and `signature` is base64url HMAC-SHA256 over `v1.<claims>`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";
const MAX_TOKEN_LEN: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Customer,
  Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
  pub sub: Uuid,
  pub role: Role,
  /// Expiry as a unix timestamp in seconds.
  pub exp: i64,
}

fn mac_for(secret: &[u8]) -> Result<HmacSha256> {
  HmacSha256::new_from_slice(secret).map_err(|e| AppError::Internal(format!("Invalid token secret: {}", e)))
}

#[instrument(name = "tokens::issue", skip(claims, secret), fields(sub = %claims.sub, role = ?claims.role))]
pub fn issue_token(claims: &TokenClaims, secret: &[u8]) -> Result<String> {
  let payload = serde_json::to_vec(claims).map_err(|e| AppError::Internal(e.to_string()))?;
  let signed_part = format!("{}.{}", TOKEN_VERSION, URL_SAFE_NO_PAD.encode(payload));
  let mut mac = mac_for(secret)?;
  mac.update(signed_part.as_bytes());
  let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
  Ok(format!("{}.{}", signed_part, sig))
}

/// Checks signature and expiry. Every failure is an `AppError::Auth`.
pub fn verify_token(token: &str, secret: &[u8], now: DateTime<Utc>) -> Result<TokenClaims> {
  let invalid = || AppError::Auth("Invalid bearer token".to_string());

  if token.len() > MAX_TOKEN_LEN {
    return Err(invalid());
  }
  let mut parts = token.split('.');
  let (version, payload_part, sig_part) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
    (Some(v), Some(p), Some(s), None) => (v, p, s),
    _ => return Err(invalid()),
  };
  if version != TOKEN_VERSION {
    return Err(invalid());
  }

  let mut mac = mac_for(secret)?;
  mac.update(version.as_bytes());
  mac.update(b".");
  mac.update(payload_part.as_bytes());
  let sig = URL_SAFE_NO_PAD.decode(sig_part).map_err(|_| invalid())?;
  mac.verify_slice(&sig).map_err(|_| {
    debug!("Bearer token signature mismatch.");
    invalid()
  })?;

  let payload = URL_SAFE_NO_PAD.decode(payload_part).map_err(|_| invalid())?;
  let claims: TokenClaims = serde_json::from_slice(&payload).map_err(|_| invalid())?;
  if claims.exp <= now.timestamp() {
    return Err(AppError::Auth("Bearer token has expired".to_string()));
  }
  Ok(claims)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  const SECRET: &[u8] = b"test-secret-test-secret-test-secret!";

  fn claims(exp: i64) -> TokenClaims {
    TokenClaims {
      sub: Uuid::new_v4(),
      role: Role::Customer,
      exp,
    }
  }

  #[test]
  fn issued_token_verifies() {
    let now = Utc::now();
    let c = claims((now + Duration::hours(1)).timestamp());
    let token = issue_token(&c, SECRET).unwrap();
    assert!(token.starts_with("v1."));
    assert_eq!(verify_token(&token, SECRET, now).unwrap(), c);
  }

  #[test]
  fn tampered_or_foreign_tokens_fail() {
    let now = Utc::now();
    let token = issue_token(&claims((now + Duration::hours(1)).timestamp()), SECRET).unwrap();

    assert!(matches!(
      verify_token(&token, b"another-secret-another-secret-xx", now),
      Err(AppError::Auth(_))
    ));

    let mut forged = token.clone();
    forged.push('A');
    assert!(matches!(verify_token(&forged, SECRET, now), Err(AppError::Auth(_))));

    assert!(matches!(verify_token("not-a-token", SECRET, now), Err(AppError::Auth(_))));
    let v2 = token.replacen("v1.", "v2.", 1);
    assert!(matches!(verify_token(&v2, SECRET, now), Err(AppError::Auth(_))));
  }

  #[test]
  fn expired_token_fails() {
    let now = Utc::now();
    let token = issue_token(&claims((now - Duration::seconds(1)).timestamp()), SECRET).unwrap();
    let err = verify_token(&token, SECRET, now).unwrap_err();
    assert!(err.to_string().contains("expired"));
  }
}
