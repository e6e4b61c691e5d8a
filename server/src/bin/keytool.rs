// server/src/bin/keytool.rs

//! Operator tool: hashes service keys and issues bearer tokens.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use storefront::services::auth_service::hash_service_key;
use storefront::services::tokens::{issue_token, Role, TokenClaims};

#[derive(Parser, Debug)]
#[command(name = "storefront-keytool", about = "Credential utilities for the storefront service")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the Argon2 hash of a service key, for SERVICE_KEY_HASH.
  HashServiceKey {
    key: String,
  },
  /// Issue a bearer token signed with AUTH_TOKEN_SECRET.
  IssueToken {
    user_id: Uuid,
    #[arg(long)]
    admin: bool,
    /// Lifetime in seconds.
    #[arg(long, default_value_t = 3600)]
    ttl_secs: i64,
  },
}

fn expiry_after(now: DateTime<Utc>, ttl_secs: i64) -> Result<i64> {
  let ttl = Duration::try_seconds(ttl_secs).context("--ttl-secs is out of range")?;
  let exp = now.checked_add_signed(ttl).context("--ttl-secs is out of range")?;
  Ok(exp.timestamp())
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  match cli.command {
    Command::HashServiceKey { key } => {
      let hash = hash_service_key(&key).context("hashing service key")?;
      println!("{}", hash);
    }
    Command::IssueToken {
      user_id,
      admin,
      ttl_secs,
    } => {
      anyhow::ensure!(ttl_secs > 0, "--ttl-secs must be positive");
      dotenvy::dotenv().ok();
      let secret = std::env::var("AUTH_TOKEN_SECRET").context("AUTH_TOKEN_SECRET is not set")?;
      anyhow::ensure!(secret.len() >= 32, "AUTH_TOKEN_SECRET must be at least 32 bytes long");
      let claims = TokenClaims {
        sub: user_id,
        role: if admin { Role::Admin } else { Role::Customer },
        exp: expiry_after(Utc::now(), ttl_secs)?,
      };
      let token = issue_token(&claims, secret.as_bytes()).context("issuing token")?;
      println!("{}", token);
    }
  }
  Ok(())
}
