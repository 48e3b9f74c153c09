use md5::Md5;
use sha2::{Digest, Sha256};
use sqlx::MySqlPool;

use crate::{
  metrics::http_server,
  privileges::{Privileges, UserPrivileges},
  token_updater::{TokenId, TokenUpdater},
};

/// Token id given to OAuth bearer tokens, which don't live in the `tokens` table.
pub const BEARER_TOKEN_ID: TokenId = -1;

/// The credential a request was authenticated with.
///
/// The default value is the anonymous caller: `user_id == 0` and no privileges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Token {
  pub id: TokenId,
  /// Raw credential as sent by the client.
  pub value: String,
  pub user_id: i32,
  /// What this token may do, already narrowed down to what the owner is allowed to do.
  pub token_privileges: Privileges,
  pub user_privileges: UserPrivileges,
}

impl Token {
  pub fn is_bearer(&self) -> bool { self.id == BEARER_TOKEN_ID }

  pub fn is_anonymous(&self) -> bool { self.user_id == 0 }
}

/// A credential pulled out of a request, before it has been looked up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credential {
  /// Classic API key from the `tokens` table.
  ApiKey(String),
  /// OAuth access token from the `osin_access` table.
  Bearer(String),
}

impl Credential {
  fn kind(&self) -> &'static str {
    match self {
      Credential::ApiKey(_) => "api_key",
      Credential::Bearer(_) => "bearer",
    }
  }
}

/// API keys are stored as lowercase hex MD5.
pub fn hash_api_token(raw: &str) -> String { format!("{:x}", Md5::digest(raw.as_bytes())) }

/// OAuth access tokens are stored as lowercase hex SHA-256.
pub fn hash_bearer_token(raw: &str) -> String { format!("{:x}", Sha256::digest(raw.as_bytes())) }

pub async fn resolve_credential(
  pool: &MySqlPool,
  token_updater: &TokenUpdater,
  credential: &Credential,
) -> sqlx::Result<Option<Token>> {
  http_server::token_lookups_total(credential.kind()).inc();

  let token = match credential {
    Credential::ApiKey(raw) => resolve_api_token(pool, token_updater, raw).await?,
    Credential::Bearer(raw) => resolve_bearer_token(pool, raw).await?,
  };
  if token.is_none() {
    http_server::token_lookup_misses_total(credential.kind()).inc();
  }
  Ok(token)
}

/// Looks up an API key and reports its use to the token updater.
pub async fn resolve_api_token(
  pool: &MySqlPool,
  token_updater: &TokenUpdater,
  raw: &str,
) -> sqlx::Result<Option<Token>> {
  let row: Option<ApiTokenRow> = sqlx::query_as(
    "SELECT t.id, t.user, t.privileges, t.private, u.privileges FROM tokens t LEFT JOIN users u \
     ON u.id = t.user WHERE token = ? LIMIT 1",
  )
  .bind(hash_api_token(raw))
  .fetch_optional(pool)
  .await?;

  Ok(accept_api_token(token_updater, raw, row).await)
}

/// `(id, user, privileges, private, owner privileges)` as read from `tokens` joined with `users`.
type ApiTokenRow = (TokenId, i32, i64, bool, Option<i64>);

/// Reports a found token to the token updater and works out what it may do.  Misses are not
/// reported.
async fn accept_api_token(
  token_updater: &TokenUpdater,
  raw: &str,
  row: Option<ApiTokenRow>,
) -> Option<Token> {
  let (id, user_id, token_privileges, private, user_privileges) = row?;

  token_updater.record(id).await;

  Some(build_api_token(
    id,
    raw,
    user_id,
    Privileges(token_privileges as u64),
    private,
    UserPrivileges(user_privileges.unwrap_or_default() as u64),
  ))
}

fn build_api_token(
  id: TokenId,
  raw: &str,
  user_id: i32,
  requested: Privileges,
  private: bool,
  user_privileges: UserPrivileges,
) -> Token {
  // private tokens ask for everything and get whatever their owner can have
  let requested = if private { Privileges::ALL } else { requested };
  Token {
    id,
    value: raw.to_owned(),
    user_id,
    token_privileges: requested.can_only(user_privileges),
    user_privileges,
  }
}

/// Looks up an OAuth access token.  These are never reported to the token updater.
pub async fn resolve_bearer_token(pool: &MySqlPool, raw: &str) -> sqlx::Result<Option<Token>> {
  let row: Option<(String, i32)> =
    sqlx::query_as("SELECT scope, extra FROM osin_access WHERE access_token = ? LIMIT 1")
      .bind(hash_bearer_token(raw))
      .fetch_optional(pool)
      .await?;

  let Some((scope, user_id)) = row.filter(|(_, user_id)| *user_id != 0) else {
    return Ok(None);
  };

  let user_privileges: Option<i64> =
    sqlx::query_scalar("SELECT privileges FROM users WHERE id = ? LIMIT 1")
      .bind(user_id)
      .fetch_optional(pool)
      .await?;

  Ok(Some(build_bearer_token(
    raw,
    user_id,
    &scope,
    UserPrivileges(user_privileges.unwrap_or_default() as u64),
  )))
}

fn build_bearer_token(
  raw: &str,
  user_id: i32,
  scope: &str,
  user_privileges: UserPrivileges,
) -> Token {
  Token {
    id: BEARER_TOKEN_ID,
    value: raw.to_owned(),
    user_id,
    token_privileges: Privileges::from_oauth_scopes(scope).can_only(user_privileges),
    user_privileges,
  }
}
