use axum::{
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, QueryBuilder};

use super::{track, APIError, AppState, CodeMessage, MethodData};
use crate::{
  metrics::http_server,
  privileges::Privileges,
  tokens::{hash_api_token, hash_bearer_token},
};

const MAX_TOKENS_PER_PAGE: u32 = 50;

/// Turns the `p` (1-based page) and `l` (page size) query parameters into `(offset, limit)`.
/// Garbage or missing values fall back to the first page of `max_limit` rows.
fn paginate(page: Option<&str>, limit: Option<&str>, max_limit: u32) -> (u32, u32) {
  let page = page
    .and_then(|p| p.parse::<u32>().ok())
    .filter(|p| *p >= 1)
    .unwrap_or(1);
  let limit = limit
    .and_then(|l| l.parse::<u32>().ok())
    .filter(|l| *l >= 1)
    .unwrap_or(max_limit)
    .min(max_limit);
  ((page - 1).saturating_mul(limit), limit)
}

/// Parses the optional `id` filter of the token list; an empty value means no filter.
fn token_id_filter(id: Option<&str>) -> Result<Option<i32>, APIError> {
  let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) else {
    return Ok(None);
  };
  id.parse()
    .map(Some)
    .map_err(|_| APIError::new(StatusCode::BAD_REQUEST, "id must be an integer."))
}

#[derive(sqlx::FromRow)]
struct TokenRow {
  id: i32,
  privileges: i64,
  description: String,
  last_updated: i64,
}

#[derive(Serialize)]
pub(super) struct TokenInfo {
  id: i32,
  privileges: Privileges,
  description: String,
  last_updated: Option<DateTime<Utc>>,
}

impl From<TokenRow> for TokenInfo {
  fn from(row: TokenRow) -> Self {
    Self {
      id: row.id,
      privileges: Privileges(row.privileges as u64),
      description: row.description,
      last_updated: DateTime::from_timestamp(row.last_updated, 0),
    }
  }
}

#[derive(Deserialize)]
pub(super) struct ListTokensParams {
  id: Option<String>,
  p: Option<String>,
  l: Option<String>,
}

#[derive(Serialize)]
pub(super) struct ListTokensResponse {
  #[serde(flatten)]
  base: CodeMessage,
  tokens: Vec<TokenInfo>,
}

/// Lists the caller's non-private tokens.
pub(super) async fn list_tokens(
  State(state): State<AppState>,
  md: MethodData,
  Query(params): Query<ListTokensParams>,
) -> Result<Json<ListTokensResponse>, APIError> {
  http_server::requests_total("list_tokens").inc();

  let res = async {
    let id = token_id_filter(params.id.as_deref())?;

    let mut qb: QueryBuilder<'_, MySql> = QueryBuilder::new(
      "SELECT id, privileges, description, last_updated FROM tokens WHERE private = 0 AND user = ",
    );
    qb.push_bind(md.user_id());
    if let Some(id) = id {
      qb.push(" AND id = ").push_bind(id);
    }
    let (offset, limit) = paginate(params.p.as_deref(), params.l.as_deref(), MAX_TOKENS_PER_PAGE);
    qb.push(" LIMIT ")
      .push_bind(offset)
      .push(", ")
      .push_bind(limit);

    let rows: Vec<TokenRow> = qb
      .build_query_as()
      .fetch_all(&state.pool)
      .await
      .map_err(|err| {
        error!("Error listing tokens for user id={}: {err}", md.user_id());
        APIError::internal()
      })?;

    Ok::<_, APIError>(Json(ListTokensResponse {
      base: CodeMessage::ok(),
      tokens: rows.into_iter().map(TokenInfo::from).collect(),
    }))
  };
  track("list_tokens", res.await)
}

/// Name, owner and avatar of an OAuth client, stored as a JSON array in `osin_client.extra`.
#[derive(Debug, PartialEq, Serialize)]
pub(super) struct OAuthClient {
  id: String,
  name: String,
  owner_id: i32,
  avatar: String,
}

impl OAuthClient {
  fn from_extra(id: String, extra: &str) -> serde_json::Result<Self> {
    let (name, owner_id, avatar): (String, String, String) = serde_json::from_str(extra)?;
    Ok(Self {
      id,
      name,
      owner_id: owner_id.parse().unwrap_or_default(),
      avatar,
    })
  }
}

#[derive(Serialize)]
struct TokenSelfResponse {
  #[serde(flatten)]
  base: CodeMessage,
  #[serde(flatten)]
  token: TokenInfo,
}

#[derive(Serialize)]
struct BearerTokenSelfResponse {
  #[serde(flatten)]
  base: CodeMessage,
  client: OAuthClient,
  scope: String,
  privileges: Privileges,
  created: DateTime<Utc>,
}

/// Describes the token the caller is authenticated with.
pub(super) async fn token_self(
  State(state): State<AppState>,
  md: MethodData,
) -> Result<Response, APIError> {
  http_server::requests_total("token_self").inc();

  let res = async {
    if md.user.is_anonymous() {
      return Err(APIError::new(
        StatusCode::NOT_FOUND,
        "How are we supposed to find the token you're using if you ain't even using one?!",
      ));
    }

    if md.user.is_bearer() {
      let (scope, created, client_id, extra): (String, DateTime<Utc>, String, String) =
        sqlx::query_as(
          "SELECT t.scope, t.created_at, c.id, c.extra FROM osin_access t INNER JOIN osin_client \
           c ON c.id = t.client WHERE t.access_token = ? LIMIT 1",
        )
        .bind(hash_bearer_token(&md.user.value))
        .fetch_one(&state.pool)
        .await
        .map_err(|err| {
          error!("Error fetching bearer token for user id={}: {err}", md.user_id());
          APIError::internal()
        })?;
      let client = OAuthClient::from_extra(client_id, &extra).map_err(|err| {
        error!("Malformed osin_client.extra for user id={}: {err}", md.user_id());
        APIError::internal()
      })?;

      return Ok(
        Json(BearerTokenSelfResponse {
          base: CodeMessage::ok(),
          client,
          scope,
          privileges: md.user.token_privileges,
          created,
        })
        .into_response(),
      );
    }

    let row: TokenRow = sqlx::query_as(
      "SELECT id, privileges, description, last_updated FROM tokens WHERE id = ? LIMIT 1",
    )
    .bind(md.user.id)
    .fetch_one(&state.pool)
    .await
    .map_err(|err| {
      error!("Error fetching token id={}: {err}", md.user.id);
      APIError::internal()
    })?;

    Ok::<_, APIError>(
      Json(TokenSelfResponse {
        base: CodeMessage::ok(),
        token: row.into(),
      })
      .into_response(),
    )
  };
  track("token_self", res.await)
}

/// Revokes the token the caller is authenticated with.
pub(super) async fn delete_token_self(
  State(state): State<AppState>,
  md: MethodData,
) -> Result<Json<CodeMessage>, APIError> {
  http_server::requests_total("delete_token_self").inc();

  let res = async {
    if md.user.is_anonymous() {
      return Err(APIError::new(
        StatusCode::BAD_REQUEST,
        "How should we delete your token if you haven't even given us one?!",
      ));
    }

    let query = if md.user.is_bearer() {
      sqlx::query("DELETE FROM osin_access WHERE access_token = ? LIMIT 1")
        .bind(hash_bearer_token(&md.user.value))
    } else {
      sqlx::query("DELETE FROM tokens WHERE token = ? LIMIT 1").bind(hash_api_token(&md.user.value))
    };
    query.execute(&state.pool).await.map_err(|err| {
      error!("Error deleting token for user id={}: {err}", md.user_id());
      APIError::internal()
    })?;

    Ok::<_, APIError>(Json(CodeMessage::new(StatusCode::OK, "Bye!")))
  };
  track("delete_token_self", res.await)
}
