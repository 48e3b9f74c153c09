use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use super::{track, APIError, AppState, CodeMessage, MethodData};
use crate::{metrics::http_server, privileges::Privileges};

pub(super) async fn health(State(state): State<AppState>) -> Result<Json<CodeMessage>, APIError> {
  http_server::requests_total("health").inc();

  let res = match sqlx::query("SELECT 1").execute(&state.pool).await {
    Ok(_) => Ok(Json(CodeMessage::new(StatusCode::OK, "healthy"))),
    Err(err) => {
      error!("Health check failed to reach the database: {err}");
      Err(APIError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "database error",
      ))
    },
  };
  track("health", res)
}

#[derive(Serialize)]
pub(super) struct UpSinceResponse {
  code: u16,
  /// Process start time in unix nanoseconds.
  since: i64,
}

/// Lets operators tell whether the API has restarted.
pub(super) async fn up_since(
  State(state): State<AppState>,
  md: MethodData,
) -> Result<Json<UpSinceResponse>, APIError> {
  http_server::requests_total("up_since").inc();

  let res = md.require(Privileges::API_META).map(|()| {
    Json(UpSinceResponse {
      code: 200,
      since: state
        .started_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| state.started_at.timestamp() * 1_000_000_000),
    })
  });
  track("up_since", res)
}
