use std::{net::SocketAddr, time::Duration};

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json, Router,
};
use chrono::{DateTime, Utc};
use foundations::BootstrapResult;
use serde::Serialize;
use sqlx::MySqlPool;
use tower_http::{
  cors,
  trace::{DefaultMakeSpan, DefaultOnResponse},
};
use tracing::Level;

use crate::{metrics::http_server, settings::ServerSettings, token_updater::TokenUpdater};

mod caretaker;
mod meta;
mod ping;
mod tokens;

pub(crate) use self::caretaker::MethodData;

/// Everything request handlers need, handed to them by the router.
#[derive(Clone)]
pub struct AppState {
  pub pool: MySqlPool,
  pub token_updater: TokenUpdater,
  pub started_at: DateTime<Utc>,
}

/// The `{code, message}` envelope every response is built on.
#[derive(Serialize)]
pub struct CodeMessage {
  pub code: u16,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl CodeMessage {
  pub fn ok() -> Self {
    Self {
      code: 200,
      message: None,
    }
  }

  pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
    Self {
      code: status.as_u16(),
      message: Some(message.into()),
    }
  }
}

#[derive(Debug)]
pub struct APIError {
  pub status: StatusCode,
  pub message: String,
}

impl APIError {
  pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
    Self {
      status,
      message: message.into(),
    }
  }

  pub fn internal() -> Self {
    Self::new(
      StatusCode::INTERNAL_SERVER_ERROR,
      "An error occurred. Trying again may work. If it doesn't, yell at us.",
    )
  }
}

impl IntoResponse for APIError {
  fn into_response(self) -> Response {
    (self.status, Json(CodeMessage::new(self.status, self.message))).into_response()
  }
}

/// Bumps the per-endpoint success/failure counters for a finished request.
pub(crate) fn track<T>(
  endpoint_name: &'static str,
  res: Result<T, APIError>,
) -> Result<T, APIError> {
  match &res {
    Ok(_) => http_server::requests_success_total(endpoint_name).inc(),
    Err(_) => http_server::requests_failed_total(endpoint_name).inc(),
  };
  res
}

async fn not_found() -> APIError {
  http_server::requests_total("not_found").inc();
  APIError::new(StatusCode::NOT_FOUND, "Resource not found.")
}

pub fn build_router(state: AppState) -> Router {
  use axum::routing::{get, post};

  Router::new()
    .route("/_health", get(meta::health))
    .route("/api/v1/ping", get(ping::ping))
    .route("/api/v1/surprise_me", get(ping::surprise_me))
    .route("/api/v1/tokens", get(tokens::list_tokens))
    .route("/api/v1/tokens/self", get(tokens::token_self))
    .route("/api/v1/tokens/self/delete", post(tokens::delete_token_self))
    .route("/api/v1/meta/up_since", get(meta::up_since))
    .fallback(not_found)
    .with_state(state)
    .layer(
      tower_http::cors::CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_headers(cors::Any)
        .allow_methods(cors::Any),
    )
    .layer(
      tower_http::trace::TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::default().level(Level::INFO)),
    )
}

async fn shutdown_signal() {
  if let Err(err) = tokio::signal::ctrl_c().await {
    error!("Failed to listen for shutdown signal: {err}");
    std::future::pending::<()>().await;
  }
  info!("Shutdown signal received");
}

pub async fn start_server(settings: &ServerSettings) -> BootstrapResult<()> {
  let pool = crate::db::init_db_pool(&settings.sql).await?;
  let (token_updater, token_updater_handle) =
    TokenUpdater::spawn(pool.clone(), &settings.token_updater);

  let state = AppState {
    pool,
    token_updater,
    started_at: Utc::now(),
  };
  let router = build_router(state);

  let addr = format!("0.0.0.0:{}", settings.port);
  info!("Server is listening on http://{}", addr);
  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(
    listener,
    router.into_make_service_with_connect_info::<SocketAddr>(),
  )
  .with_graceful_shutdown(shutdown_signal())
  .await?;

  // The router owned the last updater handles, so the updater now flushes what it holds and exits.
  info!("Waiting for token updater to flush");
  if tokio::time::timeout(Duration::from_secs(10), token_updater_handle)
    .await
    .is_err()
  {
    warn!("Token updater didn't finish its final flush in time");
  }
  Ok(())
}
