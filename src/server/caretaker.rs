//! Works out who is calling before a handler runs.

use std::net::SocketAddr;

use axum::{
  extract::{ConnectInfo, FromRequestParts, Query},
  http::{request::Parts, HeaderMap, StatusCode},
};
use axum_extra::{
  extract::CookieJar,
  headers::{authorization::Bearer, Authorization},
  TypedHeader,
};
use serde::Deserialize;

use super::{APIError, AppState};
use crate::{
  privileges::Privileges,
  tokens::{resolve_credential, Credential, Token},
};

#[derive(Default, Deserialize)]
struct CredentialParams {
  token: Option<String>,
  k: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|v| !v.is_empty())
}

/// Pulls the caller's credential out of a request.
///
/// Checked in order: `X-Ripple-Token` header, `Authorization: Bearer`, `token` and `k` query
/// parameters, then the `rt` cookie.
pub(crate) async fn extract_credential<S>(parts: &mut Parts, state: &S) -> Option<Credential>
where
  S: Send + Sync,
{
  let ripple_token = parts.headers.get("x-ripple-token").and_then(|v| v.to_str().ok());
  if let Some(token) = non_empty(ripple_token) {
    return Some(Credential::ApiKey(token.to_owned()));
  }

  let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
    .await
    .ok();
  if let Some(token) = non_empty(bearer.as_ref().map(|TypedHeader(auth)| auth.token())) {
    return Some(Credential::Bearer(token.to_owned()));
  }

  let params = Query::<CredentialParams>::try_from_uri(&parts.uri)
    .map(|Query(params)| params)
    .unwrap_or_default();
  if let Some(token) = non_empty(params.token.as_deref()).or(non_empty(params.k.as_deref())) {
    return Some(Credential::ApiKey(token.to_owned()));
  }

  let jar = CookieJar::from_headers(&parts.headers);
  non_empty(jar.get("rt").map(|cookie| cookie.value()))
    .map(|token| Credential::ApiKey(token.to_owned()))
}

/// Best-effort address of the real client behind any reverse proxies.
pub(crate) fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
  let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

  if let Some(ip) = non_empty(header_str("x-real-ip")) {
    return Some(ip.to_owned());
  }
  if let Some(ip) = non_empty(header_str("x-forwarded-for").and_then(|v| v.split(',').next())) {
    return Some(ip.to_owned());
  }
  peer.map(|addr| addr.ip().to_string())
}

/// The authenticated (or anonymous) caller of an endpoint.
///
/// Unknown credentials don't fail the request; the caller is just treated as anonymous.
pub(crate) struct MethodData {
  pub user: Token,
}

impl MethodData {
  pub fn user_id(&self) -> i32 { self.user.user_id }

  /// Fails with 401 unless the caller's token holds every privilege in `needed`.
  pub fn require(&self, needed: Privileges) -> Result<(), APIError> {
    if self.user.token_privileges.contains(needed) {
      return Ok(());
    }
    Err(APIError::new(StatusCode::UNAUTHORIZED, "Unauthorized."))
  }
}

impl FromRequestParts<AppState> for MethodData {
  type Rejection = APIError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState,
  ) -> Result<Self, Self::Rejection> {
    let Some(credential) = extract_credential(parts, state).await else {
      return Ok(Self {
        user: Token::default(),
      });
    };

    match resolve_credential(&state.pool, &state.token_updater, &credential).await {
      Ok(Some(user)) => Ok(Self { user }),
      Ok(None) => {
        let peer = parts
          .extensions
          .get::<ConnectInfo<SocketAddr>>()
          .map(|ConnectInfo(addr)| *addr);
        debug!(
          "Unknown credential presented by {}",
          client_ip(&parts.headers, peer).as_deref().unwrap_or("unknown client")
        );
        Ok(Self {
          user: Token::default(),
        })
      },
      Err(err) => {
        error!("Error resolving credential: {err}");
        Err(APIError::internal())
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::http::{HeaderValue, Request};

  use super::*;
  use crate::server::tests::{get_json, test_app};

  fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
      headers.append(*name, HeaderValue::from_static(*value));
    }
    headers
  }

  async fn credential(uri: &str, pairs: &[(&'static str, &'static str)]) -> Option<Credential> {
    let mut req = Request::builder().uri(uri).body(()).unwrap();
    *req.headers_mut() = headers(pairs);
    let (mut parts, ()) = req.into_parts();
    extract_credential(&mut parts, &()).await
  }

  #[tokio::test]
  async fn ripple_token_header_wins() {
    let found = credential(
      "/?token=query",
      &[
        ("x-ripple-token", "abc"),
        ("authorization", "Bearer xyz"),
        ("cookie", "rt=cookie"),
      ],
    )
    .await;
    assert_eq!(found, Some(Credential::ApiKey("abc".to_owned())));
  }

  #[tokio::test]
  async fn bearer_header_is_oauth() {
    let found = credential("/?token=query", &[("authorization", "Bearer xyz")]).await;
    assert_eq!(found, Some(Credential::Bearer("xyz".to_owned())));

    assert_eq!(credential("/", &[("authorization", "Basic xyz")]).await, None);
  }

  #[tokio::test]
  async fn empty_bearer_token_falls_through() {
    assert_eq!(credential("/", &[("authorization", "Bearer ")]).await, None);
    assert_eq!(
      credential("/?k=key", &[("authorization", "Bearer   ")]).await,
      Some(Credential::ApiKey("key".to_owned()))
    );
  }

  #[tokio::test]
  async fn query_parameters_then_cookie() {
    assert_eq!(
      credential("/api/v1/ping?mode=0&token=q1&k=q2", &[]).await,
      Some(Credential::ApiKey("q1".to_owned()))
    );
    assert_eq!(
      credential("/?token=&k=q2", &[]).await,
      Some(Credential::ApiKey("q2".to_owned()))
    );
    assert_eq!(
      credential("/?mode=0", &[("cookie", "theme=dark; rt=from-cookie")]).await,
      Some(Credential::ApiKey("from-cookie".to_owned()))
    );
    assert_eq!(credential("/?mode=0", &[("cookie", "rt=")]).await, None);
    assert_eq!(credential("/?mode=0", &[]).await, None);
  }

  #[test]
  fn client_ip_prefers_proxy_headers() {
    let peer = Some(SocketAddr::from(([10, 0, 0, 1], 4000)));
    assert_eq!(
      client_ip(&headers(&[("x-real-ip", " 1.2.3.4 ")]), peer).as_deref(),
      Some("1.2.3.4")
    );
    assert_eq!(
      client_ip(&headers(&[("x-forwarded-for", "5.6.7.8, 10.0.0.2")]), peer).as_deref(),
      Some("5.6.7.8")
    );
    assert_eq!(client_ip(&HeaderMap::new(), peer).as_deref(), Some("10.0.0.1"));
    assert_eq!(client_ip(&HeaderMap::new(), None), None);
  }

  #[test]
  fn require_checks_every_bit() {
    let md = MethodData {
      user: Token {
        user_id: 1000,
        token_privileges: Privileges::READ_CONFIDENTIAL | Privileges::WRITE,
        ..Token::default()
      },
    };
    assert!(md.require(Privileges::WRITE).is_ok());
    assert!(md.require(Privileges::READ_CONFIDENTIAL | Privileges::WRITE).is_ok());

    let err = md.require(Privileges::WRITE | Privileges::API_META).unwrap_err();
    assert_eq!(err.status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn database_failure_while_resolving_is_500() {
    let (status, body) = get_json(test_app(), "/api/v1/ping?k=some-key").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
  }

  #[tokio::test]
  async fn empty_bearer_token_is_anonymous_without_a_lookup() {
    let req = Request::builder()
      .uri("/api/v1/ping")
      .header("authorization", "Bearer ")
      .body(axum::body::Body::empty())
      .unwrap();
    let (status, body) = crate::server::tests::send(test_app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], 0);
  }
}
