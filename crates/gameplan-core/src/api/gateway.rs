//! Request dispatch with automatic session renewal.
//!
//! Every request flows through [`Gateway::send`], which applies the
//! client-wide policies in one place:
//!
//! - URLs are joined against the configured base without doubled
//!   slashes, wherever the slashes happen to sit.
//! - Requests accept JSON unless the caller says otherwise. Caller
//!   headers override the defaults, except `Authorization`, which is
//!   always owned by the session.
//! - Payloads are explicit: structured JSON is encoded and tagged as
//!   JSON, text carries its declared content type (or the JSON
//!   default), and raw bytes pass through untouched.
//! - A 401 on an authenticated request triggers one token refresh and
//!   one retry. If the session cannot be renewed, the stored
//!   credentials are dropped and the original 401 goes back to the
//!   caller unchanged.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use tracing::{debug, warn};

use super::error::ApiError;
use crate::auth::{TokenRefresher, TokenStore};

/// What goes on the wire for a request body.
#[derive(Debug, Clone)]
pub enum Payload {
    /// No body at all.
    None,
    /// A JSON document, encoded by the client and sent as
    /// `application/json`.
    Json(serde_json::Value),
    /// Raw text, sent byte-for-byte. Without a declared content type it
    /// is tagged as JSON, matching what the server expects by default.
    Text {
        body: String,
        content_type: Option<String>,
    },
    /// Opaque bytes, sent exactly as given. The declared content type
    /// is passed through; none is invented.
    Bytes {
        body: Vec<u8>,
        content_type: Option<String>,
    },
}

/// A request the [`Gateway`] can issue, and reissue after a refresh.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub payload: Payload,
    /// Whether the request carries the session's access token and takes
    /// part in refresh-and-retry. Login and registration turn this off:
    /// a 401 from those endpoints means "bad submission", not "stale
    /// session".
    pub requires_auth: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            payload: Payload::None,
            requires_auth: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn unauthenticated(mut self) -> Self {
        self.requires_auth = false;
        self
    }
}

/// Issues requests against the API, attaching the session token and
/// renewing it when the server rejects it.
///
/// Clone is cheap: the HTTP client is internally reference-counted and
/// the store and refresher are shared.
#[derive(Clone)]
pub struct Gateway {
    client: Client,
    base: String,
    store: Arc<TokenStore>,
    refresher: Arc<TokenRefresher>,
}

impl Gateway {
    pub fn new(
        client: Client,
        api_base: &str,
        store: Arc<TokenStore>,
        refresher: Arc<TokenRefresher>,
    ) -> Self {
        Self {
            client,
            base: api_base.trim_end_matches('/').to_string(),
            store,
            refresher,
        }
    }

    /// Send a request, refreshing the session once if needed.
    ///
    /// A non-401 response comes back as-is, whatever its status -
    /// interpreting it is the caller's job. On a 401 the gateway asks
    /// the refresher for a fresh token: with one, the request is
    /// reissued exactly once and that second response is returned even
    /// if it failed too; without one, the stored credentials are
    /// cleared and the original 401 is returned unchanged.
    pub async fn send(&self, request: &RequestDescriptor) -> Result<Response, ApiError> {
        let token = if request.requires_auth {
            self.store.access()
        } else {
            None
        };

        let response = self.issue(request, token.as_deref()).await?;

        if !request.requires_auth || response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(path = %request.path, "access token rejected, refreshing");
        match self.refresher.refresh().await {
            Some(fresh) => {
                let retried = self.issue(request, Some(&fresh)).await?;
                Ok(retried)
            }
            None => {
                // No renewed session. Drop the stored pair so later
                // requests start clean, and hand back the server's
                // answer unchanged.
                if let Err(err) = self.store.clear() {
                    warn!(error = %err, "could not clear credentials after failed refresh");
                }
                Ok(response)
            }
        }
    }

    async fn issue(
        &self,
        request: &RequestDescriptor,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = join_url(&self.base, &request.path);
        let mut headers = build_headers(&request.headers, token);

        match &request.payload {
            Payload::Text { content_type, .. } => {
                apply_content_type(&mut headers, content_type.as_deref(), true);
            }
            Payload::Bytes { content_type, .. } => {
                apply_content_type(&mut headers, content_type.as_deref(), false);
            }
            Payload::None | Payload::Json(_) => {}
        }

        let builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers);
        let builder = match &request.payload {
            Payload::None => builder,
            Payload::Json(value) => builder.json(value),
            Payload::Text { body, .. } => builder.body(body.clone()),
            Payload::Bytes { body, .. } => builder.body(body.clone()),
        };

        let response = builder.send().await?;
        debug!(
            method = %request.method,
            path = %request.path,
            status = %response.status(),
            "request completed"
        );
        Ok(response)
    }
}

/// Assemble the header map for one attempt: JSON accept default, then
/// caller headers, then the bearer token. Caller-supplied
/// `Authorization` is dropped - the session decides what goes there.
/// A malformed caller header is skipped with a warning rather than
/// failing the request.
fn build_headers(custom: &[(String, String)], token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    for (name, value) in custom {
        if name.eq_ignore_ascii_case("authorization") {
            warn!("ignoring caller-supplied Authorization header");
            continue;
        }
        let name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                warn!(header = %name, "skipping invalid header name");
                continue;
            }
        };
        let value = match HeaderValue::from_str(value) {
            Ok(value) => value,
            Err(_) => {
                warn!(header = %name, "skipping invalid header value");
                continue;
            }
        };
        headers.insert(name, value);
    }

    if let Some(token) = token {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            // A token that cannot be a header value cannot be sent;
            // the server's 401 will route us into the refresh path.
            Err(_) => warn!("stored access token is not a valid header value"),
        }
    }

    headers
}

/// Set the content type for a body-carrying request. A declared type
/// always wins; otherwise text falls back to JSON unless the caller
/// already set one, and bytes get nothing invented for them.
fn apply_content_type(headers: &mut HeaderMap, declared: Option<&str>, default_json: bool) {
    if let Some(declared) = declared {
        match HeaderValue::from_str(declared) {
            Ok(value) => {
                headers.insert(CONTENT_TYPE, value);
            }
            Err(_) => warn!(content_type = %declared, "skipping invalid content type"),
        }
        return;
    }
    if default_json && !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
}

/// Join a path onto the base URL with exactly one slash between them,
/// however many the two sides brought.
fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
