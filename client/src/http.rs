//! The single configured HTTP client every screen goes through.
//!
//! Attaches the bearer token from the session store and enforces the 401
//! rule: any unauthorized answer clears the stored session and surfaces as
//! [`ApiError::SessionExpired`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use birdia_common::config::Config;
use birdia_common::session::{Session, SessionStore};

use crate::error::ApiError;

pub struct ApiClient {
    http: Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, store: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn from_config(config: &Config, store: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        Self::new(&config.api_url, config.request_timeout(), store)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub fn session(&self) -> Result<Option<Session>, ApiError> {
        Ok(self.store.load()?)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Builder with no session token, for the login endpoint.
    pub(crate) fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Builder carrying the stored bearer token, when there is one.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let rb = self.anonymous(method, path);
        Ok(match self.store.token()? {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        })
    }

    /// Send an authenticated request and apply the 401 rule.
    pub(crate) async fn send(&self, path: &str, rb: RequestBuilder) -> Result<Response, ApiError> {
        let resp = rb.send().await?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!("{path} answered 401 – clearing the stored session");
            self.store.clear()?;
            return Err(ApiError::SessionExpired);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status,
                message: error_message(status, &body),
            });
        }
        Ok(resp)
    }

    // ── JSON helpers ─────────────────────────────────────────────────────

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!("GET {path}");
        let resp = self.send(path, self.request(Method::GET, path)?).await?;
        decode(path, resp).await
    }

    pub async fn get_json_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        debug!("GET {path} (with query)");
        let rb = self.request(Method::GET, path)?.query(query);
        let resp = self.send(path, rb).await?;
        decode(path, resp).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {path}");
        let rb = self.request(Method::POST, path)?.json(body);
        let resp = self.send(path, rb).await?;
        decode(path, resp).await
    }

    /// PUT whose answer body is not needed.
    pub async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        debug!("PUT {path}");
        let rb = self.request(Method::PUT, path)?.json(body);
        self.send(path, rb).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        debug!("DELETE {path}");
        let rb = self.request(Method::DELETE, path)?;
        self.send(path, rb).await?;
        Ok(())
    }
}

pub(crate) async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T, ApiError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Best human-readable message from an error body.  The backend usually
/// answers `{"detail": "..."}`; validation errors carry a list instead.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(s)) => return s.clone(),
            Some(serde_json::Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if !msgs.is_empty() {
                    return msgs.join("; ");
                }
            }
            _ => {}
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("error").to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use birdia_common::session::MemorySessionStore;

    #[test]
    fn test_url_joining() {
        let store = Arc::new(MemorySessionStore::new());
        let client = ApiClient::new("http://api.local/v1/", Duration::from_secs(5), store).unwrap();
        assert_eq!(client.base_url(), "http://api.local/v1");
        assert_eq!(client.url("/usuarios/me"), "http://api.local/v1/usuarios/me");
        assert_eq!(client.url("inferencia/historial"), "http://api.local/v1/inferencia/historial");
    }

    #[test]
    fn test_error_message() {
        let s = StatusCode::BAD_REQUEST;
        assert_eq!(error_message(s, r#"{"detail":"Email ya registrado"}"#), "Email ya registrado");
        assert_eq!(
            error_message(s, r#"{"detail":[{"msg":"field required"},{"msg":"bad email"}]}"#),
            "field required; bad email"
        );
        assert_eq!(error_message(s, ""), "Bad Request");
        assert_eq!(error_message(s, "  oops "), "oops");
    }
}
