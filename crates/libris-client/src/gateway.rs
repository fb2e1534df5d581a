//! Authenticated HTTP gateway to the lending service.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use libris_core::error::{LibrisError, Result};
use libris_core::query::QueryParams;
use libris_core::session::SessionContext;
use libris_infrastructure::ClientConfig;

/// Wraps outbound HTTP calls to the remote service.
///
/// Every request is resolved against the configured base URL and, when a
/// session exists, carries `Authorization: Bearer <access token>`. The
/// credential is read from the [`SessionContext`] at dispatch time, so a
/// login or logout between two requests takes effect immediately.
///
/// The gateway does not handle credential expiry: a request rejected for
/// an invalid or expired token surfaces as an [`LibrisError::Api`] like
/// any other rejection. There is no retry-with-refresh.
pub struct ApiGateway {
    http: Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl ApiGateway {
    /// Creates a gateway for the configured service.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, session: Arc<SessionContext>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LibrisError::config(format!("failed to build HTTP client: {e}")))?;

        let mut base_url = config.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    /// Issues a GET and decodes the JSON response body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<T> {
        let mut request = self.http.get(self.url(path));
        if !params.is_empty() {
            request = request.query(params);
        }
        let response = self.dispatch(request).await?;
        Self::decode(response).await
    }

    /// Issues a POST with a JSON body and decodes the JSON response body.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.http.post(self.url(path)).json(body);
        let response = self.dispatch(request).await?;
        Self::decode(response).await
    }

    /// Issues a POST with a JSON body, ignoring the response body.
    pub async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let request = self.http.post(self.url(path)).json(body);
        self.dispatch(request).await?;
        Ok(())
    }

    /// Attaches the bearer credential (when present), sends, and maps
    /// failures into the domain error type.
    async fn dispatch(&self, mut request: RequestBuilder) -> Result<Response> {
        if let Some(token) = self.session.access_token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LibrisError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            tracing::warn!(status = status.as_u16(), "request rejected");
            return Err(LibrisError::api(status.as_u16(), error_detail(&body)));
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| LibrisError::Serialization {
                format: "JSON".to_string(),
                message: e.to_string(),
            })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Extracts a human-readable message from an error response body.
///
/// The service reports rejections as `{"detail": "..."}`; anything else
/// falls back to the raw body, or a generic message when that is empty.
fn error_detail(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(detail) = json.get("detail").and_then(|d| d.as_str())
    {
        return detail.to_string();
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_core::session::MemorySessionStore;

    fn gateway(base_url: &str) -> ApiGateway {
        let config = ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        };
        let session =
            Arc::new(SessionContext::from_store(Arc::new(MemorySessionStore::new())).unwrap());
        ApiGateway::new(&config, session).unwrap()
    }

    #[test]
    fn test_url_joining_normalizes_slashes() {
        let gw = gateway("http://localhost:8000");
        assert_eq!(gw.url("books/"), "http://localhost:8000/books/");
        assert_eq!(gw.url("/login/"), "http://localhost:8000/login/");

        let gw = gateway("http://localhost:8000/");
        assert_eq!(gw.url("books/"), "http://localhost:8000/books/");
    }

    #[test]
    fn test_error_detail_prefers_the_detail_field() {
        assert_eq!(
            error_detail(r#"{"detail": "No active account found"}"#),
            "No active account found"
        );
    }

    #[test]
    fn test_error_detail_falls_back_to_body() {
        assert_eq!(error_detail("plain text failure"), "plain text failure");
        assert_eq!(error_detail(r#"{"code": 17}"#), r#"{"code": 17}"#);
        assert_eq!(error_detail("   "), "request failed");
    }
}
