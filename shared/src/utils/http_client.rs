use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Server menolak request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Response parsing error: {0}")]
    ParseError(String),

    #[error("Unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("HTTP client tidak bisa dibuat: {0}")]
    InvalidClient(String),
}

impl HttpClientError {
    /// 401/403 dari backend, session harus dianggap tidak valid
    pub fn is_session_error(&self) -> bool {
        matches!(self, HttpClientError::Unauthorized { .. })
    }

    /// Status HTTP kalau backend sempat menjawab
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpClientError::Rejected { status, .. } => Some(*status),
            HttpClientError::Unauthorized { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
}

impl ServiceClient {
    // Buat client untuk base URL tertentu
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, HttpClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpClientError::InvalidClient(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    // Buat client dari environment variable, fallback ke default URL
    pub fn from_env(var: &str, default_url: &str, timeout: Duration) -> Result<Self, HttpClientError> {
        let base_url = env::var(var).unwrap_or_else(|_| default_url.to_string());
        Self::new(base_url, timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // GET request dengan authentication opsional
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        token: Option<&str>,
    ) -> Result<T, HttpClientError> {
        let mut request = self.client.get(self.url(endpoint));

        if let Some(t) = token {
            request = request.bearer_auth(t);
        }

        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| HttpClientError::RequestFailed(e.to_string()))?;

        self.handle_response(response).await
    }

    // POST request JSON dengan authentication opsional
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        endpoint: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, HttpClientError> {
        let mut request = self.client.post(self.url(endpoint)).json(body);

        if let Some(t) = token {
            request = request.bearer_auth(t);
        }

        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| HttpClientError::RequestFailed(e.to_string()))?;

        self.handle_response(response).await
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    // Handle response dan parse JSON
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, HttpClientError> {
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                response
                    .json::<T>()
                    .await
                    .map_err(|e| HttpClientError::ParseError(e.to_string()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                Err(HttpClientError::Unauthorized {
                    status: status.as_u16(),
                    message: extract_error_message(&body, "Token invalid"),
                })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!("Backend menjawab {}: {}", status, body);
                Err(HttpClientError::Rejected {
                    status: status.as_u16(),
                    message: extract_error_message(&body, "Server unavailable. Try again."),
                })
            }
        }
    }
}

// Ambil pesan error dari body JSON backend ({message} atau {error}), fallback ke default
pub fn extract_error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|m| m.as_str())
                .map(|m| m.to_string())
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"message":"Order ditolak"}"#, "x"),
            "Order ditolak"
        );
        assert_eq!(
            extract_error_message(r#"{"error":"Jarak terlalu jauh"}"#, "x"),
            "Jarak terlalu jauh"
        );
        assert_eq!(extract_error_message("<html>502</html>", "fallback"), "fallback");
        assert_eq!(extract_error_message(r#"{"message":""}"#, "fallback"), "fallback");
    }

    #[test]
    fn test_url_join() {
        let client = ServiceClient::new("http://localhost:3000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url("/orders/active"), "http://localhost:3000/orders/active");
        assert_eq!(client.url("pricing/config"), "http://localhost:3000/pricing/config");
    }

    #[test]
    fn test_session_error_detection() {
        let err = HttpClientError::Unauthorized { status: 403, message: "x".into() };
        assert!(err.is_session_error());
        assert_eq!(err.status(), Some(403));

        let err = HttpClientError::Rejected { status: 500, message: "x".into() };
        assert!(!err.is_session_error());
        assert_eq!(err.status(), Some(500));

        assert_eq!(HttpClientError::RequestFailed("timeout".into()).status(), None);
    }
}
