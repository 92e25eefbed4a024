//! Rate-limited, retried, cached JSON calls against one provider host.

use crate::core::cache::{CacheKey, ResponseCache};
use crate::core::rate_limiter::RateLimiter;
use crate::core::retry::{with_retry, RetryPolicy};
use crate::utils::error::{BacklinkError, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::Duration;

/// Credentials attached to every request.
#[derive(Clone)]
pub enum Auth {
    Bearer(String),
    Basic { login: String, password: String },
    None,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(***)"),
            Self::Basic { login, .. } => write!(f, "Basic({}:***)", login),
            Self::None => f.write_str("None"),
        }
    }
}

pub struct HttpExecutor {
    client: Client,
    base_url: String,
    auth: Auth,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    retry: RetryPolicy,
}

impl HttpExecutor {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(
        base_url: impl Into<String>,
        auth: Auth,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        Self::with_timeout(base_url, auth, limiter, cache, retry, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        auth: Auth,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            limiter,
            cache,
            retry,
        })
    }

    /// `GET base_url + path_and_query`, already encoded.
    pub async fn get_json(&self, operation: &str, path_and_query: &str) -> Result<serde_json::Value> {
        let key = CacheKey::new(operation, format!("GET {}", path_and_query));
        self.cache
            .get_or_fetch(key, || {
                with_retry(&self.retry, operation, || {
                    self.send_once(Method::GET, path_and_query, None)
                })
            })
            .await
    }

    /// `POST base_url + path` with a JSON body.
    pub async fn post_json(
        &self,
        operation: &str,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let key = CacheKey::new(operation, format!("POST {} {}", path, body));
        self.cache
            .get_or_fetch(key, || {
                with_retry(&self.retry, operation, || {
                    self.send_once(Method::POST, path, Some(body))
                })
            })
            .await
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        self.limiter.acquire().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::info!("API request {} {}", method, path);

        let mut request = self
            .client
            .request(method, &url)
            .header(ACCEPT, "application/json");
        request = match &self.auth {
            Auth::Bearer(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            Auth::Basic { login, password } => request.basic_auth(login, Some(password)),
            Auth::None => request,
        };
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!("API error (status {}): {}", status.as_u16(), text);
            return Err(BacklinkError::UpstreamStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| BacklinkError::parse(format!("response of {}", path), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn executor(server: &MockServer, auth: Auth) -> HttpExecutor {
        HttpExecutor::new(
            server.base_url(),
            auth,
            Arc::new(RateLimiter::new(50)),
            Arc::new(ResponseCache::default()),
            RetryPolicy::new(3, Duration::from_millis(2), Duration::from_millis(10)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_sends_bearer_and_parses_json() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v3/ping")
                .header("authorization", "Bearer secret")
                .header("accept", "application/json");
            then.status(200).json_body(serde_json::json!({"pong": true}));
        });

        let exec = executor(&server, Auth::Bearer("secret".to_string()));
        let value = exec.get_json("ping", "/v3/ping").await.unwrap();

        api_mock.assert();
        assert_eq!(value["pong"], true);
    }

    #[tokio::test]
    async fn test_non_success_retried_then_surfaced_with_body() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/v3/broken");
            then.status(500).body("{\"error\":\"upstream down\"}");
        });

        let exec = executor(&server, Auth::None);
        let result = exec.get_json("broken", "/v3/broken").await;

        api_mock.assert_hits(3);
        match result {
            Err(BacklinkError::UpstreamStatus { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("upstream down"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_failure_without_retry() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/v3/garbled");
            then.status(200).body("<html>not json</html>");
        });

        let exec = executor(&server, Auth::None);
        let result = exec.get_json("garbled", "/v3/garbled").await;

        api_mock.assert_hits(1);
        assert!(matches!(result, Err(BacklinkError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_identical_requests_hit_network_once() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v3/summary")
                .header("content-type", "application/json");
            then.status(200).json_body(serde_json::json!({"status_code": 20000}));
        });

        let exec = executor(
            &server,
            Auth::Basic {
                login: "user".to_string(),
                password: "pass".to_string(),
            },
        );
        let body = serde_json::json!([{"target": "a.com"}]);
        exec.post_json("summary", "/v3/summary", &body).await.unwrap();
        exec.post_json("summary", "/v3/summary", &body).await.unwrap();

        api_mock.assert_hits(1);
    }

    #[test]
    fn test_auth_debug_hides_secrets() {
        let auth = Auth::Basic {
            login: "user".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", auth).contains("hunter2"));
        assert!(!format!("{:?}", Auth::Bearer("token".to_string())).contains("token"));
    }
}
