use async_trait::async_trait;
use serde_json::Value;

use crate::provider::{DataFetcher, FetchError};

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};

    async fn serve() -> String {
        let app = Router::new()
            .route("/ok", get(|| async { Json(serde_json::json!({ "message": "success" })) }))
            .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "nope") }))
            .route("/broken", get(|| async { "{ not json" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_fetch_parses_json() {
        let base = serve().await;
        let v = HttpFetcher::new().fetch_json(&format!("{base}/ok")).await.unwrap();
        assert_eq!(v["message"], "success");
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let base = serve().await;
        let err = HttpFetcher::new()
            .fetch_json(&format!("{base}/missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 404 }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let base = serve().await;
        let err = HttpFetcher::new()
            .fetch_json(&format!("{base}/broken"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = HttpFetcher::new()
            .fetch_json(&format!("http://{addr}/ok"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
