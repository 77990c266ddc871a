//! API client for the user directory's search and avatar endpoints.
//!
//! Both calls are plain unauthenticated GETs. The search endpoint takes the
//! raw query text as the `query` parameter and answers with
//! `{ok, error, users: [...]}`; avatars are whatever bytes live at the URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::models::{RemoteUser, UserListResponse};

use super::{NetworkError, RemoteClient};

// ============================================================================
// Constants
// ============================================================================

/// Default search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://slack-users.herokuapp.com/search";

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Query parameter carrying the search text.
const QUERY_PARAM: &str = "query";

/// API client for the user directory.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client against `base_url` with the given request timeout.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, NetworkError> {
        let base_url = Self::parse_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn parse_url(url: &str) -> Result<Url, NetworkError> {
        let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(NetworkError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                url, other
            ))),
        }
    }

    /// Build the search URL for `text`. The text is passed through as-is;
    /// only percent-encoding is applied.
    pub fn search_url(&self, text: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair(QUERY_PARAM, text);
        url
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, NetworkError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(NetworkError::from_status(status, &body))
        }
    }

    /// Decode a search response body.
    fn parse_search_response(text: &str, body: &str) -> Result<Vec<RemoteUser>, NetworkError> {
        let parsed: UserListResponse = serde_json::from_str(body)?;
        if !parsed.ok {
            // Still a valid answer; the user list is usually absent here.
            warn!(
                text = %text,
                error = parsed.error.as_deref().unwrap_or(""),
                "Search endpoint reported ok=false"
            );
        }
        Ok(parsed.into_users())
    }
}

#[async_trait]
impl RemoteClient for ApiClient {
    async fn search_users(&self, text: &str) -> Result<Vec<RemoteUser>, NetworkError> {
        let url = self.search_url(text);
        debug!(url = %url, "Searching remote directory");

        let response = self.client.get(url).send().await?;
        let response = Self::check_response(response).await?;

        let body = response.text().await?;
        let users = Self::parse_search_response(text, &body)?;
        debug!(text = %text, count = users.len(), "Remote search returned");
        Ok(users)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        let parsed = Self::parse_url(url)?;
        debug!(url = %parsed, "Fetching image");

        let response = self.client.get(parsed).send().await?;
        let response = Self::check_response(response).await?;

        let bytes = response.bytes().await?;
        debug!(url = url, bytes = bytes.len(), "Image fetched");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn client() -> ApiClient {
        ApiClient::with_base_url("https://directory.example.com/search", Duration::from_secs(5))
            .expect("Failed to build test client")
    }

    #[test]
    fn test_search_url_encodes_text() {
        let url = client().search_url("ann smith&co");
        assert_eq!(
            url.as_str(),
            "https://directory.example.com/search?query=ann+smith%26co"
        );
    }

    #[test]
    fn test_search_url_keeps_existing_params() {
        let client = ApiClient::with_base_url(
            "https://directory.example.com/search?v=2",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.search_url("bo").as_str(),
            "https://directory.example.com/search?v=2&query=bo"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ApiClient::with_base_url("not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(NetworkError::InvalidUrl(_))));

        let result = ApiClient::with_base_url("ftp://example.com/search", Duration::from_secs(5));
        assert!(matches!(result, Err(NetworkError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_image_rejects_malformed_url() {
        let result = client().fetch_image("::not-a-url::").await;
        assert!(matches!(result, Err(NetworkError::InvalidUrl(_))));
    }

    /// Serve one canned HTTP response on an ephemeral local port.
    /// Returns the base URL and a receiver for the raw request head.
    async fn serve_once(status: &'static str, body: &'static [u8]) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            let _ = socket.shutdown().await;
        });

        (format!("http://{}/search", addr), rx)
    }

    fn local_client(base_url: &str) -> ApiClient {
        ApiClient::with_base_url(base_url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_search_users_over_http() {
        let body = br#"{"ok": true, "users": [
            {"avatar_url": "https://x/1.png", "display_name": "Ann", "id": 1, "username": "ann"}
        ]}"#;
        let (base, request) = serve_once("200 OK", body).await;

        let users = local_client(&base).search_users("ann smith").await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, Some(1));
        assert_eq!(users[0].display_name.as_deref(), Some("Ann"));

        let request = request.await.unwrap();
        assert!(request.starts_with("GET /search?query=ann+smith HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_search_users_server_error_is_transport() {
        let (base, _request) = serve_once("500 Internal Server Error", b"boom").await;

        let err = local_client(&base).search_users("ann").await.unwrap_err();
        match err {
            NetworkError::Transport(message) => {
                assert!(message.contains("500"));
                assert!(message.contains("boom"));
            }
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_users_garbage_body_is_decode() {
        let (base, _request) = serve_once("200 OK", b"<html>maintenance</html>").await;

        let err = local_client(&base).search_users("ann").await.unwrap_err();
        assert!(matches!(err, NetworkError::Decode(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = local_client(&format!("http://{}/search", addr));
        let err = client.search_users("ann").await.unwrap_err();
        assert!(matches!(err, NetworkError::Transport(_)));
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn test_fetch_image_over_http() {
        let (base, _request) = serve_once("200 OK", &[0x89, b'P', b'N', b'G']).await;
        let client = local_client(&base);

        let bytes = client.fetch_image(&base).await.unwrap();
        assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_fetch_image_not_found_is_transport() {
        let (base, _request) = serve_once("404 Not Found", b"").await;
        let client = local_client(&base);

        let err = client.fetch_image(&base).await.unwrap_err();
        assert_eq!(err.to_string(), "Transport error: Status 404 Not Found");
    }

    #[test]
    fn test_parse_search_response() {
        let body = r#"{"ok": true, "users": [
            {"avatar_url": "https://x/1.png", "display_name": "Ann", "id": 1, "username": "ann"},
            {"avatar_url": "https://x/2.png", "display_name": "Anna", "id": 2, "username": "anna"}
        ]}"#;
        let users = ApiClient::parse_search_response("an", body).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].user_name.as_deref(), Some("anna"));
    }

    #[test]
    fn test_parse_search_response_not_ok_is_empty() {
        let users =
            ApiClient::parse_search_response("zz", r#"{"ok": false, "error": "no_match"}"#).unwrap();
        assert!(users.is_empty());
    }

    #[test]
    fn test_parse_search_response_garbage() {
        let result = ApiClient::parse_search_response("an", "<html>oops</html>");
        assert!(matches!(result, Err(NetworkError::Decode(_))));
    }
}
