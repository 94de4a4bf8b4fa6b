use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use super::models::FetchConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Clone)]
pub struct FetchClient {
    config: FetchConfig,
    client: Client,
}

impl FetchClient {
    pub fn new(config: FetchConfig) -> Self {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });
        Self { config, client }
    }

    /// The URL actually requested for a catalog URL.
    pub fn proxied(&self, url: &str) -> String {
        format!("{}{}", self.config.proxy_prefix, url)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let target = self.proxied(url);
        debug!(url = %target, "GET");
        let response = self.client.get(&target).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// Fetch the whole body of `url`.
    pub async fn fetch(&self, url: &str) -> Result<Bytes> {
        let bytes = self.get(url).await?.bytes().await?;
        debug!(url, bytes = bytes.len(), "Fetched");
        Ok(bytes)
    }

    /// Returns (total_size, stream)
    pub async fn download_file_stream(
        &self,
        url: &str,
    ) -> Result<(Option<u64>, BoxStream<'static, Result<Bytes>>)> {
        let response = self.get(url).await?;

        let total_size = response.content_length();
        let stream = response
            .bytes_stream()
            .map_err(FetchError::RequestError)
            .boxed();

        Ok((total_size, stream))
    }

    /// Fetch `url`, calling `on_progress(received, total)` after every chunk.
    ///
    /// When the server does not announce a length the body is still read in full,
    /// but no progress is reported.
    pub async fn fetch_with_progress<F>(&self, url: &str, mut on_progress: F) -> Result<Bytes>
    where
        F: FnMut(u64, u64) + Send,
    {
        let (total_size, mut stream) = self.download_file_stream(url).await?;
        let total = total_size.filter(|&t| t > 0);
        if total.is_none() {
            warn!(url, "Content-Length not found, progress will not be shown");
        }

        // Content-Length only drives progress; the buffer grows with what arrives.
        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);
            if let Some(total) = total {
                on_progress(buffer.len() as u64, total);
            }
        }

        debug!(url, bytes = buffer.len(), "Fetched with progress");
        Ok(buffer.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn direct_client() -> FetchClient {
        FetchClient::new(FetchConfig {
            proxy_prefix: String::new(),
            ..FetchConfig::default()
        })
    }

    #[test]
    fn test_proxied_prepends_prefix() {
        let client = FetchClient::new(FetchConfig::default());
        assert_eq!(
            client.proxied("https://github.com/a/b.zip"),
            "https://github-asset-proxy.adamraichu.workers.dev/?url=https://github.com/a/b.zip"
        );
        assert_eq!(direct_client().proxied("https://x/y"), "https://x/y");
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/plugin.dll")
            .with_status(200)
            .with_body(b"plugin-bytes")
            .create_async()
            .await;

        let url = format!("{}/plugin.dll", server.url());
        let bytes = direct_client().fetch(&url).await.unwrap();

        assert_eq!(&bytes[..], b"plugin-bytes");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_goes_through_proxy() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/proxy")
            .match_query(mockito::Matcher::UrlEncoded(
                "url".into(),
                "https://github.com/a/b.dll".into(),
            ))
            .with_body("proxied")
            .create_async()
            .await;

        let client = FetchClient::new(FetchConfig {
            proxy_prefix: format!("{}/proxy?url=", server.url()),
            ..FetchConfig::default()
        });
        let bytes = client.fetch("https://github.com/a/b.dll").await.unwrap();

        assert_eq!(&bytes[..], b"proxied");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_fails_on_http_status() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/missing", server.url());
        let err = direct_client().fetch(&url).await.unwrap_err();
        match err {
            FetchError::Status { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_with_progress_reports_bytes() {
        let body = vec![7u8; 64 * 1024];
        let mut server = mockito::Server::new_async().await;
        let _base = server
            .mock("GET", "/base.zip")
            .with_body(body.clone())
            .create_async()
            .await;

        let url = format!("{}/base.zip", server.url());
        let mut calls = Vec::new();
        let bytes = direct_client()
            .fetch_with_progress(&url, |received, total| calls.push((received, total)))
            .await
            .unwrap();

        assert_eq!(bytes.len(), body.len());
        assert!(!calls.is_empty());
        assert!(calls.iter().all(|&(_, total)| total == body.len() as u64));
        assert!(calls.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(calls.last().unwrap().0, body.len() as u64);
    }

    #[tokio::test]
    async fn test_fetch_with_progress_without_content_length() {
        let mut server = mockito::Server::new_async().await;
        let _chunked = server
            .mock("GET", "/chunked.zip")
            .with_chunked_body(|w| {
                w.write_all(b"first-half;")?;
                w.write_all(b"second-half")
            })
            .create_async()
            .await;

        let url = format!("{}/chunked.zip", server.url());
        let mut calls = 0;
        let bytes = direct_client()
            .fetch_with_progress(&url, |_, _| calls += 1)
            .await
            .unwrap();

        assert_eq!(&bytes[..], b"first-half;second-half");
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_fetch_with_progress_ignores_inflated_content_length() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10000000000000000000\r\n\r\nPK")
                .await
                .unwrap();
        });

        let url = format!("http://{addr}/huge.zip");
        let mut calls = Vec::new();
        let err = direct_client()
            .fetch_with_progress(&url, |received, total| calls.push((received, total)))
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, FetchError::RequestError(_)), "unexpected error: {err:?}");
        assert!(calls.iter().all(|&(received, _)| received <= 2));
    }
}
