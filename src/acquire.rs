//! Text acquisition.
//!
//! Fetches the raw documentation text for an element from a URL or a local
//! file. Nothing is parsed or chunked; the whole body becomes the element
//! content.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Connect timeout for document fetches.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Read `url_or_path`: an HTTP(S) GET for URLs, a full file read otherwise.
///
/// # Errors
///
/// Non-success HTTP statuses, network errors, missing or non-UTF-8 files.
pub async fn obtain_text(client: &reqwest::Client, url_or_path: &str) -> Result<String> {
    if is_url(url_or_path) {
        let response = client
            .get(url_or_path)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url_or_path))?
            .error_for_status()
            .with_context(|| format!("Failed to fetch {}", url_or_path))?;
        Ok(response.text().await?)
    } else {
        tokio::fs::read_to_string(url_or_path)
            .await
            .with_context(|| format!("Failed to read {}", url_or_path))
    }
}

/// Where element documentation comes from.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Return the documentation text for `name` at `version`.
    async fn acquire(&self, name: &str, version: &str) -> Result<String>;
}

/// Treats the version string as the URL or path of the documentation.
pub struct UrlOrPathSource {
    client: reqwest::Client,
}

impl UrlOrPathSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TextSource for UrlOrPathSource {
    async fn acquire(&self, name: &str, version: &str) -> Result<String> {
        tracing::debug!("Obtaining documentation for '{}' from '{}'", name, version);
        obtain_text(&self.client, version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn classifies_urls() {
        assert!(is_url("http://example.com/docs"));
        assert!(is_url("https://docs.rs/serde"));
        assert!(!is_url("docs/serde.md"));
        assert!(!is_url("ftp://example.com"));
        assert!(!is_url("1.0"));
    }

    #[tokio::test]
    async fn reads_local_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sample.md");
        std::fs::write(&path, "Sample documentation text.").unwrap();

        let source = UrlOrPathSource::new().unwrap();
        let text = source
            .acquire("sample", path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(text, "Sample documentation text.");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.md");
        let client = reqwest::Client::new();
        let err = obtain_text(&client, path.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[tokio::test]
    async fn fetches_url_body_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/serde.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Serde is a framework."))
            .expect(1)
            .mount(&server)
            .await;

        let source = UrlOrPathSource::new().unwrap();
        let url = format!("{}/serde.txt", server.uri());
        let text = source.acquire("serde", &url).await.unwrap();
        assert_eq!(text, "Serde is a framework.");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.txt"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/gone.txt", server.uri());
        let err = obtain_text(&client, &url).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to fetch"), "{}", message);
        assert!(message.contains("404"), "{}", message);
    }
}
