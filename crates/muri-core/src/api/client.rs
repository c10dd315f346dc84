//! HTTP client for the link service.

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use super::links::{CustomLinkRequest, normalize_url};
use crate::config::Config;

/// Production endpoint of the link service.
pub const DEFAULT_BASE_URL: &str = "https://www.getmyuri.com";

/// Standard User-Agent header for muri API requests.
pub const USER_AGENT: &str = concat!("muri/", env!("CARGO_PKG_VERSION"));

/// Resolves the service base URL with precedence: env > config > default.
///
/// # Panics
/// - In test builds (`#[cfg(test)]`), panics if the resolved base is the
///   production service.
/// - At runtime, panics if `MURI_BLOCK_REAL_API=1` and the resolved base is
///   the production service.
///
/// This prevents tests from accidentally making real network requests.
/// Use the `MURI_BASE_URL` env var or config to point to a mock server.
pub fn resolve_base_url(config_base_url: Option<&str>) -> Result<Url> {
    let resolved = if let Ok(env_url) = std::env::var("MURI_BASE_URL")
        && !env_url.trim().is_empty()
    {
        env_url.trim().to_string()
    } else if let Some(config_url) = config_base_url {
        config_url.trim().to_string()
    } else {
        DEFAULT_BASE_URL.to_string()
    };

    guard_production(&resolved);

    Url::parse(&resolved).with_context(|| format!("Invalid service base URL: {resolved}"))
}

#[cfg(test)]
fn guard_production(base_url: &str) {
    assert!(
        base_url != DEFAULT_BASE_URL,
        "Tests must not use the production link service!\n\
         Set MURI_BASE_URL to a mock server (e.g., wiremock).\n\
         Found base_url: {base_url}"
    );
}

#[cfg(not(test))]
fn guard_production(base_url: &str) {
    if std::env::var("MURI_BLOCK_REAL_API").is_ok_and(|v| v == "1") && base_url == DEFAULT_BASE_URL
    {
        panic!(
            "MURI_BLOCK_REAL_API=1 but trying to use the production link service!\n\
             Set MURI_BASE_URL to a mock server.\n\
             Found base_url: {base_url}"
        );
    }
}

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    #[serde(rename = "shortUrl")]
    short_url: String,
}

/// Client for the shortening endpoints.
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = resolve_base_url(config.effective_base_url())?;

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build api client")?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the shareable short link for an alias path.
    pub fn short_link(&self, alias_path: &str) -> String {
        format!(
            "{}/r/{}",
            self.base_url.as_str().trim_end_matches('/'),
            alias_path.trim_matches('/')
        )
    }

    /// Shortens a destination URL with an auto-generated alias.
    ///
    /// The destination is scheme-normalized first; the server answers with
    /// the generated alias in `shortUrl`.
    pub async fn shorten(&self, link: &str) -> Result<String> {
        let normalized = normalize_url(link)?;
        let endpoint = self
            .base_url
            .join("api/default/shorten")
            .context("build shorten endpoint")?;

        tracing::debug!("requesting short link");
        let response = self
            .http
            .post(endpoint)
            .json(&serde_json::json!({ "link": normalized }))
            .send()
            .await
            .context("shorten request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read shorten response")?;
        if !status.is_success() {
            anyhow::bail!("shorten failed: {}", server_message(status.as_u16(), &body));
        }

        let parsed: ShortenResponse =
            serde_json::from_str(&body).context("malformed shorten response")?;
        Ok(self.short_link(&parsed.short_url))
    }

    /// Creates a customized link (manual alias, optional passcode, expiry,
    /// geofence) and returns the shareable short link.
    pub async fn create_custom(&self, request: &CustomLinkRequest) -> Result<String> {
        let endpoint = self
            .base_url
            .join("api/custom/create")
            .context("build custom-link endpoint")?;

        tracing::debug!(alias = %request.alias_path(), "creating custom link");
        let response = self
            .http
            .post(endpoint)
            .json(request)
            .send()
            .await
            .context("custom-link request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read custom-link response")?;
        if !status.is_success() {
            anyhow::bail!(
                "custom link creation failed: {}",
                server_message(status.as_u16(), &body)
            );
        }

        Ok(self.short_link(&request.alias_path()))
    }
}

/// Extracts the server's own message from an error body when it carries one.
fn server_message(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(message) = json.get("message").and_then(|v| v.as_str())
    {
        return format!("HTTP {status}: {message}");
    }
    format!("HTTP {status}")
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(base: &str) -> ApiClient {
        let config = Config {
            base_url: Some(base.to_string()),
            ..Default::default()
        };
        ApiClient::new(&config).unwrap()
    }

    /// Shorten: posts the normalized link, returns the full short link.
    #[tokio::test]
    async fn test_shorten_normalizes_and_formats() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/default/shorten"))
            .and(body_json(
                serde_json::json!({ "link": "https://example.com/page" }),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "shortUrl": "a1b2c3" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let short = api.shorten("example.com/page").await.unwrap();
        assert_eq!(short, format!("{}/r/a1b2c3", server.uri()));
    }

    /// Shorten: server errors carry the server message when present.
    #[tokio::test]
    async fn test_shorten_surfaces_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/default/shorten"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "message": "invalid link" })),
            )
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let err = api.shorten("https://example.com").await.unwrap_err();
        assert!(err.to_string().contains("invalid link"));
    }

    /// Shorten: an invalid destination never reaches the server.
    #[tokio::test]
    async fn test_shorten_rejects_invalid_destination() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        assert!(api.shorten("not a url").await.is_err());
    }
}
