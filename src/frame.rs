use crate::error::{Result, ResultError};
use crate::models::SiteConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

/// Something that can show a result page and report whether it loaded.
///
/// Implementations only signal load or error. They must not judge the page
/// content: a "not found" page served by the results site still counts as a
/// load, just as it does for a browser frame.
#[async_trait]
pub trait ResultFrame: Send + Sync {
    /// Loads `url`, returning `Err(ResultError::FrameLoadFailure(_))` if the
    /// page could not be fetched at all.
    async fn load(&self, url: &str) -> Result<()>;
}

/// A [`ResultFrame`] that fetches the page over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFrame {
    client: reqwest::Client,
}

impl HttpFrame {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ResultError::InvalidConfig(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, user_agent);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ResultFrame for HttpFrame {
    async fn load(&self, url: &str) -> Result<()> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url, error = %e, "Result page request failed");
            ResultError::FrameLoadFailure(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ResultError::FrameLoadFailure(e.to_string()))?;

        debug!(url, %status, bytes = body.len(), "Result page loaded");
        Ok(())
    }
}
