use std::time::Duration;

use async_trait::async_trait;

use crate::error::Error;

const USER_AGENT: &str = concat!("lbcfd/", env!("CARGO_PKG_VERSION"));

/// Transport used to reach drivers.
///
/// One call is one request and one response. Implementations must give up after `timeout`
/// and must not retry; retrying across time belongs to whoever drives the retryable webhooks.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(
        &self,
        url: &str,
        timeout: Duration,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, Error>;

    async fn health(&self, url: &str, timeout: Duration) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: reqwest::Client,
}

impl HttpInvoker {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Client)?;
        Ok(Self { client })
    }
}

fn transport_error(url: &str, timeout: Duration, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        Error::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
    #[tracing::instrument(skip(self, body))]
    async fn invoke(
        &self,
        url: &str,
        timeout: Duration,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(url, timeout, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, timeout, e))?;

        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        serde_json::from_slice(&bytes).map_err(Error::Decode)
    }

    #[tracing::instrument(skip(self))]
    async fn health(&self, url: &str, timeout: Duration) -> Result<(), Error> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(url, timeout, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::UnexpectedStatus {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}
