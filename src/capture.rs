use async_trait::async_trait;
use backoff::future::retry_notify;
use backoff::Error as BackoffError;
use backoff::ExponentialBackoff;
use reqwest::{header, Client};
use std::time::Duration;

use crate::error::RemoteError;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Source of page markup. In a browser host this is the content script;
/// here the default implementation fetches the page itself.
#[async_trait]
pub trait PageCapture: Send + Sync {
    async fn capture(&self, url: &str) -> Result<String, RemoteError>;
}

pub struct HttpPageCapture {
    client: Client,
    max_elapsed: Duration,
}

impl HttpPageCapture {
    pub fn new() -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(HttpPageCapture {
            client,
            max_elapsed: Duration::from_secs(60),
        })
    }
}

fn retry_notify_handler<E>(err: E, duration: Duration)
where
    E: std::fmt::Display,
{
    tracing::warn!(
        "Page fetch failed: {}. Retrying in {:.1}s...",
        err,
        duration.as_secs_f32()
    );
}

#[async_trait]
impl PageCapture for HttpPageCapture {
    #[tracing::instrument(skip(self))]
    async fn capture(&self, url: &str) -> Result<String, RemoteError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..ExponentialBackoff::default()
        };

        let response = retry_notify(
            backoff,
            || async {
                match self
                    .client
                    .get(url)
                    .header(header::ACCEPT, "text/html,application/xhtml+xml")
                    .send()
                    .await
                {
                    Ok(resp) => {
                        let status = resp.status();
                        if status.is_success() {
                            Ok(resp)
                        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                            tracing::debug!("Retrying on status: {}", status);
                            Err(BackoffError::transient(RemoteError::Status(status.as_u16())))
                        } else {
                            Err(BackoffError::permanent(RemoteError::Status(status.as_u16())))
                        }
                    }
                    Err(err) => {
                        if err.is_timeout() || err.is_connect() {
                            tracing::debug!("Retrying on reqwest error: {}", err);
                            Err(BackoffError::transient(RemoteError::from(err)))
                        } else {
                            Err(BackoffError::permanent(RemoteError::from(err)))
                        }
                    }
                }
            },
            retry_notify_handler,
        )
        .await?;

        let html = response.text().await?;
        tracing::info!("Captured {} bytes from {}", html.len(), url);
        Ok(html)
    }
}
