use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::services::sms::CarrierReply;

/// Hands a composed document to the fax carrier.
#[async_trait]
pub trait FaxCarrier: Send + Sync {
    /// Returns the carrier-assigned fax identifier.
    async fn submit(&self, to: &str, media_url: &str, quality: &str)
        -> Result<String, CarrierError>;
}

/// Client for the Twilio Programmable Fax API.
pub struct FaxClient {
    http: Client,
    api_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
    status_callback: Option<String>,
    store_media: bool,
}

impl FaxClient {
    pub fn new(http: Client, api_url: &str, account_sid: &str, auth_token: &str, from: &str) -> Self {
        Self {
            http,
            api_url: api_url.to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from: from.to_string(),
            status_callback: None,
            store_media: false,
        }
    }

    pub fn with_status_callback(mut self, url: impl Into<String>) -> Self {
        self.status_callback = Some(url.into());
        self
    }

    fn form<'a>(&'a self, to: &'a str, media_url: &'a str, quality: &'a str) -> Vec<(&'a str, &'a str)> {
        let mut form = vec![
            ("To", to),
            ("From", self.from.as_str()),
            ("MediaUrl", media_url),
            ("StoreMedia", if self.store_media { "true" } else { "false" }),
        ];
        if !quality.is_empty() {
            form.push(("Quality", quality));
        }
        if let Some(cb) = &self.status_callback {
            form.push(("StatusCallback", cb.as_str()));
        }
        form
    }
}

#[async_trait]
impl FaxCarrier for FaxClient {
    async fn submit(
        &self,
        to: &str,
        media_url: &str,
        quality: &str,
    ) -> Result<String, CarrierError> {
        let response = self
            .http
            .post(&self.api_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header("Accept", "application/json")
            .form(&self.form(to, media_url, quality))
            .send()
            .await
            .map_err(CarrierError::Http)?;

        let status = response.status();
        let reply: CarrierReply = response.json().await.map_err(CarrierError::Http)?;

        if !status.is_success() {
            return Err(CarrierError::Api {
                status,
                code: reply.code(),
                message: reply.message.unwrap_or_default(),
            });
        }

        let sid = reply.sid.filter(|s| !s.is_empty()).ok_or(CarrierError::MissingSid)?;

        tracing::info!(
            from = %self.from,
            to = %to,
            sid = %sid,
            status = reply.status.as_deref().unwrap_or(""),
            "Fax submitted"
        );
        Ok(sid)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CarrierError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fax rejected: HTTP {status}: {code} {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("carrier accepted the fax but returned no sid")]
    MissingSid,
}
