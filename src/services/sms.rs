use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::services::trust::TrustList;

/// Outbound text messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

/// Client for the Twilio Programmable Messaging API.
pub struct SmsClient {
    http: Client,
    api_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
    status_callback: Option<String>,
    trust: Arc<TrustList>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CarrierReply {
    pub sid: Option<String>,
    pub status: Option<String>,
    pub code: Option<serde_json::Value>,
    pub message: Option<String>,
}

impl CarrierReply {
    pub(crate) fn code(&self) -> String {
        self.code.as_ref().map(|c| c.to_string()).unwrap_or_default()
    }
}

impl SmsClient {
    pub fn new(
        http: Client,
        api_url: &str,
        account_sid: &str,
        auth_token: &str,
        from: &str,
        trust: Arc<TrustList>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from: from.to_string(),
            status_callback: None,
            trust,
        }
    }

    pub fn with_status_callback(mut self, url: impl Into<String>) -> Self {
        self.status_callback = Some(url.into());
        self
    }

    fn messages_url(&self) -> String {
        format!("{}{}/Messages.json", self.api_url, self.account_sid)
    }
}

#[async_trait]
impl Notifier for SmsClient {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        if !self.trust.contains(to) {
            return Err(NotifyError::Untrusted(to.to_string()));
        }

        let mut form = vec![("To", to), ("From", self.from.as_str()), ("Body", body)];
        if let Some(cb) = &self.status_callback {
            form.push(("StatusCallback", cb.as_str()));
        }

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(NotifyError::Http)?;

        let status = response.status();
        let reply: CarrierReply = response.json().await.map_err(NotifyError::Http)?;

        if !status.is_success() {
            return Err(NotifyError::Api {
                status,
                code: reply.code(),
                message: reply.message.unwrap_or_default(),
            });
        }

        tracing::info!(
            from = %self.from,
            to = %to,
            status = reply.status.as_deref().unwrap_or(""),
            sid = reply.sid.as_deref().unwrap_or(""),
            "SMS sent"
        );
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("the number {0:?} is not whitelisted")]
    Untrusted(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMS rejected: HTTP {status}: {code} {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },
}
