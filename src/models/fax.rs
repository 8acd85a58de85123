use garde::Validate;
use serde::{Deserialize, Serialize};

/// Strip the separators people type into phone numbers.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.'))
        .collect()
}

/// Text fields of the fax submission form.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SubmitFaxForm {
    #[garde(length(max = 200))]
    pub from_name: String,

    #[garde(pattern(r"^\+[0-9]+$"))]
    pub from_phone: String,

    #[garde(length(max = 200))]
    pub from_addr1: String,

    #[garde(length(max = 200))]
    pub from_addr2: String,

    #[garde(length(max = 200))]
    pub to_name: String,

    #[garde(pattern(r"^\+[0-9]+$"))]
    pub to_phone: String,

    #[garde(length(max = 200))]
    pub subject: String,

    #[garde(length(max = 4000))]
    pub text: String,

    #[garde(length(max = 20))]
    pub quality: String,
}

/// Response after a fax was accepted for approval.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitFaxResponse {
    pub status: String,
    pub message: String,
    pub pdf_file: String,
}

/// Inbound SMS webhook payload (subset of fields we act on).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SmsWebhook {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub message_status: String,
    #[serde(default)]
    pub sms_status: String,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub from_city: String,
    #[serde(default)]
    pub from_state: String,
    #[serde(default)]
    pub from_country: String,
}

impl SmsWebhook {
    pub fn status(&self) -> &str {
        if self.message_status.is_empty() {
            &self.sms_status
        } else {
            &self.message_status
        }
    }

    /// "City State Country" of the sender, when the carrier provided any of it.
    pub fn location(&self) -> String {
        [&self.from_city, &self.from_state, &self.from_country]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Fax callback payload: status updates for outbound faxes and inbound fax offers.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaxCallback {
    #[serde(default)]
    pub fax_sid: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub fax_status: String,
    #[serde(default)]
    pub num_pages: String,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
}

impl FaxCallback {
    pub fn pages(&self) -> u32 {
        self.num_pages.parse().unwrap_or(0)
    }

    pub fn error_code(&self) -> i64 {
        self.error_code.parse().unwrap_or(0)
    }

    /// Status line fed to the coordinator: `<sid>|<human readable status>`.
    pub fn status_line(&self) -> String {
        let mut msg = format!(
            "{}|Fax to {:?}: {} ({} pages)",
            self.fax_sid,
            self.to,
            self.fax_status,
            self.pages()
        );
        if self.error_code() != 0 || !self.error_message.is_empty() {
            msg.push_str(&format!(" {} {}", self.error_code(), self.error_message));
        }
        msg
    }
}
