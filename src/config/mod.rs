use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:9000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Twilio account SID
    pub twilio_sid: String,

    /// Twilio authorization token
    pub twilio_token: String,

    /// Phone number SMS and faxes are sent from
    pub from_number: String,

    /// Base URL where the carrier reaches our callbacks
    #[serde(default = "default_callback_base_url")]
    pub callback_base_url: String,

    /// Comma-separated list of trusted phone numbers; the first is the operator
    #[serde(default)]
    pub whitelist: String,

    /// Directory holding composed fax documents
    #[serde(default = "default_media_dir")]
    pub media_dir: String,

    /// Account-relative SMS endpoint prefix
    #[serde(default = "default_sms_api_url")]
    pub sms_api_url: String,

    /// Fax submission endpoint
    #[serde(default = "default_fax_api_url")]
    pub fax_api_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:9000".to_string()
}

fn default_callback_base_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_media_dir() -> String {
    "tmp".to_string()
}

fn default_sms_api_url() -> String {
    "https://api.twilio.com/2010-04-01/Accounts/".to_string()
}

fn default_fax_api_url() -> String {
    "https://fax.twilio.com/v1/Faxes".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    fn callback(&self, path: &str) -> String {
        format!("{}{}", self.callback_base_url.trim_end_matches('/'), path)
    }

    /// Where the carrier reports SMS delivery status.
    pub fn sms_status_callback(&self) -> String {
        self.callback("/smsStatus")
    }

    /// Where the carrier reports outbound fax status.
    pub fn fax_status_callback(&self) -> String {
        self.callback("/faxStatus")
    }

    /// Prefix the carrier fetches fax documents from.
    pub fn media_base_url(&self) -> String {
        self.callback("/faxMedia/")
    }

    /// Where the carrier posts received fax documents.
    pub fn incoming_data_url(&self) -> String {
        self.callback("/faxReceiveFile")
    }
}
