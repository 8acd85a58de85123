use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A fax waiting for SMS approval, keyed by the submitter's phone number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaxJob {
    pub from_phone: String,
    pub from_name: String,
    pub from_addr1: String,
    pub from_addr2: String,
    pub to_phone: String,
    pub to_name: String,
    pub subject: String,
    pub text: String,
    /// Carrier quality hint ("standard", "fine", "superfine"); empty means carrier default.
    pub quality: String,
    /// Artifact file name, relative to the media directory.
    pub pdf_file: String,
    /// Set once the carrier has accepted the fax.
    pub fax_sid: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FaxJob {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    pub fn is_submitted(&self) -> bool {
        self.fax_sid.is_some()
    }
}
