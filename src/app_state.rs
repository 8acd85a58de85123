use std::sync::Arc;

use crate::services::{
    coordinator::CoordinatorHandle,
    dedup::RejectionNotifier,
    media::MediaStore,
    settings::RuntimeSettings,
    sms::Notifier,
    trust::TrustList,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: CoordinatorHandle,
    pub notifier: Arc<dyn Notifier>,
    pub rejections: Arc<RejectionNotifier>,
    pub media: Arc<MediaStore>,
    pub trust: Arc<TrustList>,
    pub settings: Arc<RuntimeSettings>,
    /// Where the carrier should post documents of accepted inbound faxes.
    pub incoming_data_url: String,
}

impl AppState {
    pub fn new(
        coordinator: CoordinatorHandle,
        notifier: Arc<dyn Notifier>,
        media: Arc<MediaStore>,
        trust: Arc<TrustList>,
        incoming_data_url: String,
    ) -> Self {
        let rejections = RejectionNotifier::new(notifier.clone(), trust.clone());
        Self {
            coordinator,
            notifier,
            rejections: Arc::new(rejections),
            media,
            trust,
            settings: Arc::new(RuntimeSettings::default()),
            incoming_data_url,
        }
    }

    /// Text the operator, if there is one and they want to hear about it.
    pub async fn notify_owner(&self, body: &str) {
        if !self.settings.notify() {
            return;
        }
        let Some(owner) = self.trust.owner() else {
            return;
        };
        if let Err(e) = self.notifier.send(owner, body).await {
            tracing::warn!(to = %owner, error = %e, "Notification failed");
        }
    }
}
