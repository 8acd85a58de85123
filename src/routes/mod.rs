pub mod fax;
pub mod health;
pub mod metrics;
pub mod sms;
pub mod submit;
pub mod twiml;

use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

/// Application routes: submission form, carrier webhooks, media and health.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/sendFax", post(submit::send_fax))
        .route("/faxMedia/{file}", get(fax::fax_media))
        // carrier callbacks
        .route("/smsReceive", post(sms::sms_receive))
        .route("/smsStatus", post(sms::sms_status))
        .route("/faxStatus", post(fax::fax_status))
        .route("/faxReceive", post(fax::fax_receive))
        .route("/faxReceiveFile", post(fax::fax_receive_file))
        .with_state(state)
}
