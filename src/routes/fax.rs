use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Form;

use crate::app_state::AppState;
use crate::models::fax::FaxCallback;
use crate::routes::twiml::TwiML;
use crate::services::media::MediaStore;

fn log_fax(cb: &FaxCallback) {
    tracing::info!(
        from = %cb.from,
        to = %cb.to,
        sid = %cb.fax_sid,
        error_code = cb.error_code(),
        status = %cb.fax_status,
        error = %cb.error_message,
        "Fax status"
    );
}

/// POST /faxStatus — Carrier progress report for an outbound fax.
pub async fn fax_status(State(state): State<AppState>, Form(cb): Form<FaxCallback>) -> &'static str {
    log_fax(&cb);
    if let Err(e) = state.coordinator.status(cb.status_line()) {
        tracing::error!(sid = %cb.fax_sid, error = %e, "Unable to queue fax status");
    }
    "OK"
}

/// POST /faxReceive — An inbound fax is being offered.
pub async fn fax_receive(State(state): State<AppState>, Form(cb): Form<FaxCallback>) -> TwiML {
    log_fax(&cb);

    if state.settings.receive_faxes() {
        tracing::info!(from = %cb.from, "Accepting fax");
        state
            .notify_owner(&format!("Accepting fax from {:?} to {:?}", cb.from, cb.to))
            .await;
        return TwiML::Receive {
            action: state.incoming_data_url.clone(),
        };
    }

    tracing::info!(from = %cb.from, "Rejecting fax");
    if state.settings.notify() {
        state.rejections.suppress(
            &cb.from,
            format!("Rejecting fax from {:?} to {:?}", cb.from, cb.to),
        );
    }
    TwiML::Reject
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/tiff" => "tiff",
        _ => "pdf",
    }
}

/// POST /faxReceiveFile — Document of an accepted inbound fax.
pub async fn fax_receive_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<&'static str, StatusCode> {
    let mut cb = FaxCallback::default();
    let mut stored = None;

    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "Media" {
            let original = field.file_name().unwrap_or_default().to_string();
            let ext = extension_for(field.content_type().unwrap_or_default());
            let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            let file = state.media.store(&data, ext).await.map_err(|e| {
                tracing::error!(error = %e, "Unable to store received fax");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            stored = Some((original, file));
            continue;
        }

        let value = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        match name.as_str() {
            "From" => cb.from = value,
            "To" => cb.to = value,
            "FaxSid" => cb.fax_sid = value,
            "FaxStatus" => cb.fax_status = value,
            "NumPages" => cb.num_pages = value,
            "ErrorCode" => cb.error_code = value,
            "ErrorMessage" => cb.error_message = value,
            _ => {}
        }
    }
    log_fax(&cb);

    if cb.error_code() != 0 {
        state
            .notify_owner(&format!(
                "Failed to receive fax from {:?} to {:?}: {} {}",
                cb.from,
                cb.to,
                cb.error_code(),
                cb.error_message
            ))
            .await;
    }

    if let Some((original, file)) = stored {
        tracing::info!(from = %cb.from, file = %file, "Stored received fax");
        state
            .notify_owner(&format!(
                "Received fax {:?} from {:?} to {:?}: {} ({} pages)",
                original,
                cb.from,
                cb.to,
                cb.fax_status,
                cb.pages()
            ))
            .await;
    }

    Ok("OK")
}

/// GET /faxMedia/{file} — Serve a composed document to the carrier.
pub async fn fax_media(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    if !MediaStore::is_servable(&file) {
        tracing::warn!(file = %file, "Invalid media file requested");
        return Err(StatusCode::NOT_FOUND);
    }
    let data = state.media.read(&file).await.map_err(|e| {
        tracing::warn!(file = %file, error = %e, "Media file unavailable");
        StatusCode::NOT_FOUND
    })?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], data))
}
