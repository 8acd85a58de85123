use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::fax::{normalize_phone, SubmitFaxForm, SubmitFaxResponse};
use crate::models::job::FaxJob;
use crate::services::coordinator::CoordinatorError;
use crate::services::media::MediaError;
use crate::services::sms::NotifyError;

/// The uploaded document.
struct Upload {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

impl Upload {
    fn is_pdf(&self) -> bool {
        self.content_type == "application/pdf" || self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }
}

async fn read_form(multipart: &mut Multipart) -> Result<(SubmitFaxForm, Option<Upload>), SubmitError> {
    let mut form = SubmitFaxForm::default();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SubmitError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "mediaFile" {
            let file_name = field.file_name().unwrap_or("document.pdf").to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| SubmitError::BadRequest(e.to_string()))?;
            upload = Some(Upload {
                file_name,
                content_type,
                data: data.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| SubmitError::BadRequest(e.to_string()))?;
        match name.as_str() {
            "fromName" => form.from_name = value,
            "fromPhone" => form.from_phone = normalize_phone(&value),
            "fromAddr1" => form.from_addr1 = value,
            "fromAddr2" => form.from_addr2 = value,
            "toName" => form.to_name = value,
            "toPhone" => form.to_phone = normalize_phone(&value),
            "subject" => form.subject = value,
            "text" => form.text = value,
            "quality" => form.quality = value,
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok((form, upload))
}

/// POST /sendFax — Accept a document for faxing once the submitter approves by SMS.
pub async fn send_fax(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitFaxResponse>, SubmitError> {
    let (form, upload) = read_form(&mut multipart).await?;

    if form.from_phone.is_empty() {
        return Err(SubmitError::BadRequest("From phone number is required".into()));
    }
    if form.to_phone.is_empty() {
        return Err(SubmitError::BadRequest("To phone number is required".into()));
    }
    form.validate()
        .map_err(|report| SubmitError::BadRequest(report.to_string()))?;
    if !state.trust.contains(&form.from_phone) {
        return Err(SubmitError::NotWhitelisted);
    }

    let upload = upload.ok_or_else(|| SubmitError::BadRequest("Fax document is required".into()))?;
    if !upload.is_pdf() {
        return Err(SubmitError::UnsupportedMedia(upload.content_type));
    }

    let pdf_file = state.media.store(&upload.data, "pdf").await?;

    let prompt = format!("Reply with OK to approve faxing {}", upload.file_name);
    if let Err(e) = state.notifier.send(&form.from_phone, &prompt).await {
        discard(&state, &pdf_file).await;
        return Err(SubmitError::Notify(e));
    }

    let job = FaxJob {
        from_phone: form.from_phone,
        from_name: form.from_name,
        from_addr1: form.from_addr1,
        from_addr2: form.from_addr2,
        to_phone: form.to_phone,
        to_name: form.to_name,
        subject: form.subject,
        text: form.text,
        quality: form.quality,
        pdf_file: pdf_file.clone(),
        fax_sid: None,
        created_at: Utc::now(),
    };
    if let Err(e) = state.coordinator.enqueue(job) {
        discard(&state, &pdf_file).await;
        return Err(e.into());
    }

    Ok(Json(SubmitFaxResponse {
        status: "pending_approval".to_string(),
        message: "Reply with OK from your phone to send the fax".to_string(),
        pdf_file,
    }))
}

async fn discard(state: &AppState, pdf_file: &str) {
    if let Err(e) = state.media.remove(pdf_file).await {
        tracing::warn!(pdf_file = %pdf_file, error = %e, "Unable to remove fax document");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{0}")]
    BadRequest(String),

    #[error("From phone number is not whitelisted")]
    NotWhitelisted,

    #[error("Unsupported document type {0:?}, expected a PDF")]
    UnsupportedMedia(String),

    #[error("Unable to store document: {0}")]
    Storage(#[from] MediaError),

    #[error("Unable to send approval request: {0}")]
    Notify(#[from] NotifyError),

    #[error("Fax service unavailable: {0}")]
    Unavailable(#[from] CoordinatorError),
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let status = match &self {
            SubmitError::BadRequest(_) | SubmitError::NotWhitelisted => StatusCode::BAD_REQUEST,
            SubmitError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            SubmitError::Storage(_) | SubmitError::Notify(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SubmitError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Fax submission failed");
        }
        (status, self.to_string()).into_response()
    }
}
