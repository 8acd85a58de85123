mod helpers;

use axum::http::StatusCode;
use faxgate::routes::health::HealthResponse;
use faxgate::routes::sms::{FALLBACK_TEXT, HELP_TEXT};
use helpers::{spawn_app, DEST, FRIEND, INCOMING_URL, OWNER, STRANGER};

#[tokio::test]
async fn test_health_reports_running_coordinator() {
    let app = spawn_app(Some("FX1"));
    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);

    let health: HealthResponse = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.checks.coordinator.status, "ok");
}

#[tokio::test]
async fn test_health_degrades_after_shutdown() {
    let app = spawn_app(Some("FX1"));
    app.shutdown.cancel();
    for _ in 0..50 {
        if !app.state.coordinator.is_running() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_sms_help_and_fallback() {
    let app = spawn_app(None);

    let response = app
        .post_form("/smsReceive", &[("From", STRANGER), ("Body", "Help")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type, "application/xml");
    assert!(response.text().contains("Fax options are:"));
    assert!(HELP_TEXT.contains("notify on|off"));

    let response = app
        .post_form("/smsReceive", &[("From", STRANGER), ("Body", "what?")])
        .await;
    assert!(response
        .text()
        .contains("I don&apos;t understand. Try &quot;help&quot;"));
    assert!(FALLBACK_TEXT.starts_with("I don't understand."));
}

#[tokio::test]
async fn test_settings_only_change_for_trusted_numbers() {
    let app = spawn_app(None);

    let response = app
        .post_form("/smsReceive", &[("From", STRANGER), ("Body", "fax enable")])
        .await;
    assert!(response.text().contains("I don&apos;t understand."));
    assert!(!app.state.settings.receive_faxes());

    let response = app
        .post_form("/smsReceive", &[("From", FRIEND), ("Body", "Fax On")])
        .await;
    assert!(response.text().contains("Receiving faxes enabled."));
    assert!(app.state.settings.receive_faxes());

    let response = app
        .post_form("/smsReceive", &[("From", OWNER), ("Body", "settings")])
        .await;
    assert!(response.text().contains("fax = enable"));
    assert!(response.text().contains("notify = on"));
}

#[tokio::test]
async fn test_rejected_faxes_notify_owner_once() {
    let mut app = spawn_app(None);
    let offer = [("From", STRANGER), ("To", DEST), ("FaxSid", "FXin")];

    for _ in 0..3 {
        let response = app.post_form("/faxReceive", &offer).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.text().contains("<Reject>"));
    }

    let (to, body) = app.next_notification().await;
    assert_eq!(to, OWNER);
    assert_eq!(body, format!("Rejecting fax from {STRANGER:?} to {DEST:?}"));

    // A different caller's notice arrives after anything the repeats could have sent.
    let other = [("From", FRIEND), ("To", DEST), ("FaxSid", "FXin2")];
    app.post_form("/faxReceive", &other).await;
    let (_, body) = app.next_notification().await;
    assert_eq!(body, format!("Rejecting fax from {FRIEND:?} to {DEST:?}"));
    assert_eq!(app.sent().len(), 2);
}

#[tokio::test]
async fn test_accepted_fax_points_carrier_at_upload_url() {
    let mut app = spawn_app(None);
    app.state.settings.set_receive_faxes(true);

    let response = app
        .post_form("/faxReceive", &[("From", STRANGER), ("To", DEST)])
        .await;
    assert!(response
        .text()
        .contains(&format!("<Receive action=\"{INCOMING_URL}\"")));

    let (to, body) = app.next_notification().await;
    assert_eq!(to, OWNER);
    assert!(body.starts_with("Accepting fax from"));
}

#[tokio::test]
async fn test_received_fax_document_is_stored() {
    let mut app = spawn_app(None);
    let response = app
        .post_multipart(
            "/faxReceiveFile",
            &[("From", STRANGER), ("To", DEST), ("FaxStatus", "received"), ("NumPages", "2")],
            Some(("Media", "inbound.pdf", "application/pdf", &b"%PDF-1.4 inbound"[..])),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let (to, body) = app.next_notification().await;
    assert_eq!(to, OWNER);
    assert!(body.contains("\"inbound.pdf\""));
    assert!(body.ends_with("received (2 pages)"));

    let stored = std::fs::read_dir(app.state.media.dir()).unwrap().count();
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn test_fax_media_rejects_unsafe_names() {
    let app = spawn_app(None);
    assert_eq!(app.get("/faxMedia/..%2Fsecret.pdf").await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/faxMedia/notes.txt").await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/faxMedia/missing.pdf").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fax_media_serves_document() {
    let app = spawn_app(None);
    let name = app.state.media.store(b"%PDF-1.4 doc", "pdf").await.unwrap();

    let response = app.get(&format!("/faxMedia/{name}")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type, "application/pdf");
    assert_eq!(response.body, b"%PDF-1.4 doc");
}

#[tokio::test]
async fn test_submit_requires_phone_numbers() {
    let app = spawn_app(None);
    let response = app
        .post_multipart("/sendFax", &[("toPhone", DEST)], None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "From phone number is required");

    let response = app
        .post_multipart("/sendFax", &[("fromPhone", OWNER), ("toPhone", "call me")], None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_rejects_untrusted_sender() {
    let app = spawn_app(None);
    let response = app.submit_fax(STRANGER).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "From phone number is not whitelisted");
    assert!(app.sent().is_empty());
}

#[tokio::test]
async fn test_submit_rejects_non_pdf() {
    let app = spawn_app(None);
    let response = app
        .post_multipart(
            "/sendFax",
            &[("fromPhone", OWNER), ("toPhone", DEST)],
            Some(("mediaFile", "scan.png", "image/png", &b"\x89PNG"[..])),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(std::fs::read_dir(app.state.media.dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_submit_normalizes_phone_and_asks_for_approval() {
    let app = spawn_app(None);
    let response = app
        .post_multipart(
            "/sendFax",
            &[("fromPhone", "+1 555-123.0000"), ("toPhone", "+1 555 999 0000")],
            Some(("mediaFile", "results.pdf", "application/pdf", &b"%PDF-1.4"[..])),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["status"], "pending_approval");
    let pdf_file = body["pdf_file"].as_str().unwrap();
    assert!(app.state.media.path_for(pdf_file).exists());

    assert_eq!(
        app.sent(),
        vec![(
            OWNER.to_string(),
            "Reply with OK to approve faxing results.pdf".to_string()
        )]
    );
}
