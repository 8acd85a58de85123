//! Test helper utilities for exercising the HTTP surface in-process

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use faxgate::{
    app_state::AppState,
    routes,
    services::{
        coordinator::FaxCoordinator,
        fax::{CarrierError, FaxCarrier},
        media::MediaStore,
        sms::{Notifier, NotifyError},
        trust::TrustList,
    },
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const OWNER: &str = "+15551230000";
pub const FRIEND: &str = "+15554560000";
pub const STRANGER: &str = "+15550006666";
pub const DEST: &str = "+15559990000";
pub const MEDIA_BASE: &str = "https://fax.example.com/faxMedia/";
pub const INCOMING_URL: &str = "https://fax.example.com/faxReceiveFile";

const BOUNDARY: &str = "faxgate-test-boundary";

/// Records every text message and echoes it on a channel so tests can wait for it.
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    tx: mpsc::UnboundedSender<(String, String)>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        let msg = (to.to_string(), body.to_string());
        self.sent.lock().unwrap().push(msg.clone());
        let _ = self.tx.send(msg);
        Ok(())
    }
}

/// Carrier that hands out a fixed fax sid, or refuses everything.
pub struct FakeCarrier {
    sid: Option<String>,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeCarrier {
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FaxCarrier for FakeCarrier {
    async fn submit(
        &self,
        to: &str,
        media_url: &str,
        quality: &str,
    ) -> Result<String, CarrierError> {
        self.calls
            .lock()
            .unwrap()
            .push((to.to_string(), media_url.to_string(), quality.to_string()));
        self.sid.clone().ok_or(CarrierError::MissingSid)
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
    pub carrier: Arc<FakeCarrier>,
    pub shutdown: CancellationToken,
    notifications: mpsc::UnboundedReceiver<(String, String)>,
    _dir: tempfile::TempDir,
}

/// Build the application with fake carrier clients and a temporary media directory.
pub fn spawn_app(carrier_sid: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let media = Arc::new(MediaStore::new(dir.path(), MEDIA_BASE));
    let trust = Arc::new(TrustList::new([OWNER, FRIEND]));
    let (tx, notifications) = mpsc::unbounded_channel();
    let notifier = Arc::new(RecordingNotifier {
        sent: Mutex::new(Vec::new()),
        tx,
    });
    let carrier = Arc::new(FakeCarrier {
        sid: carrier_sid.map(str::to_string),
        calls: Mutex::new(Vec::new()),
    });

    let shutdown = CancellationToken::new();
    let (coordinator, _task) =
        FaxCoordinator::new(notifier.clone(), carrier.clone(), trust.clone(), media.clone())
            .spawn(shutdown.clone());

    let state = AppState::new(
        coordinator,
        notifier.clone(),
        media,
        trust,
        INCOMING_URL.to_string(),
    );

    TestApp {
        router: routes::router(state.clone()),
        state,
        notifier,
        carrier,
        shutdown,
        notifications,
        _dir: dir,
    }
}

/// Percent-encode a form value.
fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl TestApp {
    async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body")
            .to_vec();
        TestResponse {
            status,
            content_type,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.call(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.call(request).await
    }

    /// Send a multipart form with text `fields` and an optional `(field, file name, content type, bytes)`.
    pub async fn post_multipart(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &str, &[u8])>,
    ) -> TestResponse {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((name, file_name, content_type, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.call(request).await
    }

    /// Submit a fax from `from` to [`DEST`] with a small PDF document.
    pub async fn submit_fax(&self, from: &str) -> TestResponse {
        self.post_multipart(
            "/sendFax",
            &[
                ("fromName", "Alice Example"),
                ("fromPhone", from),
                ("toName", "Records Desk"),
                ("toPhone", DEST),
                ("subject", "Lab results"),
                ("quality", "fine"),
            ],
            Some(("mediaFile", "results.pdf", "application/pdf", &b"%PDF-1.4 test"[..])),
        )
        .await
    }

    /// Wait for the next text message sent by the application.
    pub async fn next_notification(&mut self) -> (String, String) {
        tokio::time::timeout(Duration::from_secs(5), self.notifications.recv())
            .await
            .expect("Timed out waiting for notification")
            .expect("Notifier dropped")
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.notifier.sent.lock().unwrap().clone()
    }
}
