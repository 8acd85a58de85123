use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize, Deserialize)]
pub struct HealthChecks {
    pub coordinator: ComponentHealth,
    pub media_dir: ComponentHealth,
}

#[derive(Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
}

impl ComponentHealth {
    fn from_check(ok: bool) -> Self {
        Self {
            status: if ok { "ok" } else { "error" }.to_string(),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// GET /health — liveness of the fax coordinator and the media directory.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let coordinator = ComponentHealth::from_check(state.coordinator.is_running());
    let media_dir = ComponentHealth::from_check(state.media.dir().is_dir());

    let all_healthy = coordinator.is_ok() && media_dir.is_ok();
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            coordinator,
            media_dir,
        },
    };

    (status_code, Json(response))
}
