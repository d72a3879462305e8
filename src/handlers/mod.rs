use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod admin;
pub mod scan;
pub mod webhook;

pub use admin::admin_dashboard;
pub use scan::scan_ticket;
pub use webhook::{paystack_webhook, require_signature};

#[derive(Serialize)]
struct HealthPayload {
    service: &'static str,
    database: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Result<Response, AppError> {
    sqlx::query("SELECT 1").execute(state.repo.pool()).await?;

    let payload = HealthPayload {
        service: "ticketgate-api",
        database: "ok",
    };

    Ok(success(payload, "Health check successful").into_response())
}
