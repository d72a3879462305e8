use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

use crate::models::PaystackEvent;
use crate::services::qr::CodeRenderer;
use crate::services::{IssuanceOutcome, SignatureError, SIGNATURE_HEADER};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{ignored, success};

/// Paystack bodies are a few kilobytes; anything near this is not ours.
const MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;

#[derive(Serialize)]
struct IssuedPayload {
    ticket_id: i64,
    qr_code: Option<String>,
}

/// Rejects the request unless the body carries a valid provider signature.
/// Runs before the webhook handler; the body is buffered and handed on.
pub async fn require_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_BYTES)
        .await
        .map_err(|_| AppError::ValidationError("Request body is too large or unreadable".to_string()))?;

    let signature = match parts.headers.get(SIGNATURE_HEADER) {
        Some(value) => Some(value.to_str().map_err(|_| SignatureError::Malformed)?),
        None => None,
    };
    state.verifier.verify(&bytes, signature)?;

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

pub async fn paystack_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let event: PaystackEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Webhook body is not a JSON object");
        AppError::ValidationError("Invalid JSON payload".to_string())
    })?;

    let response = match state.issuance.handle_event(event).await? {
        IssuanceOutcome::Ignored { event } => ignored(format!(
            "Event '{}' ignored",
            event.as_deref().unwrap_or("unknown")
        ))
        .into_response(),
        IssuanceOutcome::Issued { ticket, code } => {
            let message = if code.is_some() {
                "Ticket issued"
            } else {
                "Ticket issued, QR code generation failed"
            };
            let payload = IssuedPayload {
                ticket_id: ticket.id,
                qr_code: code.map(|c| c.file_name),
            };
            success(payload, message).into_response()
        }
        IssuanceOutcome::AlreadyIssued { ticket } => {
            let file_name = CodeRenderer::file_name(ticket.id);
            let exists = tokio::fs::try_exists(state.config.qr_code_dir.join(&file_name))
                .await
                .unwrap_or(false);
            let payload = IssuedPayload {
                ticket_id: ticket.id,
                qr_code: exists.then_some(file_name),
            };
            success(payload, "Ticket already issued").into_response()
        }
    };

    Ok(response)
}
