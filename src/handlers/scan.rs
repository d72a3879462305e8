use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::TicketType;
use crate::services::Admission;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Serialize)]
struct TicketDetails {
    id: i64,
    name: String,
    email: String,
    phone: String,
    ticket_type: TicketType,
    scanned_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ScanPayload {
    ticket_details: TicketDetails,
}

impl From<Admission> for ScanPayload {
    fn from(admission: Admission) -> Self {
        let Admission { ticket, scan } = admission;
        Self {
            ticket_details: TicketDetails {
                id: ticket.id,
                name: ticket.name,
                email: ticket.email,
                phone: ticket.phone,
                ticket_type: ticket.ticket_type,
                scanned_at: scan.scanned_at,
            },
        }
    }
}

pub async fn scan_ticket(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let ticket_id: i64 = raw_id
        .parse()
        .map_err(|_| AppError::ValidationError(format!("Invalid ticket id '{}'", raw_id)))?;

    let admission = state.validation.scan(ticket_id).await?;

    Ok(success(ScanPayload::from(admission), "Ticket validated successfully").into_response())
}
