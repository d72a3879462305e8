use axum::extract::State;
use axum::response::Html;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::StoreCounts;
use crate::models::{ScanLog, Ticket};
use crate::services::qr::CodeRenderer;
use crate::state::AppState;
use crate::utils::error::AppError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Serialize)]
struct CountsView {
    tickets: i64,
    scanned: i64,
    scan_logs: i64,
}

#[derive(Serialize)]
struct TicketRow {
    id: i64,
    name: String,
    email: String,
    phone: String,
    ticket_type: &'static str,
    payment_reference: String,
    payment_status: &'static str,
    amount: i64,
    scanned: bool,
    created_at: String,
    code_file: String,
}

#[derive(Serialize)]
struct ScanRow {
    id: i64,
    ticket_id: i64,
    name: String,
    scanned_at: String,
}

#[derive(Serialize)]
struct AdminView {
    counts: CountsView,
    tickets: Vec<TicketRow>,
    scans: Vec<ScanRow>,
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

impl From<Ticket> for TicketRow {
    fn from(ticket: Ticket) -> Self {
        Self {
            code_file: CodeRenderer::file_name(ticket.id),
            id: ticket.id,
            name: ticket.name,
            email: ticket.email,
            phone: ticket.phone,
            ticket_type: ticket.ticket_type.as_str(),
            payment_reference: ticket.payment_reference,
            payment_status: ticket.payment_status.as_str(),
            amount: ticket.amount,
            scanned: ticket.scanned,
            created_at: format_timestamp(ticket.created_at),
        }
    }
}

impl From<ScanLog> for ScanRow {
    fn from(scan: ScanLog) -> Self {
        Self {
            id: scan.id,
            ticket_id: scan.ticket_id,
            name: scan.name,
            scanned_at: format_timestamp(scan.scanned_at),
        }
    }
}

impl From<StoreCounts> for CountsView {
    fn from(counts: StoreCounts) -> Self {
        Self {
            tickets: counts.tickets,
            scanned: counts.scanned,
            scan_logs: counts.scan_logs,
        }
    }
}

/// Read-only listing of every ticket and admission.
pub async fn admin_dashboard(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let tickets = state.repo.list_tickets().await?;
    let scans = state.repo.list_scan_logs().await?;
    let counts = state.repo.counts().await?;

    let view = AdminView {
        counts: counts.into(),
        tickets: tickets.into_iter().map(TicketRow::from).collect(),
        scans: scans.into_iter().map(ScanRow::from).collect(),
    };

    let page = state
        .templates
        .admin_page(&view)
        .map_err(|e| AppError::InternalServerError(format!("admin page render failed: {}", e)))?;

    Ok(Html(page))
}
