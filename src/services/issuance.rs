//! Turns a verified `charge.success` notification into a stored ticket, a
//! QR code, and a queued email.
//!
//! Only the database insert decides whether issuance succeeded. Code
//! generation and email delivery run afterwards and their failures are
//! logged, never rolled back.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;
use crate::db::{TicketInsert, TicketRepository};
use crate::models::paystack::ChargeData;
use crate::models::{NewTicket, PaymentStatus, PaystackEvent, Ticket, TicketType};
use crate::services::dispatcher::{Dispatcher, TicketDelivery};
use crate::services::qr::{CodeRenderer, TicketCode};
use crate::utils::error::AppError;

/// Used when neither metadata nor the customer record carries a phone number.
pub const DEFAULT_PHONE: &str = "N/A";
/// Last resort when no name can be derived, e.g. an email like `@host`.
pub const DEFAULT_HOLDER_NAME: &str = "Ticket holder";

#[derive(Debug)]
pub enum IssuanceOutcome {
    /// Not a successful charge; acknowledged without side effects.
    Ignored { event: Option<String> },
    /// A new ticket. `code` is `None` when rendering failed after the commit.
    Issued {
        ticket: Ticket,
        code: Option<TicketCode>,
    },
    /// A replayed notification for a reference that already has a ticket.
    AlreadyIssued { ticket: Ticket },
}

#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error("missing or invalid fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<IssuanceError> for AppError {
    fn from(err: IssuanceError) -> Self {
        match err {
            IssuanceError::MissingFields(fields) => AppError::MissingFields(fields),
            IssuanceError::Database(e) => AppError::DatabaseError(e),
        }
    }
}

#[derive(Clone)]
pub struct IssuanceEngine {
    repo: TicketRepository,
    renderer: CodeRenderer,
    dispatcher: Dispatcher,
    config: Arc<Config>,
}

impl IssuanceEngine {
    pub fn new(
        repo: TicketRepository,
        renderer: CodeRenderer,
        dispatcher: Dispatcher,
        config: Arc<Config>,
    ) -> Self {
        Self {
            repo,
            renderer,
            dispatcher,
            config,
        }
    }

    pub async fn handle_event(&self, event: PaystackEvent) -> Result<IssuanceOutcome, IssuanceError> {
        if !event.is_charge_success() {
            let name = event.name().map(str::to_string);
            info!(event = ?name, "Ignoring webhook event");
            return Ok(IssuanceOutcome::Ignored { event: name });
        }

        let new_ticket =
            extract_ticket(&event.charge_data()).map_err(IssuanceError::MissingFields)?;

        let ticket = match self.repo.create_ticket(&new_ticket).await? {
            TicketInsert::Created(ticket) => ticket,
            TicketInsert::Existing(ticket) => {
                info!(
                    ticket_id = ticket.id,
                    reference = %ticket.payment_reference,
                    "Duplicate notification, ticket already issued"
                );
                return Ok(IssuanceOutcome::AlreadyIssued { ticket });
            }
        };

        info!(
            ticket_id = ticket.id,
            reference = %ticket.payment_reference,
            ticket_type = %ticket.ticket_type,
            "Ticket issued"
        );

        let validation_url = self.config.validation_url(ticket.id);
        let code = match self.renderer.generate(ticket.id, &validation_url).await {
            Ok(code) => Some(code),
            Err(e) => {
                error!(
                    ticket_id = ticket.id,
                    error = %e,
                    "Ticket issued but its code could not be generated"
                );
                None
            }
        };

        if let Some(code) = &code {
            self.dispatcher.dispatch(TicketDelivery {
                ticket_id: ticket.id,
                name: ticket.name.clone(),
                email: ticket.email.clone(),
                ticket_type: ticket.ticket_type.to_string(),
                code: code.clone(),
            });
        }

        Ok(IssuanceOutcome::Issued { ticket, code })
    }
}

/// Builds the ticket for a successful charge, or lists every field that is
/// missing or unusable.
pub fn extract_ticket(data: &ChargeData) -> Result<NewTicket, Vec<String>> {
    let mut missing = Vec::new();

    let email = data.customer_email();
    if email.is_none() {
        missing.push("email".to_string());
    }
    let amount = data.amount_minor();
    if amount.is_none() {
        missing.push("amount".to_string());
    }
    let reference = data.reference();
    if reference.is_none() {
        missing.push("reference".to_string());
    }
    let ticket_type = match data.metadata_str("ticket_type") {
        None => Some(TicketType::default()),
        Some(raw) => raw.parse::<TicketType>().ok(),
    };
    if ticket_type.is_none() {
        missing.push("ticket_type".to_string());
    }

    match (email, amount, reference, ticket_type) {
        (Some(email), Some(amount), Some(reference), Some(ticket_type)) => Ok(NewTicket {
            name: holder_name(data, email),
            email: email.to_string(),
            phone: holder_phone(data),
            ticket_type,
            payment_reference: reference.to_string(),
            payment_status: PaymentStatus::Paid,
            amount,
        }),
        _ => Err(missing),
    }
}

/// First non-empty of: `metadata.customer_name`, `metadata.name`, the
/// customer's first and last name, the local part of the email.
fn holder_name(data: &ChargeData, email: &str) -> String {
    if let Some(name) = data
        .metadata_str("customer_name")
        .or_else(|| data.metadata_str("name"))
    {
        return name.to_string();
    }

    let full_name = [data.customer_str("first_name"), data.customer_str("last_name")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !full_name.is_empty() {
        return full_name;
    }

    email
        .split('@')
        .next()
        .map(str::trim)
        .filter(|local| !local.is_empty())
        .unwrap_or(DEFAULT_HOLDER_NAME)
        .to_string()
}

fn holder_phone(data: &ChargeData) -> String {
    data.metadata_str("phone")
        .or_else(|| data.customer_str("phone"))
        .unwrap_or(DEFAULT_PHONE)
        .to_string()
}
