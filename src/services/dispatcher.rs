//! Fire-and-forget delivery of issued tickets.
//!
//! Issuance hands a [`TicketDelivery`] to the queue and returns immediately.
//! A single background task drains the queue and talks to the mail provider.
//! Failed deliveries are logged and dropped.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::services::mailer::{Attachment, DeliveryError, Mailbox, Mailer, OutboundEmail};
use crate::services::qr::TicketCode;
use crate::templates::{TicketEmailView, Templates};

const SUBJECT: &str = "Your event ticket";

#[derive(Debug, Clone)]
pub struct TicketDelivery {
    pub ticket_id: i64,
    pub name: String,
    pub email: String,
    pub ticket_type: String,
    pub code: TicketCode,
}

#[derive(Clone)]
pub struct Dispatcher {
    queue: mpsc::Sender<TicketDelivery>,
}

impl Dispatcher {
    /// Starts the delivery task. It runs until every `Dispatcher` clone has
    /// been dropped and the queue is drained.
    pub fn spawn(
        mailer: Arc<dyn Mailer>,
        templates: Arc<Templates>,
        sender: Mailbox,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (queue, rx) = mpsc::channel(capacity.max(1));
        let worker = DeliveryWorker {
            mailer,
            templates,
            sender,
        };
        let handle = tokio::spawn(worker.run(rx));
        (Self { queue }, handle)
    }

    /// Queues a delivery without waiting. Returns `false` if it was dropped.
    pub fn dispatch(&self, delivery: TicketDelivery) -> bool {
        match self.queue.try_send(delivery) {
            Ok(()) => true,
            Err(TrySendError::Full(delivery)) => {
                warn!(
                    ticket_id = delivery.ticket_id,
                    "Delivery queue full, ticket email dropped"
                );
                false
            }
            Err(TrySendError::Closed(delivery)) => {
                error!(
                    ticket_id = delivery.ticket_id,
                    "Delivery worker stopped, ticket email dropped"
                );
                false
            }
        }
    }
}

struct DeliveryWorker {
    mailer: Arc<dyn Mailer>,
    templates: Arc<Templates>,
    sender: Mailbox,
}

impl DeliveryWorker {
    async fn run(self, mut rx: mpsc::Receiver<TicketDelivery>) {
        while let Some(delivery) = rx.recv().await {
            let ticket_id = delivery.ticket_id;
            match self.deliver(delivery).await {
                Ok(()) => info!(ticket_id, "Ticket email sent"),
                Err(e) => error!(ticket_id, error = %e, "Ticket email failed"),
            }
        }
        info!("Delivery worker stopped");
    }

    async fn deliver(&self, delivery: TicketDelivery) -> Result<(), DeliveryError> {
        let email = self.compose(&delivery)?;
        self.mailer.send(&email).await
    }

    fn compose(&self, delivery: &TicketDelivery) -> Result<OutboundEmail, DeliveryError> {
        let html_content = self
            .templates
            .ticket_email(&TicketEmailView {
                ticket_id: delivery.ticket_id,
                name: &delivery.name,
                ticket_type: &delivery.ticket_type,
            })
            .map_err(|e| DeliveryError::RequestFailed(format!("template: {}", e)))?;

        Ok(OutboundEmail {
            sender: self.sender.clone(),
            to: vec![Mailbox {
                email: delivery.email.clone(),
                name: Some(delivery.name.clone()),
            }],
            subject: SUBJECT.to_string(),
            html_content,
            attachment: vec![Attachment::from_bytes(
                delivery.code.file_name.clone(),
                &delivery.code.png,
            )],
        })
    }
}
