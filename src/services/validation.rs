//! Single-use admission.
//!
//! A ticket moves from paid-unscanned to paid-scanned exactly once, together
//! with its scan log. Unpaid tickets never move, and nothing moves a ticket
//! back.

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{AdmitResult, TicketRepository};
use crate::models::{ScanLog, Ticket};
use crate::utils::error::AppError;

pub const ALREADY_USED: &str = "ALREADY_USED";
pub const PAYMENT_INCOMPLETE: &str = "PAYMENT_INCOMPLETE";

#[derive(Debug, Clone)]
pub struct Admission {
    pub ticket: Ticket,
    pub scan: ScanLog,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Ticket {0} not found")]
    NotFound(i64),
    #[error("Ticket payment not completed")]
    PaymentIncomplete { ticket: Box<Ticket> },
    #[error("Ticket already used")]
    AlreadyUsed {
        ticket: Box<Ticket>,
        scan: Option<ScanLog>,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        let message = err.to_string();
        match err {
            ScanError::NotFound(_) => AppError::NotFound(message),
            ScanError::PaymentIncomplete { ticket } => AppError::StateConflict {
                code: PAYMENT_INCOMPLETE,
                message,
                details: json!({
                    "ticket_id": ticket.id,
                    "payment_status": ticket.payment_status,
                }),
            },
            ScanError::AlreadyUsed { ticket, scan } => AppError::StateConflict {
                code: ALREADY_USED,
                message,
                details: json!({
                    "ticket_id": ticket.id,
                    "name": ticket.name,
                    "ticket_type": ticket.ticket_type,
                    "scanned_at": scan.map(|s| s.scanned_at),
                }),
            },
            ScanError::Database(e) => AppError::DatabaseError(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationEngine {
    repo: TicketRepository,
}

impl ValidationEngine {
    pub fn new(repo: TicketRepository) -> Self {
        Self { repo }
    }

    pub async fn scan(&self, ticket_id: i64) -> Result<Admission, ScanError> {
        match self.repo.admit_ticket(ticket_id, Utc::now()).await? {
            AdmitResult::Admitted { ticket, scan } => {
                info!(ticket_id, holder = %ticket.name, "Ticket admitted");
                Ok(Admission { ticket, scan })
            }
            AdmitResult::AlreadyScanned { ticket, scan } => {
                warn!(
                    ticket_id,
                    first_scanned_at = ?scan.as_ref().map(|s| s.scanned_at),
                    "Rejected reuse of ticket"
                );
                Err(ScanError::AlreadyUsed {
                    ticket: Box::new(ticket),
                    scan,
                })
            }
            AdmitResult::Unpaid(ticket) => {
                warn!(ticket_id, status = %ticket.payment_status, "Rejected unpaid ticket");
                Err(ScanError::PaymentIncomplete {
                    ticket: Box::new(ticket),
                })
            }
            AdmitResult::NotFound => Err(ScanError::NotFound(ticket_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tickets::test_support::{insert, repository};
    use crate::models::PaymentStatus;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_first_scan_admits_and_logs_once() {
        let (repo, _dir) = repository().await;
        let ticket = insert(&repo, "R1", PaymentStatus::Paid).await;
        let engine = ValidationEngine::new(repo.clone());

        let admission = engine.scan(ticket.id).await.unwrap();
        assert!(admission.ticket.scanned);
        assert_eq!(admission.ticket.name, ticket.name);
        assert_eq!(admission.scan.ticket_id, ticket.id);
        assert!(admission.scan.scanned_at >= ticket.created_at);

        let counts = repo.counts().await.unwrap();
        assert_eq!((counts.scanned, counts.scan_logs), (1, 1));
    }

    #[tokio::test]
    async fn test_second_scan_is_rejected_with_original_timestamp() {
        let (repo, _dir) = repository().await;
        let ticket = insert(&repo, "R1", PaymentStatus::Paid).await;
        let engine = ValidationEngine::new(repo.clone());
        let first = engine.scan(ticket.id).await.unwrap();

        for _ in 0..3 {
            match engine.scan(ticket.id).await {
                Err(ScanError::AlreadyUsed { scan, .. }) => {
                    assert_eq!(scan.unwrap().scanned_at, first.scan.scanned_at);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(repo.counts().await.unwrap().scan_logs, 1);
    }

    #[tokio::test]
    async fn test_unpaid_tickets_are_never_admitted() {
        let (repo, _dir) = repository().await;
        let pending = insert(&repo, "P", PaymentStatus::Pending).await;
        let failed = insert(&repo, "F", PaymentStatus::Failed).await;
        let engine = ValidationEngine::new(repo.clone());

        for id in [pending.id, failed.id, pending.id] {
            assert!(matches!(
                engine.scan(id).await,
                Err(ScanError::PaymentIncomplete { .. })
            ));
        }
        let counts = repo.counts().await.unwrap();
        assert_eq!((counts.scanned, counts.scan_logs), (0, 0));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (repo, _dir) = repository().await;
        let ticket = insert(&repo, "R1", PaymentStatus::Paid).await;
        let engine = ValidationEngine::new(repo);

        for id in [ticket.id + 1, 0, -5] {
            assert!(matches!(engine.scan(id).await, Err(ScanError::NotFound(n)) if n == id));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_scans_have_exactly_one_winner() {
        let (repo, _dir) = repository().await;
        let engine = ValidationEngine::new(repo.clone());
        let mut ids = Vec::new();
        for n in 0..5 {
            ids.push(insert(&repo, &format!("R{}", n), PaymentStatus::Paid).await.id);
        }

        let mut tasks = Vec::new();
        for &id in &ids {
            for _ in 0..8 {
                let engine = engine.clone();
                tasks.push(tokio::spawn(async move { (id, engine.scan(id).await) }));
            }
        }

        let mut winners = HashSet::new();
        for task in tasks {
            let (id, result) = task.await.unwrap();
            match result {
                Ok(_) => assert!(winners.insert(id), "ticket {} admitted twice", id),
                Err(ScanError::AlreadyUsed { .. }) => {}
                Err(other) => panic!("unexpected error for ticket {}: {:?}", id, other),
            }
        }

        assert_eq!(winners.len(), ids.len());
        for id in ids {
            assert!(repo.get_ticket(id).await.unwrap().unwrap().scanned);
            assert!(repo.get_scan_log(id).await.unwrap().is_some());
        }
        assert_eq!(repo.counts().await.unwrap().scan_logs, 5);
    }

    #[test]
    fn test_already_used_maps_to_conflict_with_context() {
        let ticket = Ticket {
            id: 9,
            name: "Ada".into(),
            email: "a@b.com".into(),
            phone: "555".into(),
            ticket_type: crate::models::TicketType::Vip,
            scanned: true,
            payment_reference: "R".into(),
            payment_status: PaymentStatus::Paid,
            amount: 1,
            created_at: Utc::now(),
        };
        let err: AppError = ScanError::AlreadyUsed {
            ticket: Box::new(ticket),
            scan: None,
        }
        .into();

        match err {
            AppError::StateConflict { code, details, .. } => {
                assert_eq!(code, ALREADY_USED);
                assert_eq!(details["name"], "Ada");
                assert_eq!(details["ticket_type"], "vip");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
