use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error};

use crate::models::{NewTicket, ScanLog, Ticket};

/// Result of inserting a ticket keyed by its payment reference.
#[derive(Debug, Clone)]
pub enum TicketInsert {
    Created(Ticket),
    /// A ticket for this payment reference already existed; nothing was written.
    Existing(Ticket),
}

/// Outcome of the atomic admission attempt.
#[derive(Debug, Clone)]
pub enum AdmitResult {
    Admitted { ticket: Ticket, scan: ScanLog },
    AlreadyScanned { ticket: Ticket, scan: Option<ScanLog> },
    Unpaid(Ticket),
    NotFound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub tickets: i64,
    pub scanned: i64,
    pub scan_logs: i64,
}

/// Store for tickets and their scan logs. Every mutation runs in its own
/// transaction.
#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: SqlitePool,
}

impl TicketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts a ticket unless one with the same payment reference exists,
    /// in which case the stored ticket is returned untouched.
    pub async fn create_ticket(&self, new: &NewTicket) -> Result<TicketInsert, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets \
                (name, email, phone, ticket_type, scanned, payment_reference, payment_status, amount, created_at) \
             VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?) \
             ON CONFLICT (payment_reference) DO NOTHING \
             RETURNING *",
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(new.ticket_type)
        .bind(&new.payment_reference)
        .bind(new.payment_status)
        .bind(new.amount)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match inserted {
            Some(ticket) => TicketInsert::Created(ticket),
            None => {
                let existing = sqlx::query_as::<_, Ticket>(
                    "SELECT * FROM tickets WHERE payment_reference = ?",
                )
                .bind(&new.payment_reference)
                .fetch_one(&mut *tx)
                .await?;
                TicketInsert::Existing(existing)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn get_ticket(&self, id: i64) -> Result<Option<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_reference(&self, reference: &str) -> Result<Option<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE payment_reference = ?")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await
    }

    /// Newest first.
    pub async fn list_tickets(&self) -> Result<Vec<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>("SELECT * FROM tickets ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_scan_log(&self, ticket_id: i64) -> Result<Option<ScanLog>, sqlx::Error> {
        sqlx::query_as::<_, ScanLog>("SELECT * FROM scan_logs WHERE ticket_id = ?")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Newest first.
    pub async fn list_scan_logs(&self) -> Result<Vec<ScanLog>, sqlx::Error> {
        sqlx::query_as::<_, ScanLog>("SELECT * FROM scan_logs ORDER BY scanned_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn counts(&self) -> Result<StoreCounts, sqlx::Error> {
        let (tickets, scanned): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN scanned THEN 1 ELSE 0 END), 0) FROM tickets",
        )
        .fetch_one(&self.pool)
        .await?;
        let scan_logs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scan_logs")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreCounts {
            tickets,
            scanned,
            scan_logs,
        })
    }

    /// Admits a ticket at most once.
    ///
    /// The first statement is a compare-and-set on `scanned`, so concurrent
    /// callers serialize on the write lock and exactly one of them sees a
    /// changed row. The winner writes the scan log in the same transaction;
    /// everyone else rolls back and reads the state the winner left behind.
    pub async fn admit_ticket(
        &self,
        ticket_id: i64,
        scanned_at: DateTime<Utc>,
    ) -> Result<AdmitResult, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            "UPDATE tickets SET scanned = 1 \
             WHERE id = ? AND payment_status = 'paid' AND scanned = 0",
        )
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = ?")
            .bind(ticket_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(ticket) = ticket else {
            return Ok(AdmitResult::NotFound);
        };

        if claimed {
            let scan = Self::create_scan_log(&mut *tx, ticket.id, &ticket.name, scanned_at).await?;
            tx.commit().await?;
            debug!(ticket_id = ticket.id, scan_id = scan.id, "Ticket admitted");
            return Ok(AdmitResult::Admitted { ticket, scan });
        }

        if !ticket.is_admission_eligible() {
            return Ok(AdmitResult::Unpaid(ticket));
        }

        let scan = sqlx::query_as::<_, ScanLog>("SELECT * FROM scan_logs WHERE ticket_id = ?")
            .bind(ticket.id)
            .fetch_optional(&mut *tx)
            .await?;

        if scan.is_none() {
            error!(ticket_id = ticket.id, "Ticket is marked scanned but has no scan log");
        }

        Ok(AdmitResult::AlreadyScanned { ticket, scan })
    }

    /// Appends a scan log on an open transaction. Only called as part of an
    /// admission so the log and the `scanned` flag commit together.
    pub(crate) async fn create_scan_log(
        conn: &mut SqliteConnection,
        ticket_id: i64,
        name: &str,
        scanned_at: DateTime<Utc>,
    ) -> Result<ScanLog, sqlx::Error> {
        sqlx::query_as::<_, ScanLog>(
            "INSERT INTO scan_logs (ticket_id, name, scanned_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(ticket_id)
        .bind(name)
        .bind(scanned_at)
        .fetch_one(conn)
        .await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{insert, new_ticket, repository};
    use super::*;
    use crate::models::{PaymentStatus, TicketType};

    #[tokio::test]
    async fn test_create_and_fetch_ticket() {
        let (repo, _dir) = repository().await;
        let ticket = insert(&repo, "R1", PaymentStatus::Paid).await;

        let fetched = repo.get_ticket(ticket.id).await.unwrap().unwrap();
        assert_eq!(fetched.payment_reference, "R1");
        assert_eq!(fetched.ticket_type, TicketType::Vip);
        assert_eq!(fetched.payment_status, PaymentStatus::Paid);
        assert!(!fetched.scanned);
        assert_eq!(fetched.created_at, ticket.created_at);
    }

    #[tokio::test]
    async fn test_get_unknown_ticket_is_none() {
        let (repo, _dir) = repository().await;
        assert!(repo.get_ticket(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_reference_returns_existing_ticket() {
        let (repo, _dir) = repository().await;
        let first = insert(&repo, "R1", PaymentStatus::Paid).await;

        let mut again = new_ticket("R1", PaymentStatus::Paid);
        again.name = "Someone Else".to_string();
        match repo.create_ticket(&again).await.unwrap() {
            TicketInsert::Existing(ticket) => {
                assert_eq!(ticket.id, first.id);
                assert_eq!(ticket.name, "Ada Lovelace");
            }
            TicketInsert::Created(_) => panic!("duplicate reference created a second ticket"),
        }
        assert_eq!(repo.counts().await.unwrap().tickets, 1);
    }

    #[tokio::test]
    async fn test_list_tickets_newest_first() {
        let (repo, _dir) = repository().await;
        let a = insert(&repo, "A", PaymentStatus::Paid).await;
        let b = insert(&repo, "B", PaymentStatus::Paid).await;

        let ids: Vec<i64> = repo.list_tickets().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_admit_writes_flag_and_log_together() {
        let (repo, _dir) = repository().await;
        let ticket = insert(&repo, "R1", PaymentStatus::Paid).await;

        let now = Utc::now();
        match repo.admit_ticket(ticket.id, now).await.unwrap() {
            AdmitResult::Admitted { ticket, scan } => {
                assert!(ticket.scanned);
                assert_eq!(scan.ticket_id, ticket.id);
                assert_eq!(scan.name, "Ada Lovelace");
                assert_eq!(scan.scanned_at, now);
            }
            other => panic!("unexpected {:?}", other),
        }

        let counts = repo.counts().await.unwrap();
        assert_eq!(counts.scanned, 1);
        assert_eq!(counts.scan_logs, 1);
        assert_eq!(repo.list_scan_logs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_admit_twice_reports_original_scan() {
        let (repo, _dir) = repository().await;
        let ticket = insert(&repo, "R1", PaymentStatus::Paid).await;
        let first_at = Utc::now();
        repo.admit_ticket(ticket.id, first_at).await.unwrap();

        match repo.admit_ticket(ticket.id, Utc::now()).await.unwrap() {
            AdmitResult::AlreadyScanned { scan, .. } => {
                assert_eq!(scan.unwrap().scanned_at, first_at);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(repo.counts().await.unwrap().scan_logs, 1);
    }

    #[tokio::test]
    async fn test_admit_unpaid_ticket_changes_nothing() {
        let (repo, _dir) = repository().await;
        let ticket = insert(&repo, "R1", PaymentStatus::Pending).await;

        assert!(matches!(
            repo.admit_ticket(ticket.id, Utc::now()).await.unwrap(),
            AdmitResult::Unpaid(_)
        ));
        let stored = repo.get_ticket(ticket.id).await.unwrap().unwrap();
        assert!(!stored.scanned);
        assert!(repo.get_scan_log(ticket.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_admit_unknown_ticket() {
        let (repo, _dir) = repository().await;
        assert!(matches!(
            repo.admit_ticket(7, Utc::now()).await.unwrap(),
            AdmitResult::NotFound
        ));
    }
}
