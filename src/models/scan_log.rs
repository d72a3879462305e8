use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Durable record of a successful admission. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScanLog {
    pub id: i64,
    pub ticket_id: i64,
    /// Holder name as it was when the ticket was admitted.
    pub name: String,
    pub scanned_at: DateTime<Utc>,
}
