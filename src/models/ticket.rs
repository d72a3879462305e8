use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TicketType {
    #[default]
    Individual,
    Group,
    Vip,
}

impl TicketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Individual => "individual",
            TicketType::Group => "group",
            TicketType::Vip => "vip",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "individual" => Ok(TicketType::Individual),
            "group" => Ok(TicketType::Group),
            "vip" => Ok(TicketType::Vip),
            other => Err(format!("unknown ticket type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One paid admission right.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub ticket_type: TicketType,
    pub scanned: bool,
    pub payment_reference: String,
    pub payment_status: PaymentStatus,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Only paid tickets may ever be admitted.
    pub fn is_admission_eligible(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

/// Fields for a ticket that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub ticket_type: TicketType,
    pub payment_reference: String,
    pub payment_status: PaymentStatus,
    pub amount: i64,
}
