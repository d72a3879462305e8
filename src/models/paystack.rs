use serde::Deserialize;
use serde_json::Value;

/// The only event type that results in a ticket.
pub const CHARGE_SUCCESS: &str = "charge.success";

/// Webhook envelope sent by Paystack.
///
/// Only the envelope is typed. Paystack sends many event kinds whose `data`
/// shapes differ, and every kind other than a successful charge must still be
/// acknowledged, so `data` stays raw until the event name has been checked.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaystackEvent {
    #[serde(default)]
    pub event: Value,
    #[serde(default)]
    pub data: Value,
}

impl PaystackEvent {
    pub fn name(&self) -> Option<&str> {
        self.event.as_str()
    }

    pub fn is_charge_success(&self) -> bool {
        self.name() == Some(CHARGE_SUCCESS)
    }

    pub fn charge_data(&self) -> ChargeData {
        ChargeData::from_value(&self.data)
    }
}

/// Fields of a charge, each kept as raw JSON.
///
/// A field of the wrong type reads as absent, so incomplete payloads reach
/// the issuance checks and every unusable field is reported at once.
#[derive(Debug, Clone, Default)]
pub struct ChargeData {
    pub reference: Option<Value>,
    pub amount: Option<Value>,
    pub customer: Option<Value>,
    /// Paystack sends an empty string when no metadata was attached.
    pub metadata: Option<Value>,
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl ChargeData {
    /// Picks the charge fields out of `data`. Anything that is not an object
    /// yields a charge with no fields.
    pub fn from_value(data: &Value) -> Self {
        let field = |key: &str| data.get(key).filter(|v| !v.is_null()).cloned();
        Self {
            reference: field("reference"),
            amount: field("amount"),
            customer: field("customer"),
            metadata: field("metadata"),
        }
    }

    /// Non-empty string value of `metadata.<key>`.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        non_empty(self.metadata.as_ref().and_then(|m| m.get(key)))
    }

    /// Non-empty string value of `customer.<key>`.
    pub fn customer_str(&self, key: &str) -> Option<&str> {
        non_empty(self.customer.as_ref().and_then(|c| c.get(key)))
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.customer_str("email")
    }

    pub fn reference(&self) -> Option<&str> {
        non_empty(self.reference.as_ref())
    }

    /// Amount in minor currency units, if it is a non-negative integer.
    pub fn amount_minor(&self) -> Option<i64> {
        self.amount
            .as_ref()
            .and_then(Value::as_i64)
            .filter(|a| *a >= 0)
    }
}
