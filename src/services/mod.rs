pub mod dispatcher;
pub mod issuance;
pub mod mailer;
pub mod qr;
pub mod signature;
pub mod validation;

pub use dispatcher::{Dispatcher, TicketDelivery};
pub use issuance::{IssuanceEngine, IssuanceError, IssuanceOutcome};
pub use mailer::{BrevoMailer, LogMailer, Mailer};
pub use qr::{CodeRenderer, TicketCode};
pub use signature::{SignatureError, SignatureVerifier, SIGNATURE_HEADER};
pub use validation::{Admission, ScanError, ValidationEngine};
