pub mod paystack;
pub mod scan_log;
pub mod ticket;

pub use paystack::PaystackEvent;
pub use scan_log::ScanLog;
pub use ticket::{NewTicket, PaymentStatus, Ticket, TicketType};
