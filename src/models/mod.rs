pub mod discrepancy;
pub mod invoice;
pub mod pending;

pub use discrepancy::Discrepancy;
pub use invoice::{Invoice, LineItem, RenderedInvoice};
pub use pending::{ConfirmedMatch, PendingMarker};
