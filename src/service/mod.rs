pub mod bundle;
pub mod extractor;
pub mod processor;
pub mod receiver;
pub mod reconciler;
pub mod renderer;
pub mod structured;
pub mod tracker;

pub use extractor::InvoiceExtractor;
pub use processor::{InvoiceProcessor, ProcessStats};
pub use receiver::{ConfirmationReceiver, ReceiveStats};
pub use reconciler::{reconcile, Reconciliation};
pub use renderer::TextRenderer;
pub use structured::StructuredRenderer;
pub use tracker::{ConfirmationPolicy, CorrelationTracker};
