pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod store;
pub mod transport;

pub use config::AppConfig;
pub use error::{ExchangeError, Result};
pub use service::{ConfirmationReceiver, InvoiceProcessor};
