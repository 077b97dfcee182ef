//! Production adapters for the collaborator ports

pub mod payment_http;
pub mod documents;
pub mod notifier;

pub use payment_http::{HttpPaymentGateway, PaymentConfig};
pub use documents::LocalDocumentStore;
pub use notifier::TracingNotifier;
