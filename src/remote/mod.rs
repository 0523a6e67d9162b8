//! Remote side of the gateway: request description, the HTTP adapter, and
//! the failure taxonomy.

pub mod adapter;
pub mod outcome;
pub mod request;
pub mod taxonomy;

pub use adapter::{JiraClient, RemoteCall};
pub use outcome::{ErrorKind, Failure, RemoteOutcome};
pub use request::{Method, RemoteRequest, TemplateError};
pub use taxonomy::{describe, Diagnosis};
