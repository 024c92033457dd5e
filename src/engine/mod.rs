//! Inference engine module
//!
//! Provides access to the remote try-on model with:
//! - Lazy, single connection per client
//! - Normalization of single/sequence results
//! - Result download or local copy into transient artifacts

pub mod backend;
pub mod client;
pub mod remote;
pub mod resolve;
pub mod result;

pub use backend::InferenceBackend;
pub use client::BackendClient;
pub use remote::{RemoteBackend, RemoteSession};
pub use resolve::ResultResolver;
pub use result::{InferenceResult, ResultLocation, ResultRef};
