// src/sync/mod.rs
mod reconciler;
mod transport;

pub use reconciler::{Reconciler, SyncError, SyncOptions, SyncOutcome};
pub use transport::{SshTransport, Transport, TransportError};
