//! Per-run construction of the downstream client.

use crate::error::Result;

/// Builds the client a run's tools act on from the caller's credentials.
///
/// The connector itself is shared across runs (it typically owns the HTTP
/// connection pool); each call to [`Connector::connect`] yields a client
/// bound to one caller.
pub trait Connector: Send + Sync {
    type Client: Send + Sync;

    /// Failing here is an internal fault, not a graceful run outcome.
    fn connect(&self, auth_token: &str) -> Result<Self::Client>;
}
