use crate::error::RemoteError;
use crate::query::{QueryPage, QueryRequest};
use crate::types::{AdminAction, TargetKind};

/// Request dispatch contract between the admin client and whatever carries
/// requests to the catalog.
///
/// Implementations perform exactly one round trip per call and never retry.
pub trait Connection: Send {
    /// Send one administrative request. `args` are positional and their
    /// meaning depends on `action` and `target`.
    fn dispatch_admin_request(
        &self,
        action: AdminAction,
        target: TargetKind,
        args: &[String],
    ) -> Result<(), RemoteError>;

    /// Fetch one page of query results
    fn execute_query(&self, request: &QueryRequest) -> Result<QueryPage, RemoteError>;

    /// Release the connection. Called at most once by the owning session.
    fn disconnect(&self) -> Result<(), RemoteError>;
}
