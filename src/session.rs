use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channel::Connection;
use crate::config::SessionConfig;
use crate::error::{AdminResult, RemoteError};
use crate::manager::{GroupManager, UserManager};
use crate::query::{Column, QueryBuilder, QueryPage, QueryRequest};
use crate::transport::HttpConnection;
use crate::types::{AdminAction, TargetKind};

/// An authenticated connection to the catalog plus the identity it acts as.
///
/// The connection is released exactly once: by [`Session::cleanup`], or when
/// the session is dropped on any other path.
pub struct Session {
    id: Uuid,
    config: SessionConfig,
    connection: Box<dyn Connection>,
    closed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user_name", &self.config.user_name)
            .field("zone", &self.config.zone)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(config: SessionConfig, connection: Box<dyn Connection>) -> Self {
        let id = Uuid::new_v4();
        info!(
            "Session {} opened for '{}#{}'",
            id, config.user_name, config.zone
        );
        Self {
            id,
            config,
            connection,
            closed: false,
        }
    }

    /// Open an HTTP connection to the configured catalog
    pub fn connect(config: SessionConfig) -> AdminResult<Self> {
        let connection = HttpConnection::open(&config)?;
        Ok(Self::new(config, Box::new(connection)))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Home zone; the default for every zone-optional operation
    pub fn zone(&self) -> &str {
        &self.config.zone
    }

    pub fn user_name(&self) -> &str {
        &self.config.user_name
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn users(&self) -> UserManager<'_> {
        UserManager::new(self)
    }

    pub fn groups(&self) -> GroupManager<'_> {
        GroupManager::new(self)
    }

    /// Start a query projecting `columns`
    pub fn query(&self, columns: &[Column]) -> QueryBuilder<'_> {
        QueryBuilder::new(self.connection(), columns).page_size(self.config.page_size)
    }

    /// The live connection, or one that refuses every request once closed
    pub(crate) fn connection(&self) -> &dyn Connection {
        if self.closed {
            &ClosedConnection
        } else {
            self.connection.as_ref()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the connection. Later calls are no-ops.
    pub fn cleanup(&mut self) -> AdminResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("Session {} disconnecting", self.id);
        self.connection.disconnect()?;
        info!("Session {} closed", self.id);
        Ok(())
    }
}

struct ClosedConnection;

impl Connection for ClosedConnection {
    fn dispatch_admin_request(
        &self,
        _action: AdminAction,
        _target: TargetKind,
        _args: &[String],
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Closed)
    }

    fn execute_query(&self, _request: &QueryRequest) -> Result<QueryPage, RemoteError> {
        Err(RemoteError::Closed)
    }

    fn disconnect(&self) -> Result<(), RemoteError> {
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Session {} failed to disconnect cleanly: {}", self.id, e);
        }
    }
}
