// Public modules for integration tests and library usage
pub mod catalog;
pub mod channel;
pub mod config;
pub mod error;
pub mod manager;
pub mod query;
pub mod router;
pub mod session;
pub mod transport;
pub mod types;

// Re-export commonly used types for convenience
pub use catalog::MemoryCatalog;
pub use channel::Connection;
pub use config::{ConfigError, ServerConfig, SessionConfig};
pub use error::{AdminError, AdminResult, RemoteError};
pub use manager::{GroupManager, Lookup, UserManager};
pub use query::{Cardinality, Column, FilterOp, QueryBuilder, Row};
pub use router::{create_http_router, start_http_server};
pub use session::Session;
pub use transport::HttpConnection;
pub use types::{EntityKind, EntityRef, UserAttribute, UserType};
