use thiserror::Error;

use crate::types::EntityKind;

/// Catalog status codes carried in failed admin and query replies
pub mod status {
    pub const CAT_NO_ROWS_FOUND: i32 = -808000;
    pub const CATALOG_ALREADY_HAS_ITEM_BY_THAT_NAME: i32 = -809000;
    pub const CAT_INVALID_ARGUMENT: i32 = -816000;
    pub const CAT_INSUFFICIENT_PRIVILEGE_LEVEL: i32 = -818000;
    pub const CAT_INVALID_USER: i32 = -827000;
    pub const CAT_INVALID_GROUP: i32 = -831000;
    pub const CAT_INVALID_ZONE: i32 = -840000;

    /// Symbolic name for a status code, for log lines and error messages
    pub fn name(code: i32) -> &'static str {
        match code {
            CAT_NO_ROWS_FOUND => "CAT_NO_ROWS_FOUND",
            CATALOG_ALREADY_HAS_ITEM_BY_THAT_NAME => "CATALOG_ALREADY_HAS_ITEM_BY_THAT_NAME",
            CAT_INVALID_ARGUMENT => "CAT_INVALID_ARGUMENT",
            CAT_INSUFFICIENT_PRIVILEGE_LEVEL => "CAT_INSUFFICIENT_PRIVILEGE_LEVEL",
            CAT_INVALID_USER => "CAT_INVALID_USER",
            CAT_INVALID_GROUP => "CAT_INVALID_GROUP",
            CAT_INVALID_ZONE => "CAT_INVALID_ZONE",
            _ => "UNKNOWN_STATUS",
        }
    }
}

/// Failure reported by the connection or the remote catalog
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("catalog returned {} ({code}): {message}", status::name(*code))]
    Status { code: i32, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed catalog response: {0}")]
    Protocol(String),
    #[error("catalog rejected the session credentials")]
    Unauthorized,
    #[error("connection is closed")]
    Closed,
}

impl RemoteError {
    pub fn status(code: i32, message: impl Into<String>) -> Self {
        RemoteError::Status {
            code,
            message: message.into(),
        }
    }

    /// Status code, when the catalog answered with one
    pub fn code(&self) -> Option<i32> {
        match self {
            RemoteError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Error type for administrative and query operations
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{kind} '{name}#{zone}' does not exist")]
    EntityDoesNotExist {
        kind: EntityKind,
        name: String,
        zone: String,
    },
    #[error("{kind} '{name}#{zone}' already exists")]
    EntityAlreadyExists {
        kind: EntityKind,
        name: String,
        zone: String,
    },
    #[error("lookup of {kind} '{name}#{zone}' matched more than one row")]
    AmbiguousResult {
        kind: EntityKind,
        name: String,
        zone: String,
    },
    #[error("query returned no rows")]
    NoResultFound,
    #[error("query returned more than one row")]
    MultipleResultsFound,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl AdminError {
    pub fn does_not_exist(kind: EntityKind, name: &str, zone: &str) -> Self {
        AdminError::EntityDoesNotExist {
            kind,
            name: name.to_string(),
            zone: zone.to_string(),
        }
    }

    pub fn already_exists(kind: EntityKind, name: &str, zone: &str) -> Self {
        AdminError::EntityAlreadyExists {
            kind,
            name: name.to_string(),
            zone: zone.to_string(),
        }
    }

    /// True when the entity is known to be absent, e.g. during teardown
    pub fn is_not_found(&self) -> bool {
        matches!(self, AdminError::EntityDoesNotExist { .. })
    }
}

/// Alias for Result using AdminError
pub type AdminResult<T> = Result<T, AdminError>;
