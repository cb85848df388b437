//! Administrative command clients
//!
//! Each manager borrows a [`Session`](crate::session::Session) and turns one
//! admin intent into either a single dispatched request (create, modify,
//! remove) or a catalog query (get, list). Nothing is retried and nothing is
//! cached.

mod group;
mod user;

pub use group::GroupManager;
pub use user::UserManager;

use crate::error::{AdminError, RemoteError, status};
use crate::query::{Cardinality, Column, Row};
use crate::types::{EntityKind, EntityRef};

/// Outcome of resolving a name to a single catalog entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    NotFound,
    Found(EntityRef),
    /// More than one row matched; the catalog's uniqueness invariant is broken
    Ambiguous,
}

impl Lookup {
    /// Turn the lookup into the reference, or the matching typed error
    pub fn into_result(self, kind: EntityKind, name: &str, zone: &str) -> Result<EntityRef, AdminError> {
        match self {
            Lookup::Found(entity) => Ok(entity),
            Lookup::NotFound => Err(AdminError::does_not_exist(kind, name, zone)),
            Lookup::Ambiguous => Err(AdminError::AmbiguousResult {
                kind,
                name: name.to_string(),
                zone: zone.to_string(),
            }),
        }
    }
}

/// Map a query cardinality onto a lookup, building the reference from the row
fn lookup_from_rows(rows: Cardinality<Row>, kind: EntityKind) -> Result<Lookup, AdminError> {
    match rows {
        Cardinality::None => Ok(Lookup::NotFound),
        Cardinality::Many => Ok(Lookup::Ambiguous),
        Cardinality::One(row) => Ok(Lookup::Found(entity_from_row(&row, kind)?)),
    }
}

/// Build a reference from a row projecting at least name and zone
fn entity_from_row(row: &Row, kind: EntityKind) -> Result<EntityRef, AdminError> {
    let (Some(name), Some(zone)) = (row.get(Column::UserName), row.get(Column::UserZone)) else {
        return Err(RemoteError::Protocol("row is missing the name or zone column".to_string()).into());
    };
    EntityRef::new(name, zone, kind)
        .map_err(|e| RemoteError::Protocol(format!("catalog returned an invalid entity: {e}")).into())
}

/// Translate a catalog status reply for a request about `name#zone`
fn classify_remote(err: RemoteError, kind: EntityKind, name: &str, zone: &str) -> AdminError {
    match err.code() {
        Some(status::CATALOG_ALREADY_HAS_ITEM_BY_THAT_NAME) => {
            AdminError::already_exists(kind, name, zone)
        }
        Some(status::CAT_INVALID_USER) if kind == EntityKind::User => {
            AdminError::does_not_exist(kind, name, zone)
        }
        Some(status::CAT_INVALID_GROUP) if kind == EntityKind::Group => {
            AdminError::does_not_exist(kind, name, zone)
        }
        Some(status::CAT_NO_ROWS_FOUND) => AdminError::does_not_exist(kind, name, zone),
        _ => AdminError::Remote(err),
    }
}
