//! In-process reference catalog
//!
//! `MemoryCatalog` plays the server side of the admin protocol: it enforces
//! uniqueness and existence rules, validates zones and user types, and
//! evaluates paged queries. It backs the HTTP router and implements
//! [`Connection`] directly so sessions can run against it without a network.

mod like;

pub use like::like_to_regex;

use chrono::Utc;
use regex::Regex;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::channel::Connection;
use crate::error::{RemoteError, status};
use crate::query::{Column, Criterion, FilterOp, QueryPage, QueryRequest};
use crate::types::{
    AdminAction, AdminRequest, TargetKind, UserAttribute, UserType, validate_entity_name,
};

/// Name of the administrator account every catalog starts with
pub const DEFAULT_ADMIN_USER: &str = "rods";

/// A user or group row as stored by the catalog
#[derive(Debug, Clone)]
struct CatalogUser {
    id: u64,
    name: String,
    zone: String,
    user_type: UserType,
    comment: String,
    info: String,
    create_time: i64,
    modify_time: i64,
}

impl CatalogUser {
    fn value(&self, column: Column, group: Option<&CatalogUser>) -> String {
        match column {
            Column::UserId => self.id.to_string(),
            Column::UserName => self.name.clone(),
            Column::UserZone => self.zone.clone(),
            Column::UserType => self.user_type.to_string(),
            Column::UserComment => self.comment.clone(),
            Column::UserInfo => self.info.clone(),
            Column::UserCreateTime => format_timestamp(self.create_time),
            Column::UserModifyTime => format_timestamp(self.modify_time),
            Column::UserGroupId => group.map(|g| g.id.to_string()).unwrap_or_default(),
            Column::UserGroupName => group.map(|g| g.name.clone()).unwrap_or_default(),
            Column::UserGroupZone => group.map(|g| g.zone.clone()).unwrap_or_default(),
        }
    }
}

/// Timestamps are zero-padded epoch seconds so they sort as strings
fn format_timestamp(seconds: i64) -> String {
    format!("{seconds:011}")
}

#[derive(Debug, Default)]
struct CatalogState {
    zones: BTreeSet<String>,
    users: BTreeMap<u64, CatalogUser>,
    /// (group id, member id)
    memberships: BTreeSet<(u64, u64)>,
    next_id: u64,
    injected_failures: VecDeque<RemoteError>,
}

impl CatalogState {
    fn find(&self, name: &str, zone: &str) -> Option<&CatalogUser> {
        self.users
            .values()
            .find(|u| u.name == name && u.zone == zone)
    }

    fn find_user(&self, name: &str, zone: &str) -> Option<&CatalogUser> {
        self.find(name, zone).filter(|u| !u.user_type.is_group())
    }

    fn find_group(&self, name: &str, zone: &str) -> Option<&CatalogUser> {
        self.find(name, zone).filter(|u| u.user_type.is_group())
    }

    fn insert(&mut self, name: &str, zone: &str, user_type: UserType) -> u64 {
        self.next_id += 1;
        let now = Utc::now().timestamp();
        let id = self.next_id;
        self.users.insert(
            id,
            CatalogUser {
                id,
                name: name.to_string(),
                zone: zone.to_string(),
                user_type,
                comment: String::new(),
                info: String::new(),
                create_time: now,
                modify_time: now,
            },
        );
        id
    }

    fn remove(&mut self, id: u64) {
        self.users.remove(&id);
        self.memberships
            .retain(|(group_id, member_id)| *group_id != id && *member_id != id);
    }
}

struct CatalogInner {
    home_zone: String,
    state: Mutex<CatalogState>,
    admin_requests: AtomicUsize,
    query_requests: AtomicUsize,
    disconnects: AtomicUsize,
}

/// Shared, cloneable in-memory catalog. Clones observe the same state.
#[derive(Clone)]
pub struct MemoryCatalog {
    inner: Arc<CatalogInner>,
}

impl MemoryCatalog {
    /// Create a catalog whose home zone holds the default administrator
    pub fn new(home_zone: &str) -> Self {
        Self::with_admin(home_zone, DEFAULT_ADMIN_USER)
    }

    pub fn with_admin(home_zone: &str, admin_user: &str) -> Self {
        let mut state = CatalogState::default();
        state.zones.insert(home_zone.to_string());
        state.insert(admin_user, home_zone, UserType::RodsAdmin);
        info!(
            "Catalog initialized for zone '{}' with administrator '{}'",
            home_zone, admin_user
        );
        Self {
            inner: Arc::new(CatalogInner {
                home_zone: home_zone.to_string(),
                state: Mutex::new(state),
                admin_requests: AtomicUsize::new(0),
                query_requests: AtomicUsize::new(0),
                disconnects: AtomicUsize::new(0),
            }),
        }
    }

    pub fn home_zone(&self) -> &str {
        &self.inner.home_zone
    }

    /// Register a remote zone so entities may be created in it
    pub fn add_zone(&self, zone: &str) {
        self.state().zones.insert(zone.to_string());
    }

    pub fn zones(&self) -> Vec<String> {
        self.state().zones.iter().cloned().collect()
    }

    /// Fail the next admin or query request with the given status
    pub fn inject_failure(&self, code: i32, message: &str) {
        self.state()
            .injected_failures
            .push_back(RemoteError::status(code, message));
    }

    pub fn admin_request_count(&self) -> usize {
        self.inner.admin_requests.load(Ordering::SeqCst)
    }

    pub fn query_request_count(&self) -> usize {
        self.inner.query_requests.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.inner.disconnects.load(Ordering::SeqCst)
    }

    /// Record a client disconnect
    pub fn note_disconnect(&self) {
        self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn state(&self) -> MutexGuard<'_, CatalogState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one administrative request
    pub fn handle_admin(&self, request: &AdminRequest) -> Result<(), RemoteError> {
        self.inner.admin_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        if let Some(failure) = state.injected_failures.pop_front() {
            warn!("Injected failure for admin request: {}", failure);
            return Err(failure);
        }
        debug!(
            "Admin request: {} {} with {} arguments",
            request.action,
            request.target,
            request.args.len()
        );
        let args = &request.args;
        match (request.target, request.action) {
            (TargetKind::User, AdminAction::Add) => self.add_user(&mut state, args),
            (TargetKind::User, AdminAction::Modify) => self.modify_user(&mut state, args),
            (TargetKind::User, AdminAction::Remove) => self.remove_user(&mut state, args),
            (TargetKind::Group, AdminAction::Add) => self.add_group(&mut state, args),
            (TargetKind::Group, AdminAction::Modify) => self.modify_group(&mut state, args),
            (TargetKind::Group, AdminAction::Remove) => self.remove_group(&mut state, args),
        }
    }

    /// Resolve an optional zone argument, checking it is known
    fn zone_arg(&self, state: &CatalogState, args: &[String], index: usize) -> Result<String, RemoteError> {
        let zone = match args.get(index).map(String::as_str) {
            None | Some("") => self.inner.home_zone.clone(),
            Some(zone) => zone.to_string(),
        };
        if !state.zones.contains(&zone) {
            return Err(RemoteError::status(
                status::CAT_INVALID_ZONE,
                format!("zone '{zone}' is not registered"),
            ));
        }
        Ok(zone)
    }

    fn add_user(&self, state: &mut CatalogState, args: &[String]) -> Result<(), RemoteError> {
        let [name, user_type, ..] = args else {
            return Err(arity_error("add user", 2, args.len()));
        };
        validate_entity_name(name)
            .map_err(|e| RemoteError::status(status::CAT_INVALID_ARGUMENT, e.to_string()))?;
        let user_type = UserType::parse_for_user(user_type)
            .map_err(|e| RemoteError::status(status::CAT_INVALID_ARGUMENT, e.to_string()))?;
        let zone = self.zone_arg(state, args, 2)?;
        if state.find(name, &zone).is_some() {
            return Err(RemoteError::status(
                status::CATALOG_ALREADY_HAS_ITEM_BY_THAT_NAME,
                format!("'{name}#{zone}' already exists"),
            ));
        }
        let id = state.insert(name, &zone, user_type);
        info!("Created user '{}#{}' ({}) with id {}", name, zone, user_type, id);
        Ok(())
    }

    fn modify_user(&self, state: &mut CatalogState, args: &[String]) -> Result<(), RemoteError> {
        let [name, attribute, value, ..] = args else {
            return Err(arity_error("modify user", 3, args.len()));
        };
        let attribute: UserAttribute = attribute
            .parse()
            .map_err(|e: crate::error::AdminError| {
                RemoteError::status(status::CAT_INVALID_ARGUMENT, e.to_string())
            })?;
        let zone = self.zone_arg(state, args, 3)?;
        let id = state
            .find_user(name, &zone)
            .map(|u| u.id)
            .ok_or_else(|| invalid_user(name, &zone))?;
        let new_type = match attribute {
            UserAttribute::Type => Some(
                UserType::parse_for_user(value)
                    .map_err(|e| RemoteError::status(status::CAT_INVALID_ARGUMENT, e.to_string()))?,
            ),
            _ => None,
        };
        let Some(user) = state.users.get_mut(&id) else {
            return Err(invalid_user(name, &zone));
        };
        match attribute {
            UserAttribute::Type => {
                if let Some(user_type) = new_type {
                    user.user_type = user_type;
                }
            }
            UserAttribute::Comment => user.comment = value.clone(),
            UserAttribute::Info => user.info = value.clone(),
            // Credentials are held by the authentication layer, not the catalog rows
            UserAttribute::Password => {}
        }
        user.modify_time = Utc::now().timestamp();
        info!("Modified {} of user '{}#{}'", attribute, name, zone);
        Ok(())
    }

    fn remove_user(&self, state: &mut CatalogState, args: &[String]) -> Result<(), RemoteError> {
        let [name, ..] = args else {
            return Err(arity_error("remove user", 1, args.len()));
        };
        let zone = self.zone_arg(state, args, 1)?;
        let id = state
            .find_user(name, &zone)
            .map(|u| u.id)
            .ok_or_else(|| invalid_user(name, &zone))?;
        state.remove(id);
        info!("Removed user '{}#{}'", name, zone);
        Ok(())
    }

    fn add_group(&self, state: &mut CatalogState, args: &[String]) -> Result<(), RemoteError> {
        let [name, ..] = args else {
            return Err(arity_error("add group", 1, args.len()));
        };
        validate_entity_name(name)
            .map_err(|e| RemoteError::status(status::CAT_INVALID_ARGUMENT, e.to_string()))?;
        if let Some(group_type) = args.get(1).filter(|t| !t.is_empty()) {
            if group_type != UserType::RodsGroup.as_str() {
                return Err(RemoteError::status(
                    status::CAT_INVALID_ARGUMENT,
                    format!("'{group_type}' is not a group type"),
                ));
            }
        }
        let zone = self.zone_arg(state, args, 2)?;
        if state.find(name, &zone).is_some() {
            return Err(RemoteError::status(
                status::CATALOG_ALREADY_HAS_ITEM_BY_THAT_NAME,
                format!("'{name}#{zone}' already exists"),
            ));
        }
        let id = state.insert(name, &zone, UserType::RodsGroup);
        info!("Created group '{}#{}' with id {}", name, zone, id);
        Ok(())
    }

    fn remove_group(&self, state: &mut CatalogState, args: &[String]) -> Result<(), RemoteError> {
        let [name, ..] = args else {
            return Err(arity_error("remove group", 1, args.len()));
        };
        let zone = self.zone_arg(state, args, 1)?;
        let id = state
            .find_group(name, &zone)
            .map(|g| g.id)
            .ok_or_else(|| invalid_group(name, &zone))?;
        state.remove(id);
        info!("Removed group '{}#{}'", name, zone);
        Ok(())
    }

    /// args: group, add|remove, member, member zone, group zone
    fn modify_group(&self, state: &mut CatalogState, args: &[String]) -> Result<(), RemoteError> {
        let [group, change, member, ..] = args else {
            return Err(arity_error("modify group", 3, args.len()));
        };
        let member_zone = self.zone_arg(state, args, 3)?;
        let group_zone = self.zone_arg(state, args, 4)?;
        let group_id = state
            .find_group(group, &group_zone)
            .map(|g| g.id)
            .ok_or_else(|| invalid_group(group, &group_zone))?;
        let member_id = state
            .find_user(member, &member_zone)
            .map(|u| u.id)
            .ok_or_else(|| invalid_user(member, &member_zone))?;
        match change.as_str() {
            "add" => {
                if !state.memberships.insert((group_id, member_id)) {
                    return Err(RemoteError::status(
                        status::CATALOG_ALREADY_HAS_ITEM_BY_THAT_NAME,
                        format!("'{member}#{member_zone}' is already a member of '{group}'"),
                    ));
                }
                info!("Added '{}#{}' to group '{}'", member, member_zone, group);
            }
            "remove" => {
                if !state.memberships.remove(&(group_id, member_id)) {
                    return Err(RemoteError::status(
                        status::CAT_NO_ROWS_FOUND,
                        format!("'{member}#{member_zone}' is not a member of '{group}'"),
                    ));
                }
                info!("Removed '{}#{}' from group '{}'", member, member_zone, group);
            }
            other => {
                return Err(RemoteError::status(
                    status::CAT_INVALID_ARGUMENT,
                    format!("unknown group modification '{other}'"),
                ));
            }
        }
        Ok(())
    }

    /// Evaluate one page of a query
    pub fn handle_query(&self, request: &QueryRequest) -> Result<QueryPage, RemoteError> {
        self.inner.query_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        if let Some(failure) = state.injected_failures.pop_front() {
            warn!("Injected failure for query: {}", failure);
            return Err(failure);
        }
        if request.columns.is_empty() {
            return Err(RemoteError::status(
                status::CAT_INVALID_ARGUMENT,
                "query must select at least one column",
            ));
        }
        if request.page_size == 0 {
            return Err(RemoteError::status(
                status::CAT_INVALID_ARGUMENT,
                "page size must be greater than zero",
            ));
        }
        let filters = request
            .criteria
            .iter()
            .map(CompiledCriterion::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let joins_membership = request.columns.iter().any(Column::is_membership)
            || request.criteria.iter().any(|c| c.column.is_membership());

        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for user in state.users.values() {
            let groups: Vec<Option<&CatalogUser>> = if joins_membership {
                state
                    .memberships
                    .iter()
                    .filter(|(_, member_id)| *member_id == user.id)
                    .filter_map(|(group_id, _)| state.users.get(group_id))
                    .map(Some)
                    .collect()
            } else {
                vec![None]
            };
            for group in groups {
                if !filters.iter().all(|f| f.matches(&user.value(f.column, group))) {
                    continue;
                }
                let row: Vec<String> = request
                    .columns
                    .iter()
                    .map(|c| user.value(*c, group))
                    .collect();
                if seen.insert(row.clone()) {
                    rows.push(row);
                }
            }
        }
        if let Some(limit) = request.limit {
            rows.truncate(limit);
        }

        let total = rows.len();
        let start = usize::try_from(request.continuation.unwrap_or(0)).map_err(|_| {
            RemoteError::status(
                status::CAT_INVALID_ARGUMENT,
                "continuation token is out of range",
            )
        })?;
        if start > total {
            return Err(RemoteError::status(
                status::CAT_INVALID_ARGUMENT,
                format!("continuation {start} is past the end of the result ({total} rows)"),
            ));
        }
        let end = start.saturating_add(request.page_size).min(total);
        debug!("Query matched {} rows, returning {}..{}", total, start, end);
        Ok(QueryPage {
            rows: rows.drain(start..end).collect(),
            continuation: (end < total).then_some(end as u64),
        })
    }
}

impl Connection for MemoryCatalog {
    fn dispatch_admin_request(
        &self,
        action: AdminAction,
        target: TargetKind,
        args: &[String],
    ) -> Result<(), RemoteError> {
        self.handle_admin(&AdminRequest {
            action,
            target,
            args: args.to_vec(),
        })
    }

    fn execute_query(&self, request: &QueryRequest) -> Result<QueryPage, RemoteError> {
        self.handle_query(request)
    }

    fn disconnect(&self) -> Result<(), RemoteError> {
        self.note_disconnect();
        Ok(())
    }
}

struct CompiledCriterion {
    column: Column,
    op: FilterOp,
    value: String,
    pattern: Option<Regex>,
}

impl CompiledCriterion {
    fn compile(criterion: &Criterion) -> Result<Self, RemoteError> {
        let pattern = match criterion.op {
            FilterOp::Like => Some(like_to_regex(&criterion.value).map_err(|e| {
                RemoteError::status(
                    status::CAT_INVALID_ARGUMENT,
                    format!("bad pattern '{}': {e}", criterion.value),
                )
            })?),
            _ => None,
        };
        Ok(Self {
            column: criterion.column,
            op: criterion.op,
            value: criterion.value.clone(),
            pattern,
        })
    }

    fn matches(&self, actual: &str) -> bool {
        match self.op {
            FilterOp::Eq => actual == self.value,
            FilterOp::Ne => actual != self.value,
            FilterOp::Lt => compare(actual, &self.value) == CmpOrdering::Less,
            FilterOp::Le => compare(actual, &self.value) != CmpOrdering::Greater,
            FilterOp::Gt => compare(actual, &self.value) == CmpOrdering::Greater,
            FilterOp::Ge => compare(actual, &self.value) != CmpOrdering::Less,
            FilterOp::Like => self
                .pattern
                .as_ref()
                .is_some_and(|pattern| pattern.is_match(actual)),
        }
    }
}

/// Numeric when both sides are integers, lexicographic otherwise
fn compare(actual: &str, expected: &str) -> CmpOrdering {
    match (actual.parse::<i64>(), expected.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => actual.cmp(expected),
    }
}

fn arity_error(operation: &str, required: usize, got: usize) -> RemoteError {
    RemoteError::status(
        status::CAT_INVALID_ARGUMENT,
        format!("{operation} requires at least {required} arguments, got {got}"),
    )
}

fn invalid_user(name: &str, zone: &str) -> RemoteError {
    RemoteError::status(
        status::CAT_INVALID_USER,
        format!("user '{name}#{zone}' does not exist"),
    )
}

fn invalid_group(name: &str, zone: &str) -> RemoteError {
    RemoteError::status(
        status::CAT_INVALID_GROUP,
        format!("group '{name}#{zone}' does not exist"),
    )
}
