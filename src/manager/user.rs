use tracing::{debug, error, info};

use super::{Lookup, classify_remote, entity_from_row, lookup_from_rows};
use crate::error::{AdminError, AdminResult};
use crate::query::{Column, FilterOp};
use crate::session::Session;
use crate::types::{
    AdminAction, EntityKind, EntityRef, TargetKind, UserAttribute, UserType,
    validate_entity_name, validate_zone,
};

/// Create, inspect, modify and remove user accounts
pub struct UserManager<'s> {
    session: &'s Session,
}

impl<'s> UserManager<'s> {
    pub(crate) fn new(session: &'s Session) -> Self {
        Self { session }
    }

    fn resolve_zone(&self, zone: Option<&str>) -> AdminResult<String> {
        let zone = zone.unwrap_or(self.session.zone());
        validate_zone(zone)?;
        Ok(zone.to_string())
    }

    fn dispatch(&self, action: AdminAction, args: Vec<String>, name: &str, zone: &str) -> AdminResult<()> {
        self.session
            .connection()
            .dispatch_admin_request(action, TargetKind::User, &args)
            .map_err(|e| {
                error!("User {} for '{}#{}' failed: {}", action, name, zone, e);
                classify_remote(e, EntityKind::User, name, zone)
            })
    }

    /// Create a user. `user_type` must name a user type (not `rodsgroup`).
    /// Existence is checked by the catalog, not beforehand.
    pub fn create(&self, name: &str, user_type: &str, zone: Option<&str>) -> AdminResult<()> {
        let user_type = UserType::parse_for_user(user_type)?;
        self.create_typed(name, user_type, zone)
    }

    pub fn create_typed(&self, name: &str, user_type: UserType, zone: Option<&str>) -> AdminResult<()> {
        validate_entity_name(name)?;
        if user_type.is_group() {
            return Err(AdminError::InvalidArgument(
                "groups are created through the group manager".to_string(),
            ));
        }
        let zone = self.resolve_zone(zone)?;
        info!("Creating user '{}#{}' as {}", name, zone, user_type);
        self.dispatch(
            AdminAction::Add,
            vec![name.to_string(), user_type.to_string(), zone.clone()],
            name,
            &zone,
        )
    }

    /// Resolve a user, classifying the result as not found, found or ambiguous
    pub fn lookup(&self, name: &str, zone: Option<&str>) -> AdminResult<Lookup> {
        validate_entity_name(name)?;
        let zone = self.resolve_zone(zone)?;
        debug!("Looking up user '{}#{}'", name, zone);
        let rows = self
            .session
            .query(&[Column::UserName, Column::UserZone, Column::UserType])
            .filter_eq(Column::UserName, name)
            .filter_eq(Column::UserZone, zone.as_str())
            .filter(Column::UserType, FilterOp::Ne, UserType::RodsGroup.as_str())
            .cardinality()?;
        lookup_from_rows(rows, EntityKind::User)
    }

    /// Fetch a user. Without a zone, only the session's home zone is searched.
    pub fn get(&self, name: &str, zone: Option<&str>) -> AdminResult<EntityRef> {
        let resolved = self.resolve_zone(zone)?;
        self.lookup(name, Some(resolved.as_str()))?
            .into_result(EntityKind::User, name, &resolved)
    }

    /// Change one attribute, named as a string (`type`, `password`, `comment`, `info`)
    pub fn modify(&self, name: &str, attribute: &str, value: &str, zone: Option<&str>) -> AdminResult<()> {
        let attribute: UserAttribute = attribute.parse()?;
        self.modify_attribute(name, attribute, value, zone)
    }

    /// Change one attribute. Invalid input is rejected before any request is sent;
    /// a missing user is reported by the catalog.
    pub fn modify_attribute(
        &self,
        name: &str,
        attribute: UserAttribute,
        value: &str,
        zone: Option<&str>,
    ) -> AdminResult<()> {
        validate_entity_name(name)?;
        if attribute == UserAttribute::Type {
            UserType::parse_for_user(value)?;
        }
        let zone = self.resolve_zone(zone)?;
        info!("Modifying {} of user '{}#{}'", attribute, name, zone);
        self.dispatch(
            AdminAction::Modify,
            vec![
                name.to_string(),
                attribute.to_string(),
                value.to_string(),
                zone.clone(),
            ],
            name,
            &zone,
        )
    }

    pub fn remove(&self, name: &str, zone: Option<&str>) -> AdminResult<()> {
        validate_entity_name(name)?;
        let zone = self.resolve_zone(zone)?;
        info!("Removing user '{}#{}'", name, zone);
        self.dispatch(
            AdminAction::Remove,
            vec![name.to_string(), zone.clone()],
            name,
            &zone,
        )
    }

    /// Every user account in a zone, in catalog order
    pub fn list(&self, zone: Option<&str>) -> AdminResult<Vec<EntityRef>> {
        let zone = self.resolve_zone(zone)?;
        self.session
            .query(&[Column::UserName, Column::UserZone])
            .filter_eq(Column::UserZone, zone)
            .filter(Column::UserType, FilterOp::Ne, UserType::RodsGroup.as_str())
            .execute()?
            .map(|row| entity_from_row(&row?, EntityKind::User))
            .collect()
    }
}
