use tracing::{error, info};

use super::{Lookup, classify_remote, entity_from_row, lookup_from_rows};
use crate::error::{AdminError, AdminResult, status};
use crate::query::{Column, FilterOp};
use crate::session::Session;
use crate::types::{
    AdminAction, EntityKind, EntityRef, MembershipChange, TargetKind, UserType,
    validate_entity_name, validate_zone,
};

/// Manage groups and their membership. Groups live in the catalog as users
/// of type `rodsgroup`.
pub struct GroupManager<'s> {
    session: &'s Session,
}

impl<'s> GroupManager<'s> {
    pub(crate) fn new(session: &'s Session) -> Self {
        Self { session }
    }

    fn resolve_zone(&self, zone: Option<&str>) -> AdminResult<String> {
        let zone = zone.unwrap_or(self.session.zone());
        validate_zone(zone)?;
        Ok(zone.to_string())
    }

    pub fn create(&self, name: &str, zone: Option<&str>) -> AdminResult<()> {
        validate_entity_name(name)?;
        let zone = self.resolve_zone(zone)?;
        info!("Creating group '{}#{}'", name, zone);
        let args = vec![
            name.to_string(),
            UserType::RodsGroup.to_string(),
            zone.clone(),
        ];
        self.session
            .connection()
            .dispatch_admin_request(AdminAction::Add, TargetKind::Group, &args)
            .map_err(|e| {
                error!("Group create for '{}#{}' failed: {}", name, zone, e);
                classify_remote(e, EntityKind::Group, name, &zone)
            })
    }

    pub fn lookup(&self, name: &str, zone: Option<&str>) -> AdminResult<Lookup> {
        validate_entity_name(name)?;
        let zone = self.resolve_zone(zone)?;
        let rows = self
            .session
            .query(&[Column::UserName, Column::UserZone])
            .filter_eq(Column::UserName, name)
            .filter_eq(Column::UserZone, zone)
            .filter_eq(Column::UserType, UserType::RodsGroup.as_str())
            .cardinality()?;
        lookup_from_rows(rows, EntityKind::Group)
    }

    pub fn get(&self, name: &str, zone: Option<&str>) -> AdminResult<EntityRef> {
        let resolved = self.resolve_zone(zone)?;
        self.lookup(name, Some(resolved.as_str()))?
            .into_result(EntityKind::Group, name, &resolved)
    }

    pub fn remove(&self, name: &str, zone: Option<&str>) -> AdminResult<()> {
        validate_entity_name(name)?;
        let zone = self.resolve_zone(zone)?;
        info!("Removing group '{}#{}'", name, zone);
        let args = vec![name.to_string(), zone.clone()];
        self.session
            .connection()
            .dispatch_admin_request(AdminAction::Remove, TargetKind::Group, &args)
            .map_err(|e| {
                error!("Group remove for '{}#{}' failed: {}", name, zone, e);
                classify_remote(e, EntityKind::Group, name, &zone)
            })
    }

    /// Add `user` to `group`. The group is addressed in the session's home
    /// zone; the user defaults to it.
    pub fn add_member(&self, group: &str, user: &str, user_zone: Option<&str>) -> AdminResult<()> {
        self.change_membership(group, MembershipChange::Add, user, user_zone)
    }

    pub fn remove_member(&self, group: &str, user: &str, user_zone: Option<&str>) -> AdminResult<()> {
        self.change_membership(group, MembershipChange::Remove, user, user_zone)
    }

    fn change_membership(
        &self,
        group: &str,
        change: MembershipChange,
        user: &str,
        user_zone: Option<&str>,
    ) -> AdminResult<()> {
        validate_entity_name(group)?;
        validate_entity_name(user)?;
        let user_zone = self.resolve_zone(user_zone)?;
        let group_zone = self.session.zone().to_string();
        info!(
            "Group '{}': {} member '{}#{}'",
            group,
            change.as_str(),
            user,
            user_zone
        );
        let args = vec![
            group.to_string(),
            change.as_str().to_string(),
            user.to_string(),
            user_zone.clone(),
            group_zone.clone(),
        ];
        self.session
            .connection()
            .dispatch_admin_request(AdminAction::Modify, TargetKind::Group, &args)
            .map_err(|e| {
                error!("Membership change on group '{}' failed: {}", group, e);
                match e.code() {
                    Some(status::CAT_INVALID_GROUP) => {
                        AdminError::does_not_exist(EntityKind::Group, group, &group_zone)
                    }
                    // The user exists; it is just not a member
                    Some(status::CAT_NO_ROWS_FOUND) => AdminError::Remote(e),
                    _ => classify_remote(e, EntityKind::User, user, &user_zone),
                }
            })
    }

    /// Users belonging to `group`
    pub fn members(&self, group: &str, zone: Option<&str>) -> AdminResult<Vec<EntityRef>> {
        validate_entity_name(group)?;
        let zone = self.resolve_zone(zone)?;
        self.session
            .query(&[Column::UserName, Column::UserZone])
            .filter_eq(Column::UserGroupName, group)
            .filter_eq(Column::UserGroupZone, zone)
            .filter(Column::UserType, FilterOp::Ne, UserType::RodsGroup.as_str())
            .execute()?
            .map(|row| entity_from_row(&row?, EntityKind::User))
            .collect()
    }
}
