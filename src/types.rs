use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AdminError, AdminResult};

/// Kind of catalog entity an `EntityRef` points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Group,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Group => write!(f, "group"),
        }
    }
}

/// Immutable handle to a named catalog entity within a zone.
///
/// References are views over catalog state at the time they were resolved.
/// The entity may have been removed since; callers must tolerate that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityRef {
    name: String,
    zone: String,
    kind: EntityKind,
}

impl EntityRef {
    /// Build a reference, validating the name and zone
    pub fn new(
        name: impl Into<String>,
        zone: impl Into<String>,
        kind: EntityKind,
    ) -> AdminResult<Self> {
        let name = name.into();
        let zone = zone.into();
        validate_entity_name(&name)?;
        validate_zone(&zone)?;
        Ok(Self { name, zone, kind })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.zone)
    }
}

/// Reject names the catalog cannot address
pub fn validate_entity_name(name: &str) -> AdminResult<()> {
    if name.trim().is_empty() {
        return Err(AdminError::InvalidArgument(
            "entity name must not be empty".to_string(),
        ));
    }
    if name.contains(':') {
        return Err(AdminError::InvalidArgument(format!(
            "entity name '{name}' must not contain ':'"
        )));
    }
    Ok(())
}

pub fn validate_zone(zone: &str) -> AdminResult<()> {
    if zone.trim().is_empty() {
        return Err(AdminError::InvalidArgument(
            "zone must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Catalog user types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserType {
    #[serde(rename = "rodsuser")]
    RodsUser,
    #[serde(rename = "rodsadmin")]
    RodsAdmin,
    #[serde(rename = "groupadmin")]
    GroupAdmin,
    #[serde(rename = "rodsgroup")]
    RodsGroup,
}

impl UserType {
    pub const ALL: [UserType; 4] = [
        UserType::RodsUser,
        UserType::RodsAdmin,
        UserType::GroupAdmin,
        UserType::RodsGroup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::RodsUser => "rodsuser",
            UserType::RodsAdmin => "rodsadmin",
            UserType::GroupAdmin => "groupadmin",
            UserType::RodsGroup => "rodsgroup",
        }
    }

    /// Groups are stored as users of type `rodsgroup`
    pub fn is_group(&self) -> bool {
        matches!(self, UserType::RodsGroup)
    }

    /// Parse a type that is valid for a user account (anything but `rodsgroup`)
    pub fn parse_for_user(value: &str) -> AdminResult<Self> {
        let user_type: UserType = value.parse()?;
        if user_type.is_group() {
            return Err(AdminError::InvalidArgument(format!(
                "'{value}' is a group type and cannot be assigned to a user"
            )));
        }
        Ok(user_type)
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AdminError::InvalidArgument(format!("unrecognized user type '{s}'")))
    }
}

/// User attributes that may be changed through `modify`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAttribute {
    Type,
    Password,
    Comment,
    Info,
}

impl UserAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserAttribute::Type => "type",
            UserAttribute::Password => "password",
            UserAttribute::Comment => "comment",
            UserAttribute::Info => "info",
        }
    }
}

impl fmt::Display for UserAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserAttribute {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" => Ok(UserAttribute::Type),
            "password" => Ok(UserAttribute::Password),
            "comment" => Ok(UserAttribute::Comment),
            "info" => Ok(UserAttribute::Info),
            other => Err(AdminError::InvalidArgument(format!(
                "attribute '{other}' cannot be modified"
            ))),
        }
    }
}

/// Administrative request verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminAction {
    #[serde(rename = "add")]
    Add,
    #[serde(rename = "modify")]
    Modify,
    #[serde(rename = "rm")]
    Remove,
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminAction::Add => write!(f, "add"),
            AdminAction::Modify => write!(f, "modify"),
            AdminAction::Remove => write!(f, "rm"),
        }
    }
}

/// What an administrative request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    User,
    Group,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::User => write!(f, "user"),
            TargetKind::Group => write!(f, "group"),
        }
    }
}

/// Membership change carried by a group modify request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Add,
    Remove,
}

impl MembershipChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipChange::Add => "add",
            MembershipChange::Remove => "remove",
        }
    }
}

/// Body of `POST /api/admin`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRequest {
    pub action: AdminAction,
    pub target: TargetKind,
    pub args: Vec<String>,
}

/// Status reply shared by the admin and disconnect endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: i32,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            status: 0,
            message: message.into(),
        }
    }

    pub fn failed(status: i32, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            message: message.into(),
        }
    }
}

/// Reply to `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub zone: String,
}
