//! Catalog query interface
//!
//! Queries project a set of [`Column`]s over the user collection and filter
//! it with a conjunction of [`Criterion`]s. Results come back page by page;
//! [`QueryBuilder`] hides the paging behind a lazy [`ResultSet`].

mod builder;
mod row;

pub use builder::{Cardinality, QueryBuilder, ResultSet};
pub use row::Row;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rows fetched per round trip unless the builder overrides it
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Catalog columns available to queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    UserId,
    UserName,
    UserZone,
    UserType,
    UserComment,
    UserInfo,
    UserCreateTime,
    UserModifyTime,
    /// Id of a group the user belongs to; projecting it yields one row per membership
    UserGroupId,
    /// Name of a group the user belongs to; projecting it yields one row per membership
    UserGroupName,
    UserGroupZone,
}

impl Column {
    /// Whether the column comes from the group-membership join
    pub fn is_membership(&self) -> bool {
        matches!(
            self,
            Column::UserGroupId | Column::UserGroupName | Column::UserGroupZone
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::UserId => "user_id",
            Column::UserName => "user_name",
            Column::UserZone => "user_zone",
            Column::UserType => "user_type",
            Column::UserComment => "user_comment",
            Column::UserInfo => "user_info",
            Column::UserCreateTime => "user_create_time",
            Column::UserModifyTime => "user_modify_time",
            Column::UserGroupId => "user_group_id",
            Column::UserGroupName => "user_group_name",
            Column::UserGroupZone => "user_group_zone",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison applied by a [`Criterion`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// SQL-style pattern: `%` matches any run, `_` a single character
    Like,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::Like => "like",
        };
        f.write_str(symbol)
    }
}

/// One filter term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub column: Column,
    pub op: FilterOp,
    pub value: String,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.column, self.op, self.value)
    }
}

/// Body of `POST /api/query`, and the argument to `Connection::execute_query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub columns: Vec<Column>,
    pub criteria: Vec<Criterion>,
    /// Cap on the total number of rows across all pages
    pub limit: Option<usize>,
    pub page_size: usize,
    /// Token returned by the previous page; `None` starts a new query
    pub continuation: Option<u64>,
}

/// One page of results; values are ordered like `QueryRequest::columns`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPage {
    pub rows: Vec<Vec<String>>,
    /// Present when more rows are available
    pub continuation: Option<u64>,
}
