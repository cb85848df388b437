//! Integration tests for session operations
//!
//! - user_tests: user create, get, modify, remove and list
//! - group_tests: groups and membership
//! - query_tests: filtering, paging and cardinality
//! - session_tests: cleanup and closed-session behavior

mod query_tests;
mod session_tests;
