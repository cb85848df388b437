//! Integration tests for the catalog query interface

use crate::common::*;

fn seed_users(server: &TestServer, names: &[&str]) {
    let session = server.connect();
    for name in names {
        session
            .users()
            .create(name, "rodsuser", None)
            .expect("Failed to seed user");
    }
}

#[test]
fn test_paged_results_follow_continuations() {
    let server = TestServer::start().expect("Failed to start test server");
    seed_users(&server, &["u1", "u2", "u3", "u4", "u5"]);
    let session = server.connect();
    let before = server.catalog().query_request_count();

    println!("Test: 6 users read 2 per page take 3 round trips");
    let names: Vec<String> = session
        .query(&[Column::UserName])
        .filter(Column::UserType, FilterOp::Ne, "rodsgroup")
        .page_size(2)
        .execute()
        .expect("Failed to execute query")
        .map(|row| row.map(|r| r[Column::UserName].to_string()))
        .collect::<Result<_, _>>()
        .expect("Failed to read rows");

    assert_eq!(names, vec![ADMIN_USER, "u1", "u2", "u3", "u4", "u5"]);
    assert_eq!(server.catalog().query_request_count() - before, 3);
    println!("✅ Rows: {:?}", names);
}

#[test]
fn test_limit_caps_rows_and_round_trips() {
    let server = TestServer::start().expect("Failed to start test server");
    seed_users(&server, &["u1", "u2", "u3", "u4", "u5"]);
    let session = server.connect();
    let before = server.catalog().query_request_count();

    let rows = session
        .query(&[Column::UserName])
        .limit(3)
        .page_size(2)
        .all()
        .expect("Failed to run query");
    assert_eq!(rows.len(), 3);
    assert_eq!(server.catalog().query_request_count() - before, 2);

    let first = session
        .query(&[Column::UserName])
        .filter(Column::UserName, FilterOp::Like, "u%")
        .first()
        .expect("Failed to run query")
        .expect("Expected a row");
    assert_eq!(first.get(Column::UserName), Some("u1"));
}

#[test]
fn test_filters_combine_as_conjunction() {
    let server = TestServer::start().expect("Failed to start test server");
    let session = server.connect();
    let users = session.users();
    users.create("bobby", "rodsuser", None).expect("Failed to create bobby");
    users.create("bobcat", "rodsadmin", None).expect("Failed to create bobcat");
    users.create("alice", "rodsadmin", None).expect("Failed to create alice");

    let rows = session
        .query(&[Column::UserName, Column::UserType])
        .filter(Column::UserName, FilterOp::Like, "bob%")
        .filter_eq(Column::UserType, "rodsadmin")
        .all()
        .expect("Failed to run query");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get(Column::UserName), Some("bobcat"));
    assert_eq!(rows[0].columns(), &[Column::UserName, Column::UserType]);

    // Ids compare numerically
    let rows = session
        .query(&[Column::UserName])
        .filter(Column::UserId, FilterOp::Gt, "2")
        .all()
        .expect("Failed to run query");
    let names: Vec<&str> = rows.iter().filter_map(|r| r.get(Column::UserName)).collect();
    assert_eq!(names, vec!["bobcat", "alice"]);
}

#[test]
fn test_projection_is_distinct() {
    let server = TestServer::start().expect("Failed to start test server");
    seed_users(&server, &["u1", "u2"]);
    let session = server.connect();

    let types: Vec<String> = session
        .query(&[Column::UserType])
        .all()
        .expect("Failed to run query")
        .iter()
        .map(|r| r[Column::UserType].to_string())
        .collect();
    assert_eq!(types, vec!["rodsadmin", "rodsuser"]);
}

#[test]
fn test_one_reports_cardinality_errors() {
    let server = TestServer::start().expect("Failed to start test server");
    seed_users(&server, &["u1", "u2"]);
    let session = server.connect();

    let err = session
        .query(&[Column::UserName])
        .filter_eq(Column::UserName, "nobody")
        .one()
        .unwrap_err();
    assert!(matches!(err, AdminError::NoResultFound));

    let err = session
        .query(&[Column::UserName])
        .filter_eq(Column::UserType, "rodsuser")
        .one()
        .unwrap_err();
    assert!(matches!(err, AdminError::MultipleResultsFound));

    let row = session
        .query(&[Column::UserName, Column::UserZone])
        .filter_eq(Column::UserName, "u2")
        .one()
        .expect("Failed to fetch one row");
    assert_eq!(row.get(Column::UserZone), Some(HOME_ZONE));
}

#[test]
fn test_invalid_query_sends_no_request() {
    let server = TestServer::start().expect("Failed to start test server");
    let session = server.connect();

    assert!(matches!(
        session.query(&[]).all(),
        Err(AdminError::InvalidArgument(_))
    ));
    assert!(matches!(
        session.query(&[Column::UserName]).page_size(0).all(),
        Err(AdminError::InvalidArgument(_))
    ));
    assert_eq!(server.catalog().query_request_count(), 0);
}

#[test]
fn test_failure_mid_iteration_ends_the_result_set() {
    let server = TestServer::start().expect("Failed to start test server");
    seed_users(&server, &["u1", "u2", "u3"]);
    let session = server.connect();

    let mut rows = session
        .query(&[Column::UserName])
        .page_size(2)
        .execute()
        .expect("Failed to execute query");
    assert!(rows.next().expect("first row").is_ok());
    assert!(rows.next().expect("second row").is_ok());

    server
        .catalog()
        .inject_failure(status::CAT_INSUFFICIENT_PRIVILEGE_LEVEL, "revoked");
    match rows.next() {
        Some(Err(AdminError::Remote(remote))) => {
            assert_eq!(remote.code(), Some(status::CAT_INSUFFICIENT_PRIVILEGE_LEVEL));
        }
        other => panic!("Expected remote failure, got: {other:?}"),
    }
    assert!(rows.next().is_none());
}

#[test]
fn test_membership_columns() {
    let server = TestServer::start().expect("Failed to start test server");
    let session = server.connect();
    session.users().create("alice", "rodsuser", None).expect("Failed to create alice");
    session.groups().create("staff", None).expect("Failed to create staff");
    session.groups().create("admins", None).expect("Failed to create admins");
    session.groups().add_member("staff", "alice", None).expect("Failed to add to staff");
    session.groups().add_member("admins", "alice", None).expect("Failed to add to admins");

    let groups: Vec<String> = session
        .query(&[Column::UserGroupName])
        .filter_eq(Column::UserName, "alice")
        .all()
        .expect("Failed to run query")
        .iter()
        .map(|r| r[Column::UserGroupName].to_string())
        .collect();
    assert_eq!(groups.len(), 2);
    assert!(groups.contains(&"staff".to_string()));
    assert!(groups.contains(&"admins".to_string()));
}
