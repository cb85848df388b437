//! Integration tests for session lifecycle

use crate::common::*;

#[test]
fn test_cleanup_disconnects_once() {
    let server = TestServer::start().expect("Failed to start test server");
    let mut session = server.connect();
    assert!(!session.is_closed());

    session.cleanup().expect("Failed to clean up session");
    session.cleanup().expect("Second cleanup should be a no-op");
    assert!(session.is_closed());
    assert_eq!(server.catalog().disconnect_count(), 1);

    // Dropping an already closed session does not disconnect again
    drop(session);
    assert_eq!(server.catalog().disconnect_count(), 1);
}

#[test]
fn test_drop_disconnects() {
    let server = TestServer::start().expect("Failed to start test server");
    {
        let session = server.connect();
        session.users().create("alice", "rodsuser", None).expect("Failed to create alice");
    }
    assert_eq!(server.catalog().disconnect_count(), 1);
}

#[test]
fn test_closed_session_refuses_requests() {
    let server = TestServer::start().expect("Failed to start test server");
    let mut session = server.connect();
    session.cleanup().expect("Failed to clean up session");
    let admin_before = server.catalog().admin_request_count();

    let err = session.users().create("alice", "rodsuser", None).unwrap_err();
    assert!(matches!(err, AdminError::Remote(RemoteError::Closed)));

    let err = session.users().get("alice", None).unwrap_err();
    assert!(matches!(err, AdminError::Remote(RemoteError::Closed)));

    assert_eq!(server.catalog().admin_request_count(), admin_before);
    assert_eq!(server.catalog().query_request_count(), 0);
}

#[test]
fn test_session_identity() {
    let catalog = catalog_admin::MemoryCatalog::new(HOME_ZONE);
    let first = memory_session(&catalog);
    let second = memory_session(&catalog);

    assert_eq!(first.zone(), HOME_ZONE);
    assert_eq!(first.user_name(), ADMIN_USER);
    assert_ne!(first.id(), second.id());

    // Both sessions see the same catalog
    first.users().create("alice", "rodsuser", None).expect("Failed to create alice");
    assert!(second.users().get("alice", None).is_ok());
}
