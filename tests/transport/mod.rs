//! Integration tests for the HTTP transport

use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Duration;

use catalog_admin::{HttpConnection, Session, SessionConfig};

use crate::common::*;

#[test]
fn test_api_key_is_sent_as_bearer_token() {
    let server = TestServer::start_with_api_key("secret").expect("Failed to start test server");

    println!("Test: a session with the right key works, others are rejected");

    let session = Session::connect(server.session_config().with_api_key("secret"))
        .expect("Failed to connect with API key");
    session.users().create("alice", "rodsuser", None).expect("Failed to create alice");
    println!("✅ Authorized session can administer users");

    let err = Session::connect(server.session_config().with_api_key("wrong")).unwrap_err();
    assert!(
        matches!(err, AdminError::Remote(RemoteError::Unauthorized)),
        "Expected Unauthorized, got: {err:?}"
    );
    let err = Session::connect(server.session_config()).unwrap_err();
    assert!(matches!(err, AdminError::Remote(RemoteError::Unauthorized)));
    println!("✅ Missing or wrong keys are rejected at connect time");
}

#[test]
fn test_unreachable_catalog_is_transport_error() {
    // Reserve a port, then free it so nothing is listening
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
        listener.local_addr().expect("Failed to read address").port()
    };
    let config = SessionConfig::new("127.0.0.1", port, ADMIN_USER, HOME_ZONE)
        .with_request_timeout(Duration::from_secs(5));

    let err = Session::connect(config).unwrap_err();
    match err {
        AdminError::Remote(RemoteError::Transport(_)) => {}
        other => panic!("Expected transport error, got: {other:?}"),
    }
}

#[test]
fn test_non_catalog_reply_is_protocol_error() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let port = listener.local_addr().expect("Failed to read address").port();
    let responder = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("Failed to accept");
        let mut buffer = [0u8; 4096];
        let _ = stream.read(&mut buffer);
        let _ = stream.write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        );
    });

    let config = SessionConfig::new("127.0.0.1", port, ADMIN_USER, HOME_ZONE);
    match HttpConnection::open(&config) {
        Err(RemoteError::Protocol(message)) => {
            assert!(message.contains("undecodable"), "Unexpected message: {message}");
        }
        Err(other) => panic!("Expected protocol error, got: {other:?}"),
        Ok(_) => panic!("Expected protocol error, got a connection"),
    }
    responder.join().expect("Responder thread panicked");
}

#[test]
fn test_catalog_status_crosses_the_wire() {
    let server = TestServer::start().expect("Failed to start test server");
    let session = server.connect();

    server.catalog().inject_failure(status::CAT_INVALID_ARGUMENT, "bad query");
    let err = session.query(&[Column::UserName]).all().unwrap_err();
    match err {
        AdminError::Remote(RemoteError::Status { code, message }) => {
            assert_eq!(code, status::CAT_INVALID_ARGUMENT);
            assert_eq!(message, "bad query");
        }
        other => panic!("Expected remote status, got: {other:?}"),
    }
}

#[test]
fn test_session_home_zone_may_differ_from_server_zone() {
    let server = TestServer::start().expect("Failed to start test server");
    server.catalog().add_zone(FOREIGN_ZONE);

    let mut config = server.session_config();
    config.zone = FOREIGN_ZONE.to_string();
    let session = Session::connect(config).expect("Failed to connect");

    session.users().create("carol", "rodsuser", None).expect("Failed to create carol");
    let carol = session.users().get("carol", None).expect("Failed to get carol");
    assert_eq!(carol.zone(), FOREIGN_ZONE);
}
