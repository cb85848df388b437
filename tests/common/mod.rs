//! Common test utilities and harness for catalog-admin integration tests
//!
//! This module provides:
//! - TestServer: serves a fresh in-memory catalog over HTTP on an ephemeral port
//! - Session helpers for the HTTP and in-process paths

#![allow(dead_code)]

use std::net::TcpListener;
use std::thread::JoinHandle;
use tokio::sync::oneshot;

use catalog_admin::{MemoryCatalog, Session, SessionConfig, create_http_router};

pub use catalog_admin::error::status;
pub use catalog_admin::{
    AdminError, Column, EntityKind, FilterOp, RemoteError, UserAttribute, UserType,
};

pub const HOME_ZONE: &str = "tempZone";
pub const FOREIGN_ZONE: &str = "otherZone";
pub const ADMIN_USER: &str = "rods";

/// Test server running the router on its own runtime thread, so blocking
/// sessions can talk to it from the test thread
pub struct TestServer {
    port: u16,
    catalog: MemoryCatalog,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server for a new catalog whose home zone is `tempZone`
    pub fn start() -> Result<Self, Box<dyn std::error::Error>> {
        Self::start_with(MemoryCatalog::new(HOME_ZONE), None)
    }

    /// Start a server that requires `api_key` as a bearer token
    pub fn start_with_api_key(api_key: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Self::start_with(MemoryCatalog::new(HOME_ZONE), Some(api_key.to_string()))
    }

    pub fn start_with(
        catalog: MemoryCatalog,
        api_key: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        // Bound before the thread starts, so early connections queue in the backlog
        let listener = TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();

        let router = create_http_router(catalog.clone(), api_key);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name(format!("test-server-{port}"))
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("Failed to build test server runtime");
                runtime.block_on(async move {
                    let listener = tokio::net::TcpListener::from_std(listener)
                        .expect("Failed to adopt test listener");
                    let server = axum::serve(listener, router.into_make_service());
                    tokio::select! {
                        result = server => {
                            if let Err(e) = result {
                                eprintln!("Server error: {}", e);
                            }
                        }
                        _ = shutdown_rx => {
                            // Shutdown requested
                        }
                    }
                });
            })?;

        Ok(Self {
            port,
            catalog,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The catalog behind the server, for direct state inspection
    pub fn catalog(&self) -> &MemoryCatalog {
        &self.catalog
    }

    /// Session settings pointing at this server as the administrator
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new("127.0.0.1", self.port, ADMIN_USER, HOME_ZONE)
    }

    pub fn connect(&self) -> Session {
        Session::connect(self.session_config()).expect("Failed to connect to test server")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Session over the in-process catalog, without a network
pub fn memory_session(catalog: &MemoryCatalog) -> Session {
    Session::new(
        SessionConfig::new("localhost", 0, ADMIN_USER, catalog.home_zone()),
        Box::new(catalog.clone()),
    )
}

/// Current type of a user, read through the query interface
pub fn user_type_of(session: &Session, name: &str, zone: &str) -> String {
    let row = session
        .query(&[Column::UserType])
        .filter_eq(Column::UserName, name)
        .filter_eq(Column::UserZone, zone)
        .one()
        .expect("Failed to query user type");
    row[Column::UserType].to_string()
}
