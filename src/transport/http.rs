use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::channel::Connection;
use crate::config::SessionConfig;
use crate::error::RemoteError;
use crate::query::{QueryPage, QueryRequest};
use crate::types::{AdminAction, AdminRequest, HealthResponse, StatusResponse, TargetKind};

/// Blocking JSON-over-HTTP connection to a catalog server
pub struct HttpConnection {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    zone: String,
}

impl HttpConnection {
    /// Build the client and probe `/api/health`
    pub fn open(config: &SessionConfig) -> Result<Self, RemoteError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let connection = Self {
            client: builder.build()?,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
            zone: config.zone.clone(),
        };

        let probe = connection
            .authorize(connection.client.get(connection.url("/api/health")))
            .send()?;
        let health: HealthResponse = connection.parse(probe)?;
        if health.zone != connection.zone {
            info!(
                "Catalog at {} serves zone '{}', session home zone is '{}'",
                connection.base_url, health.zone, connection.zone
            );
        }
        info!("Connected to catalog at {} ({})", connection.base_url, health.status);
        Ok(connection)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Decode a successful body as `T`, or turn an error reply into a `RemoteError`
    fn parse<T: DeserializeOwned>(&self, response: Response) -> Result<T, RemoteError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(RemoteError::Unauthorized);
        }
        let body = response.text()?;
        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|e| RemoteError::Protocol(format!("undecodable reply: {e}")));
        }
        match serde_json::from_str::<StatusResponse>(&body) {
            Ok(reply) => Err(RemoteError::status(reply.status, reply.message)),
            Err(_) => Err(RemoteError::Protocol(format!("HTTP {status}: {body}"))),
        }
    }

    /// Post a request whose reply is a `StatusResponse`
    fn post_for_status<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<(), RemoteError> {
        let response = self.authorize(self.client.post(self.url(path)).json(body)).send()?;
        let reply: StatusResponse = self.parse(response)?;
        if reply.success {
            Ok(())
        } else {
            Err(RemoteError::status(reply.status, reply.message))
        }
    }
}

impl Connection for HttpConnection {
    fn dispatch_admin_request(
        &self,
        action: AdminAction,
        target: TargetKind,
        args: &[String],
    ) -> Result<(), RemoteError> {
        let request = AdminRequest {
            action,
            target,
            args: args.to_vec(),
        };
        let start = Instant::now();
        let result = self.post_for_status("/api/admin", &request);
        debug!(
            "POST /api/admin {} {} completed in {}ms",
            action,
            target,
            start.elapsed().as_millis()
        );
        if let Err(e) = &result {
            warn!("Admin request {} {} rejected: {}", action, target, e);
        }
        result
    }

    fn execute_query(&self, request: &QueryRequest) -> Result<QueryPage, RemoteError> {
        let start = Instant::now();
        let response = self
            .authorize(self.client.post(self.url("/api/query")).json(request))
            .send()?;
        let page: QueryPage = self.parse(response)?;
        debug!(
            "POST /api/query returned {} rows in {}ms (more: {})",
            page.rows.len(),
            start.elapsed().as_millis(),
            page.continuation.is_some()
        );
        Ok(page)
    }

    fn disconnect(&self) -> Result<(), RemoteError> {
        debug!("POST /api/disconnect to {}", self.base_url);
        self.post_for_status("/api/disconnect", &serde_json::json!({}))
    }
}
