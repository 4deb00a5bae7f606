//! HTTP event endpoint binding the Caldera engine to its controller.
//!
//! `POST /events` receives a provisioning request document, drives it
//! through the engine, and performs the controller-facing side effect: a
//! terminal outcome is PUT to the request's callback URL, a suspension is
//! dispatched to the delay workflow. `GET /permissions` serves the
//! aggregated least-privilege manifest and `GET /health` a liveness probe.
//!
//! The [`TestServer`] helper starts the endpoint on a random port for
//! integration testing.

use caldera_core::{callback_document, Disposition, Engine, ProvisioningRequest, Status};
use caldera_remote::callback;
use caldera_remote::{ApiError, Waiter};
use std::io::Read;
use std::sync::Arc;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, error, info};

/// What happened to a processed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processed {
    /// Terminal outcome delivered to the callback URL.
    Responded(Status),
    /// Continuation dispatched to the delay workflow.
    Scheduled,
}

/// Binds the engine to the controller: one instance serves all requests.
pub struct EventHandler {
    engine: Engine,
    waiter: Waiter,
}

impl EventHandler {
    pub fn new(engine: Engine, waiter: Waiter) -> Self {
        Self { engine, waiter }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Drive one request to its disposition and perform the side effect.
    ///
    /// The engine always yields exactly one disposition; only delivering it
    /// can fail, and such failures are reported to the caller for logging,
    /// never retried.
    pub fn process(&self, request: &ProvisioningRequest) -> Result<Processed, ApiError> {
        match self.engine.handle(request) {
            Disposition::Done(outcome) => {
                let document = callback_document(request, &outcome);
                callback::deliver(&request.response_url, &document)?;
                Ok(Processed::Responded(outcome.status))
            }
            Disposition::Suspended(next) => {
                let input = serde_json::to_value(&next)
                    .map_err(|e| ApiError::Serialization(e.to_string()))?;
                self.waiter.dispatch(&input)?;
                Ok(Processed::Scheduled)
            }
        }
    }
}

fn respond_err(req: tiny_http::Request, code: u16, msg: &str) {
    let _ = req.respond(Response::from_string(msg).with_status_code(StatusCode(code)));
}

fn respond_json(req: tiny_http::Request, json: impl Into<Vec<u8>>) {
    let header = Header::from_bytes("Content-Type", "application/json").expect("valid header");
    let _ = req.respond(Response::from_data(json.into()).with_header(header));
}

fn read_body(req: &mut tiny_http::Request) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    if req.as_reader().read_to_end(&mut body).is_ok() {
        Some(body)
    } else {
        None
    }
}

fn handle_event(handler: &EventHandler, mut req: tiny_http::Request) {
    let Some(body) = read_body(&mut req) else {
        respond_err(req, 500, "read error");
        return;
    };
    let request: ProvisioningRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            respond_err(req, 400, &format!("malformed request document: {e}"));
            return;
        }
    };

    match handler.process(&request) {
        Ok(Processed::Responded(status)) => {
            info!("responded {status} for {}", request.logical_resource_id);
            respond_json(req, format!(r#"{{"result":"responded","status":"{status}"}}"#));
        }
        Ok(Processed::Scheduled) => {
            info!("scheduled continuation for {}", request.logical_resource_id);
            respond_json(req, r#"{"result":"scheduled"}"#.as_bytes().to_vec());
        }
        Err(e) => {
            error!("delivery failed for {}: {e}", request.logical_resource_id);
            respond_err(req, 502, &format!("delivery failed: {e}"));
        }
    }
}

/// Handle a single HTTP request, dispatching to the appropriate route.
pub fn handle_request(handler: &EventHandler, req: tiny_http::Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    debug!("{method} {url}");

    if url == "/events" && method == Method::Post {
        handle_event(handler, req);
    } else if url == "/permissions" && method == Method::Get {
        let permissions = handler.engine.catalog().required_permissions();
        let json = serde_json::to_string(&permissions).unwrap_or_else(|_| "[]".to_owned());
        respond_json(req, json.into_bytes());
    } else if url == "/health" && method == Method::Get {
        let _ = req.respond(Response::from_string(r#"{"status":"ok"}"#));
    } else {
        respond_err(req, 404, "not found");
    }
}

/// Start the server loop, blocking the current thread.
pub fn run_server(handler: &Arc<EventHandler>, addr: &str) {
    let server = Server::http(addr).expect("failed to bind HTTP server");
    for request in server.incoming_requests() {
        handle_request(handler, request);
    }
}

/// A test helper that starts a caldera-server on a random port in a
/// background thread. Drop the `TestServer` to stop accepting requests.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    _server: Arc<Server>,
    _handle: std::thread::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server on `127.0.0.1:0` (random port).
    pub fn start(handler: EventHandler) -> Self {
        let server =
            Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let url = format!("http://127.0.0.1:{port}");

        let handler = Arc::new(handler);
        let srv = Arc::clone(&server);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                handle_request(&handler, request);
            }
        });

        Self {
            url,
            port,
            _server: server,
            _handle: handle,
        }
    }
}
