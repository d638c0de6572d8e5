//! HTTP server for the action file
//!
//! Listens on `127.0.0.1:8080` by default (`server.addr`). Each connection is
//! served on its own task; the accept loop stops when the cancellation token
//! fires.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::store::{ActionStore, StoreError};

/// Validation result code for a document that loads cleanly
const VALIDATION_OK: u8 = 0;
const VALIDATION_FAILED: u8 = 1;

/// HTTP server exposing the action file
pub struct ActionsServer {
    store: Arc<ActionStore>,
    addr: SocketAddr,
}

impl ActionsServer {
    /// Creates a new `ActionsServer`.
    ///
    /// # Arguments
    /// * `store` - The action file to serve
    /// * `endpoint` - Address to bind, e.g. `"127.0.0.1:8080"`
    pub fn new(store: Arc<ActionStore>, endpoint: &str) -> anyhow::Result<Self> {
        let addr: SocketAddr = endpoint.parse()?;
        Ok(Self { store, addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Binds the configured address and serves until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        info!(
            addr = %listener.local_addr()?,
            file = %self.store.path().display(),
            "Actions server listening"
        );

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, peer) = result?;
                    let io = TokioIo::new(stream);
                    let store = Arc::clone(&self.store);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let store = Arc::clone(&store);
                            async move { Ok::<_, Infallible>(handle_request(req, &store).await) }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            error!(peer = %peer, error = %e, "HTTP connection error");
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    info!("Actions server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// Routing
// ============================================================================

/// Handles one request against `store`
///
/// Independent of the transport so it can be driven directly in tests.
pub async fn handle_request<B>(req: Request<B>, store: &ActionStore) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!(method = %method, path = %path, "Request");

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let response = match (segments.as_slice(), &method) {
        (["actions"], &Method::GET) => list_actions(store),
        (["actions"], &Method::POST) => match read_json(req).await {
            Ok(record) => add_action(store, record).await,
            Err(resp) => resp,
        },
        (["actions", idx], &Method::PUT) => match idx.parse::<usize>() {
            Ok(index) => match read_json(req).await {
                Ok(record) => update_action(store, index, record).await,
                Err(resp) => resp,
            },
            Err(_) => not_found(),
        },
        (["validate"], &Method::GET) => validate(store),
        (["actions"] | ["actions", _] | ["validate"], _) => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &error_body("method not allowed"),
        ),
        _ => not_found(),
    };

    debug!(method = %method, path = %path, status = response.status().as_u16(), "Response");
    response
}

fn list_actions(store: &ActionStore) -> Response<Full<Bytes>> {
    match store.load() {
        Ok(document) => json_response(StatusCode::OK, &document),
        Err(e) => store_failure(e),
    }
}

async fn add_action(store: &ActionStore, record: Value) -> Response<Full<Bytes>> {
    match store.append(record).await {
        Ok(index) => json_response(StatusCode::CREATED, &json!({"status": "ok", "index": index})),
        Err(e) => store_failure(e),
    }
}

async fn update_action(store: &ActionStore, index: usize, record: Value) -> Response<Full<Bytes>> {
    match store.replace(index, record).await {
        Ok(()) => json_response(StatusCode::OK, &json!({"status": "ok"})),
        Err(e) => store_failure(e),
    }
}

fn validate(store: &ActionStore) -> Response<Full<Bytes>> {
    match store.validate() {
        Ok(errors) => {
            let code = if errors.is_empty() {
                VALIDATION_OK
            } else {
                VALIDATION_FAILED
            };
            let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
            json_response(StatusCode::OK, &json!({"code": code, "errors": errors}))
        }
        Err(e) => store_failure(e),
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn read_json<B>(req: Request<B>) -> Result<Value, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return Err(json_response(
                StatusCode::BAD_REQUEST,
                &error_body("failed to read request body"),
            ));
        }
    };

    serde_json::from_slice(&bytes).map_err(|e| {
        json_response(
            StatusCode::BAD_REQUEST,
            &error_body(&format!("invalid JSON body: {e}")),
        )
    })
}

fn store_failure(err: StoreError) -> Response<Full<Bytes>> {
    match err {
        StoreError::OutOfRange { .. } => {
            json_response(StatusCode::NOT_FOUND, &error_body("index out of range"))
        }
        StoreError::Invalid(errors) => {
            let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
            json_response(
                StatusCode::BAD_REQUEST,
                &json!({"status": "error", "message": "validation failed", "errors": errors}),
            )
        }
        StoreError::Io(e) => {
            error!(error = %format!("{e:#}"), "Action file access failed");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &error_body("failed to access action file"),
            )
        }
    }
}

fn not_found() -> Response<Full<Bytes>> {
    json_response(StatusCode::NOT_FOUND, &error_body("not found"))
}

fn error_body(message: &str) -> Value {
    json!({"status": "error", "message": message})
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
