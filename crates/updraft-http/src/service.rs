//! The upload HTTP service implementing hyper's `Service` trait.
//!
//! [`UploadHttpService`] puts an [`UploadRouter`] on the wire:
//!
//! 1. Health check interception (`GET /health`, `GET /_health`)
//! 2. CORS preflight requests (`OPTIONS`)
//! 3. Path matching against the configured upload path
//! 4. Request body collection, capped at [`UploadHttpConfig::max_body_size`]
//! 5. [`UploadRouter::handle`]
//! 6. Common response headers (`x-request-id`, `Server`, CORS)
//!
//! Fatal issuer errors are logged and answered with an opaque 500.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, error, info, warn};
use updraft_core::{IssueResponse, UploadRouter};
use updraft_model::{ErrorBody, ErrorKind, UploadError};
use uuid::Uuid;

use crate::body::UploadResponseBody;

/// Configuration for the upload HTTP service.
#[derive(Debug, Clone)]
pub struct UploadHttpConfig {
    /// Path the signed-URL endpoint is mounted on.
    pub upload_path: String,
    /// Whether to answer CORS preflights and add CORS headers.
    pub cors_enabled: bool,
    /// Largest accepted request body in bytes.
    pub max_body_size: usize,
}

/// Default request body cap: 64 KiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

impl Default for UploadHttpConfig {
    fn default() -> Self {
        Self {
            upload_path: "/api/upload".to_owned(),
            cors_enabled: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// The upload HTTP service.
#[derive(Clone)]
pub struct UploadHttpService {
    router: Arc<UploadRouter>,
    config: Arc<UploadHttpConfig>,
}

impl fmt::Debug for UploadHttpService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadHttpService")
            .field("router", &self.router)
            .field("config", &self.config)
            .finish()
    }
}

impl UploadHttpService {
    /// Create a service around `router`.
    #[must_use]
    pub fn new(router: UploadRouter, config: UploadHttpConfig) -> Self {
        Self::from_shared(Arc::new(router), config)
    }

    /// Create a service from a shared router.
    #[must_use]
    pub fn from_shared(router: Arc<UploadRouter>, config: UploadHttpConfig) -> Self {
        Self {
            router,
            config: Arc::new(config),
        }
    }

    /// Process one request with any body type.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<UploadResponseBody>
    where
        B: http_body::Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = Uuid::new_v4().to_string();
        let response = process_request(req, &self.router, &self.config, &request_id).await;
        add_common_headers(response, &request_id, self.config.cors_enabled)
    }
}

impl Service<http::Request<Incoming>> for UploadHttpService {
    type Response = http::Response<UploadResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

async fn process_request<B>(
    req: http::Request<B>,
    router: &UploadRouter,
    config: &UploadHttpConfig,
    request_id: &str,
) -> http::Response<UploadResponseBody>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing upload request");

    if is_health_check(&method, uri.path()) {
        return health_check_response();
    }

    if config.cors_enabled && method == http::Method::OPTIONS {
        return cors_preflight_response();
    }

    if uri.path() != config.upload_path {
        debug!(path = uri.path(), request_id, "no handler for path");
        return json_response(
            http::StatusCode::NOT_FOUND,
            &ErrorBody::from(UploadError::new(ErrorKind::InvalidRequest, "Not found.")),
        );
    }

    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, config.max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.is::<LengthLimitError>() => {
            warn!(limit = config.max_body_size, request_id, "request body too large");
            return json_response(
                http::StatusCode::PAYLOAD_TOO_LARGE,
                &ErrorBody::from(UploadError::new(
                    ErrorKind::InvalidRequest,
                    "Request body too large.",
                )),
            );
        }
        Err(err) => {
            warn!(error = %err, request_id, "failed to collect request body");
            return internal_error_response();
        }
    };

    match router.handle(&parts.method, &parts.headers, &body).await {
        Ok(response) => {
            let status = response.status();
            if let IssueResponse::Signed(signed) = &response {
                info!(files = signed.urls.len(), request_id, "issued signed URLs");
            }
            match response.to_json() {
                Ok(json) => raw_json_response(status, json),
                Err(err) => {
                    error!(error = %err, request_id, "failed to encode response");
                    internal_error_response()
                }
            }
        }
        Err(err) => {
            error!(error = %err, request_id, "upload request failed");
            internal_error_response()
        }
    }
}

/// Check if the request is a health check.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/health" || path == "/_health")
}

fn health_check_response() -> http::Response<UploadResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(UploadResponseBody::from_string(
            r#"{"status":"running","service":"updraft"}"#,
        ))
        .expect("static health response should be valid")
}

fn cors_preflight_response() -> http::Response<UploadResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "*, Authorization, Content-Type")
        .header("Access-Control-Max-Age", "86400")
        .body(UploadResponseBody::empty())
        .expect("static CORS response should be valid")
}

fn internal_error_response() -> http::Response<UploadResponseBody> {
    json_response(
        http::StatusCode::INTERNAL_SERVER_ERROR,
        &ErrorBody::from(UploadError::unknown("Internal server error.")),
    )
}

fn json_response(
    status: http::StatusCode,
    body: &ErrorBody,
) -> http::Response<UploadResponseBody> {
    // An `ErrorBody` is two strings; encoding cannot fail.
    let json = serde_json::to_vec(body).unwrap_or_default();
    raw_json_response(status, json)
}

fn raw_json_response(status: http::StatusCode, json: Vec<u8>) -> http::Response<UploadResponseBody> {
    http::Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(UploadResponseBody::from_bytes(json))
        .expect("JSON response with static headers should be valid")
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<UploadResponseBody>,
    request_id: &str,
    cors_enabled: bool,
) -> http::Response<UploadResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::header::HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", hv);
    }
    headers.insert("Server", http::header::HeaderValue::from_static("Updraft"));

    if cors_enabled {
        headers.insert(
            "Access-Control-Allow-Origin",
            http::header::HeaderValue::from_static("*"),
        );
        headers.insert(
            "Access-Control-Expose-Headers",
            http::header::HeaderValue::from_static("x-request-id"),
        );
    }

    response
}
