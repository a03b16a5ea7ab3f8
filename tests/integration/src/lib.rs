//! End-to-end tests for the Updraft server and client.
//!
//! Each test starts two in-process servers on ephemeral ports: a fake
//! S3-compatible store that records every request, and the upload server
//! signing URLs against it. The client then uploads through both, exactly
//! as it would against a real deployment.
//!
//! ```text
//! cargo test -p updraft-integration
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tracing::{debug, warn};
use updraft_auth::StoreCredentials;
use updraft_core::{MultipartConfig, RouteConfig, UploadRouter};
use updraft_http::{UploadHttpConfig, UploadHttpService};

use crate::hooks::AuthHooks;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Bucket every route uploads to.
pub const BUCKET: &str = "uploads";

/// Upload id the fake store assigns to every multipart session.
pub const UPLOAD_ID: &str = "upload-1";

/// Part size of the `video` route.
pub const PART_SIZE: u64 = 5;

/// One request received by the fake store.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    /// Request method.
    pub method: Method,
    /// Decoded-as-sent request path.
    pub path: String,
    /// Query pairs in wire order, values left encoded.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
}

impl StoreRequest {
    /// Whether the query carries `name`.
    #[must_use]
    pub fn has_param(&self, name: &str) -> bool {
        self.query.iter().any(|(k, _)| k == name)
    }

    /// Value of the query parameter `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `partNumber` parameter, if this is a part upload.
    #[must_use]
    pub fn part_number(&self) -> Option<u32> {
        self.param("partNumber").and_then(|v| v.parse().ok())
    }

    /// A request header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug)]
struct PutFailure {
    suffix: String,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct StoreState {
    requests: Mutex<Vec<StoreRequest>>,
    failing_part: Option<u32>,
    put_failures: Mutex<Vec<PutFailure>>,
    put_delays: Mutex<Vec<(String, Duration)>>,
    puts_in_flight: AtomicUsize,
    max_puts_in_flight: AtomicUsize,
}

impl StoreState {
    /// Consume one forced failure for this PUT, if any rule matches.
    fn take_put_failure(&self, request: &StoreRequest) -> bool {
        if request.method != Method::PUT {
            return false;
        }
        let mut failures = self.put_failures.lock();
        let Some(rule) = failures
            .iter_mut()
            .find(|rule| request.path.ends_with(&rule.suffix) && rule.remaining != Some(0))
        else {
            return false;
        };
        if let Some(remaining) = rule.remaining.as_mut() {
            *remaining -= 1;
        }
        true
    }

    fn put_delay(&self, request: &StoreRequest) -> Option<Duration> {
        if request.method != Method::PUT {
            return None;
        }
        self.put_delays
            .lock()
            .iter()
            .find(|(suffix, _)| request.path.ends_with(suffix.as_str()))
            .map(|(_, delay)| *delay)
    }
}

/// Counts a PUT as in flight until dropped.
struct InFlightPut(Arc<StoreState>);

impl InFlightPut {
    fn enter(state: &Arc<StoreState>) -> Self {
        let now = state.puts_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_puts_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(Arc::clone(state))
    }
}

impl Drop for InFlightPut {
    fn drop(&mut self) {
        self.0.puts_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A minimal S3-compatible store answering presigned requests.
///
/// Signatures are not checked; the upload server's signing is covered by
/// its own tests.
#[derive(Debug, Clone)]
pub struct FakeStore {
    addr: SocketAddr,
    state: Arc<StoreState>,
}

impl FakeStore {
    /// Start a store; part uploads of `failing_part` always answer 500.
    pub async fn start(failing_part: Option<u32>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(StoreState {
            failing_part,
            ..StoreState::default()
        });
        spawn_server(listener, StoreService(Arc::clone(&state)));
        Ok(Self { addr, state })
    }

    /// Endpoint origin, e.g. `http://127.0.0.1:PORT`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<StoreRequest> {
        self.state.requests.lock().clone()
    }

    /// Answer 500 to PUTs whose path ends with `suffix`, `times` times or
    /// forever when `None`.
    pub fn fail_puts(&self, suffix: &str, times: Option<usize>) {
        self.state.put_failures.lock().push(PutFailure {
            suffix: suffix.to_owned(),
            remaining: times,
        });
    }

    /// Hold PUTs whose path ends with `suffix` for `delay` before answering.
    /// An empty suffix matches every PUT.
    pub fn delay_puts(&self, suffix: &str, delay: Duration) {
        self.state.put_delays.lock().push((suffix.to_owned(), delay));
    }

    /// Most PUTs held open at the same time so far.
    #[must_use]
    pub fn max_puts_in_flight(&self) -> usize {
        self.state.max_puts_in_flight.load(Ordering::SeqCst)
    }

    /// Requests whose path ends with `suffix`.
    #[must_use]
    pub fn requests_for(&self, suffix: &str) -> Vec<StoreRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.ends_with(suffix))
            .collect()
    }

    /// Requests matching `method`.
    #[must_use]
    pub fn requests_with(&self, method: &Method) -> Vec<StoreRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == *method)
            .collect()
    }
}

#[derive(Debug, Clone)]
struct StoreService(Arc<StoreState>);

impl Service<Request<Incoming>> for StoreService {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let state = Arc::clone(&self.0);
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(error = %e, "fake store failed to read body");
                    return Ok(store_response(StatusCode::BAD_REQUEST, None, Bytes::new()));
                }
            };
            let request = StoreRequest {
                method: parts.method,
                path: parts.uri.path().to_owned(),
                query: parse_query(parts.uri.query().unwrap_or_default()),
                headers: parts.headers,
                body,
            };
            debug!(method = %request.method, path = %request.path, "fake store request");
            let _in_flight = (request.method == Method::PUT).then(|| InFlightPut::enter(&state));
            let delay = state.put_delay(&request);
            let response = if state.take_put_failure(&request) {
                internal_error()
            } else {
                answer(&request, state.failing_part)
            };
            state.requests.lock().push(request);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(response)
        })
    }
}

fn answer(request: &StoreRequest, failing_part: Option<u32>) -> Response<Full<Bytes>> {
    match request.method {
        Method::PUT => match request.part_number() {
            Some(n) if Some(n) == failing_part => internal_error(),
            Some(n) => store_response(StatusCode::OK, Some(format!("\"etag-{n}\"")), Bytes::new()),
            None => store_response(StatusCode::OK, Some("\"object-etag\"".to_owned()), Bytes::new()),
        },
        Method::POST if request.has_param("uploads") => store_response(
            StatusCode::OK,
            None,
            Bytes::from(format!(
                "<InitiateMultipartUploadResult><Bucket>{BUCKET}</Bucket>\
                 <Key>k</Key><UploadId>{UPLOAD_ID}</UploadId></InitiateMultipartUploadResult>"
            )),
        ),
        Method::POST if request.has_param("uploadId") => store_response(
            StatusCode::OK,
            None,
            Bytes::from_static(
                b"<CompleteMultipartUploadResult><ETag>\"done\"</ETag></CompleteMultipartUploadResult>",
            ),
        ),
        Method::DELETE => store_response(StatusCode::NO_CONTENT, None, Bytes::new()),
        _ => store_response(StatusCode::METHOD_NOT_ALLOWED, None, Bytes::new()),
    }
}

fn internal_error() -> Response<Full<Bytes>> {
    store_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        None,
        Bytes::from_static(b"<Error><Code>InternalError</Code></Error>"),
    )
}

fn store_response(status: StatusCode, etag: Option<String>, body: Bytes) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    if let Some(etag) = etag {
        builder = builder.header(http::header::ETAG, etag);
    }
    builder
        .body(Full::new(body))
        .expect("static store response should be valid")
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_owned(), v.to_owned()),
            None => (pair.to_owned(), String::new()),
        })
        .collect()
}

/// Serve `service` on `listener` until the runtime shuts down.
fn spawn_server<S, B>(listener: TcpListener, service: S)
where
    S: Service<Request<Incoming>, Response = Response<B>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };
            let svc = service.clone();
            tokio::spawn(async move {
                if let Err(e) = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), svc)
                    .await
                {
                    debug!(error = %e, "connection error");
                }
            });
        }
    });
}

/// A fake store plus an upload server signing against it.
#[derive(Debug)]
pub struct Harness {
    /// The store.
    pub store: FakeStore,
    /// Full URL of the signed-URL endpoint.
    pub api: String,
}

impl Harness {
    /// Start both servers with the test routes.
    ///
    /// - `text`: up to three `text/*` files of at most 1 KiB
    /// - `video`: one `video/*` file in parts of [`PART_SIZE`] bytes
    /// - `private`: requires an `authorization` header
    pub async fn start(failing_part: Option<u32>) -> anyhow::Result<Self> {
        init_tracing();
        let store = FakeStore::start(failing_part).await?;

        let credentials = StoreCredentials::builder()
            .access_key_id("test")
            .secret_access_key("test")
            .region("us-east-1")
            .endpoint(store.endpoint())
            .force_path_style(true)
            .build();

        let router = UploadRouter::builder(BUCKET, Arc::new(credentials))
            .route(
                "text",
                RouteConfig::builder()
                    .file_types(&["text/*"])
                    .multiple_files(true)
                    .max_file_size(1024)
                    .build(),
            )
            .route(
                "video",
                RouteConfig::builder()
                    .file_types(&["video/*"])
                    .multipart(MultipartConfig::builder().part_size(PART_SIZE).build())
                    .build(),
            )
            .route(
                "private",
                RouteConfig::builder().hooks(Arc::new(AuthHooks)).build(),
            )
            .build();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        spawn_server(
            listener,
            UploadHttpService::new(router, UploadHttpConfig::default()),
        );

        Ok(Self {
            store,
            api: format!("http://{addr}/api/upload"),
        })
    }
}

mod hooks {
    use async_trait::async_trait;
    use serde_json::Value;
    use updraft_core::{
        AfterSignedUrl, AfterSignedUrlContext, BeforeUpload, BeforeUploadContext, HookError,
        UploadHooks,
    };

    /// Rejects requests without an `authorization` header and echoes the
    /// caller back as server metadata.
    #[derive(Debug)]
    pub struct AuthHooks;

    #[async_trait]
    impl UploadHooks for AuthHooks {
        async fn before_upload(
            &self,
            ctx: BeforeUploadContext<'_>,
        ) -> Result<BeforeUpload, HookError> {
            let user = ctx
                .headers
                .get(http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| HookError::reject("Not logged in."))?;

            let mut before = BeforeUpload::default();
            before
                .metadata
                .insert("user".to_owned(), Value::String(user.to_owned()));
            Ok(before)
        }

        async fn after_signed_url(
            &self,
            ctx: AfterSignedUrlContext<'_>,
        ) -> Result<AfterSignedUrl, HookError> {
            Ok(AfterSignedUrl {
                metadata: ctx.metadata.clone(),
            })
        }
    }
}

mod test_multipart;
mod test_single;
