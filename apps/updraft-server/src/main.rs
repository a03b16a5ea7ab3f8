//! Updraft Server - presigned upload URLs for S3-compatible stores.
//!
//! This binary mounts an [`UploadRouter`] with the demo routes from
//! [`routes`] on `updraft-http` and serves it until interrupted. Clients
//! post the files they intend to upload and receive presigned URLs for the
//! configured store.
//!
//! # Usage
//!
//! ```text
//! STORE_VENDOR=minio MINIO_ENDPOINT=http://127.0.0.1:9000 updraft-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:3000` | Bind address |
//! | `UPLOAD_PATH` | `/api/upload` | Signed-URL endpoint path |
//! | `UPLOAD_BUCKET` | `uploads` | Default bucket |
//! | `STORE_VENDOR` | `aws` | Store vendor whose credentials are read |
//! | `CORS_ENABLED` | `true` | Answer preflights and add CORS headers |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use updraft_auth::{EnvCredentialResolver, StoreVendor};
use updraft_core::{ServerConfig, UploadRouter};
use updraft_http::{UploadHttpConfig, UploadHttpService};

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the router from the application [`ServerConfig`].
fn build_router(config: &ServerConfig) -> Result<UploadRouter> {
    let vendor: StoreVendor = config
        .store_vendor
        .parse()
        .with_context(|| format!("invalid store vendor: {}", config.store_vendor))?;
    let credentials = Arc::new(EnvCredentialResolver::new(vendor));

    Ok(routes::register(UploadRouter::builder(&config.bucket_name, credentials)).build())
}

/// Build the [`UploadHttpConfig`] from the application [`ServerConfig`].
fn build_http_config(config: &ServerConfig) -> UploadHttpConfig {
    UploadHttpConfig {
        upload_path: config.upload_path.clone(),
        cors_enabled: config.cors_enabled,
        ..UploadHttpConfig::default()
    }
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: UploadHttpService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        upload_path = %config.upload_path,
        bucket = %config.bucket_name,
        store_vendor = %config.store_vendor,
        version = VERSION,
        "starting Updraft server",
    );

    let router = build_router(&config)?;
    let service = UploadHttpService::new(router, build_http_config(&config));

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
