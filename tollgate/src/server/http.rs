//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo. Each connection gets its own task; the
//! request body is collected (up to the handler's limit) before the handler
//! runs, so handlers work on plain `Request<Bytes>`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::routes::http::error_response;
use crate::types::ServiceError;

/// One service's request router
#[async_trait::async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Service name for logs and health output
    fn name(&self) -> &'static str;

    /// Largest request body accepted, in bytes
    fn body_limit(&self) -> usize;

    async fn handle(&self, addr: SocketAddr, req: Request<Bytes>) -> Response<Full<Bytes>>;
}

/// Bind a listener, mapping the error into the service error type
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServiceError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::Config(format!("failed to bind {addr}: {e}")))
}

/// Accept connections forever, serving each on its own task
pub async fn run<H: RequestHandler>(listener: TcpListener, handler: Arc<H>) -> Result<(), ServiceError> {
    let local = listener.local_addr()?;
    info!("{} listening on {}", handler.name(), local);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let handler = Arc::clone(&handler);
                        async move { handle_request(handler, addr, req).await }
                    });

                    // Dropping the connection drops the in-flight request future
                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Log the request, collect its body and hand it to the router
async fn handle_request<H: RequestHandler>(
    handler: Arc<H>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());

    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, handler.body_limit()).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(path = %parts.uri.path(), limit = handler.body_limit(), "Request body too large");
            return Ok(error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large",
            ));
        }
        Err(e) => {
            warn!(path = %parts.uri.path(), error = %e, "Failed to read request body");
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
            ));
        }
    };

    Ok(handler.handle(addr, Request::from_parts(parts, body)).await)
}
