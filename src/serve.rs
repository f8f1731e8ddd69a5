//! Purpose: Provide the demo HTTP/JSON server for `readrespond serve`.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum-based loopback server whose handlers decode and answer through the shared `Codec`.
//! Invariants: Every response body, errors included, is a JSON envelope written by the codec.
//! Invariants: Loopback-only unless explicitly allowed.
//! Notes: Bodies are buffered up to one byte past the limit so the codec reports oversize itself.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use readrespond::api::{
    Codec, CodecConfig, Envelope, Error, ErrorKind, ResponseRecorder, ResponseWriter,
};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub allow_non_loopback: bool,
    pub max_body_bytes: u64,
}

#[derive(Clone)]
struct AppState {
    codec: Codec,
}

#[derive(Debug, Deserialize)]
struct EchoRequest {
    name: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EchoReply {
    greeting: String,
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SumRequest {
    values: Vec<i64>,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let codec = Codec::new(CodecConfig::default().with_max_body_bytes(config.max_body_bytes));
    let state = Arc::new(AppState { codec });

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v0/echo", post(echo))
        .route("/v0/sum", post(sum))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, max_body_bytes = config.max_body_bytes, "listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("server failed")
                .with_source(err)
        })
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires --allow-non-loopback"));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero"));
    }

    if config.max_body_bytes >= usize::MAX as u64 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes exceeds platform limits"));
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut signal) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            signal.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    let response = ResponseRecorder::new();
    respond(&state.codec, response, StatusCode::OK, json!({ "ok": true }))
}

async fn echo(State(state): State<Arc<AppState>>, body: Body) -> Response {
    let mut response = ResponseRecorder::new();
    let request: EchoRequest = match read_request(&state.codec, &mut response, body).await {
        Ok(request) => request,
        Err(err) => return error_response(&state.codec, response, err),
    };
    if request.name.trim().is_empty() {
        let err = Error::new(ErrorKind::Schema).with_message("name must not be blank");
        return error_response(&state.codec, response, err);
    }

    let reply = EchoReply {
        greeting: format!("hello, {}", request.name),
        tags: request.tags,
    };
    respond(&state.codec, response, StatusCode::OK, reply)
}

async fn sum(State(state): State<Arc<AppState>>, body: Body) -> Response {
    let mut response = ResponseRecorder::new();
    let request: SumRequest = match read_request(&state.codec, &mut response, body).await {
        Ok(request) => request,
        Err(err) => return error_response(&state.codec, response, err),
    };

    match checked_total(&request.values) {
        Ok(total) => respond(
            &state.codec,
            response,
            StatusCode::OK,
            json!({ "count": request.values.len(), "total": total }),
        ),
        Err(err) => error_response_with_status(
            &state.codec,
            response,
            err,
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
    }
}

fn checked_total(values: &[i64]) -> Result<i64, Error> {
    values
        .iter()
        .try_fold(0i64, |acc, value| acc.checked_add(*value))
        .ok_or_else(|| {
            Error::new(ErrorKind::Schema).with_message("sum overflows a 64-bit integer")
        })
}

async fn not_found(State(state): State<Arc<AppState>>) -> Response {
    let err = Error::new(ErrorKind::Usage).with_message("no such route");
    error_response_with_status(
        &state.codec,
        ResponseRecorder::new(),
        err,
        StatusCode::NOT_FOUND,
    )
}

async fn read_request<T>(
    codec: &Codec,
    response: &mut ResponseRecorder,
    body: Body,
) -> Result<T, Error>
where
    T: serde::de::DeserializeOwned,
{
    let cap = codec
        .max_body_bytes()
        .and_then(|limit| usize::try_from(limit.saturating_add(1)).ok())
        .unwrap_or(usize::MAX);
    let bytes = collect_capped(body, cap).await?;
    codec.read_json(response, bytes.as_slice())
}

/// Buffer at most `cap` bytes of the body; anything past that is left unread.
async fn collect_capped(body: Body, cap: usize) -> Result<Vec<u8>, Error> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read request body")
                .with_source(err)
        })?;
        let room = cap - buf.len();
        buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if buf.len() == cap {
            break;
        }
    }
    Ok(buf)
}

fn api_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("readrespond-version", HeaderValue::from_static("0"));
    headers
}

fn respond<T: Serialize>(
    codec: &Codec,
    mut response: ResponseRecorder,
    status: StatusCode,
    data: T,
) -> Response {
    let envelope = Envelope::success(data);
    if let Err(err) = codec.write_json(&mut response, status, &envelope, Some(&api_headers())) {
        tracing::error!(kind = ?err.kind(), "failed to encode response: {err}");
    }
    response.into_response()
}

fn error_response(codec: &Codec, response: ResponseRecorder, err: Error) -> Response {
    let status = err.status();
    error_response_with_status(codec, response, err, status)
}

fn error_response_with_status(
    codec: &Codec,
    mut response: ResponseRecorder,
    err: Error,
    status: StatusCode,
) -> Response {
    tracing::warn!(kind = ?err.kind(), status = status.as_u16(), "request rejected: {err}");
    response.headers_mut().extend(api_headers());
    if let Err(write_err) = codec.write_json_error(&mut response, &err, Some(status)) {
        tracing::error!(kind = ?write_err.kind(), "failed to encode error response: {write_err}");
    }
    response.into_response()
}
