//! Purpose: Describe the outbound half of an exchange and provide an in-memory implementation.
//! Exports: `ResponseWriter`, `ResponseRecorder` (an axum `IntoResponse`).
//! Role: Seam between the codec and whatever server owns the connection.
//! Invariants: `write_header` commits status and headers once; later calls are ignored.
//! Invariants: Writing body bytes before `write_header` commits `200 OK`.
//! Invariants: Header edits after commit never reach the committed head.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::io::{self, Write};

/// Response side of an exchange as the codec sees it.
///
/// The body is the `io::Write` half; the codec only writes to it after
/// `write_header` has been called.
pub trait ResponseWriter: Write {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn write_header(&mut self, status: StatusCode);

    /// Called when the request body crossed the configured byte ceiling.
    fn request_too_large(&mut self) {}
}

#[derive(Debug, Default)]
pub struct ResponseRecorder {
    headers: HeaderMap,
    head: Option<(StatusCode, HeaderMap)>,
    body: Vec<u8>,
    close_after_reply: bool,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed status, or `None` while the head is still open.
    pub fn status(&self) -> Option<StatusCode> {
        self.head.as_ref().map(|(status, _)| *status)
    }

    /// Committed headers; falls back to the live map before commit.
    pub fn headers(&self) -> &HeaderMap {
        match &self.head {
            Some((_, headers)) => headers,
            None => &self.headers,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn close_after_reply(&self) -> bool {
        self.close_after_reply
    }

    pub fn is_committed(&self) -> bool {
        self.head.is_some()
    }

    /// Consume the recorder into status, headers and body.
    ///
    /// An uncommitted recorder yields `200 OK` with the live headers, the same
    /// as a handler that returns without writing anything.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        let (status, mut headers) = self.head.unwrap_or((StatusCode::OK, self.headers));
        if self.close_after_reply {
            headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        }
        (status, headers, self.body)
    }
}

impl Write for ResponseRecorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.head.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseWriter for ResponseRecorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.head.is_some() {
            return;
        }
        self.head = Some((status, self.headers.clone()));
    }

    fn request_too_large(&mut self) {
        self.close_after_reply = true;
    }
}

impl IntoResponse for ResponseRecorder {
    fn into_response(self) -> Response {
        let (status, headers, body) = self.into_parts();
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}
