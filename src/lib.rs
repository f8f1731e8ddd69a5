//! Purpose: Library crate backing the `readrespond` binary and downstream HTTP handlers.
//! Exports: `api` (codec, envelope, response seam, errors) and its re-exports at the root.
//! Role: Decode one strict JSON value per request body; encode JSON envelopes per response.
//! Invariants: The library never logs and never answers a request on its own.
//! Invariants: A `Codec` is immutable after construction and safe to share across exchanges.
pub mod api;
mod core;

pub use api::{
    Codec, CodecConfig, Envelope, Error, ErrorKind, JSON_CONTENT_TYPE, ResponseRecorder,
    ResponseWriter,
};
