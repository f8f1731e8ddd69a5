//! Purpose: Read one strict JSON value from a request body and write JSON envelopes back.
//! Exports: `Codec`, `CodecConfig`, `JSON_CONTENT_TYPE`.
//! Role: The single exchange codec handlers share; immutable once built.
//! Invariants: The target type's fields are the allow-list; unknown input fields fail decode.
//! Invariants: Anything but whitespace after the first JSON value fails decode.
//! Invariants: Content-Type is set after caller headers, so callers cannot override it.
//! Notes: Decode failures never write a response; the caller owns the error path.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::error::Error as StdError;
use std::io::{BufReader, Read, Write};

use crate::core::envelope::Envelope;
use crate::core::error::{Error, ErrorKind};
use crate::core::limit::BodyReader;
use crate::core::sink::ResponseWriter;

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Request body ceiling in bytes; `None` or `0` disables it.
    pub max_body_bytes: Option<u64>,
}

impl CodecConfig {
    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = Some(max_body_bytes);
        self
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Codec {
    max_body_bytes: Option<u64>,
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            max_body_bytes: config.max_body_bytes.filter(|limit| *limit > 0),
        }
    }

    pub fn max_body_bytes(&self) -> Option<u64> {
        self.max_body_bytes
    }

    /// Decode exactly one JSON value from `body`.
    ///
    /// `w` is only touched when the body crosses the byte ceiling, in which
    /// case it is told via [`ResponseWriter::request_too_large`]. The body is
    /// consumed and dropped before this returns.
    ///
    /// Unknown fields are caught wherever serde visits keys directly. Keys
    /// that serde buffers instead (`#[serde(flatten)]` members, internally
    /// tagged enums) are not seen, so those targets accept extra fields
    /// unless they carry `#[serde(deny_unknown_fields)]` themselves, which
    /// works for tagged enums but not alongside `flatten`.
    pub fn read_json<T, R, W>(&self, w: &mut W, body: R) -> Result<T, Error>
    where
        T: DeserializeOwned,
        R: Read,
        W: ResponseWriter + ?Sized,
    {
        let mut reader = BodyReader::new(body, self.max_body_bytes);
        let result = decode_single(&mut reader);
        if reader.exceeded() {
            w.request_too_large();
        }
        result
    }

    /// Like [`Codec::read_json`], but stores into an existing target.
    ///
    /// The target is left untouched when decoding fails.
    pub fn read_json_into<T, R, W>(&self, w: &mut W, body: R, target: &mut T) -> Result<(), Error>
    where
        T: DeserializeOwned,
        R: Read,
        W: ResponseWriter + ?Sized,
    {
        *target = self.read_json(w, body)?;
        Ok(())
    }

    /// Commit `status` and stream `payload` as JSON.
    ///
    /// Each key in `headers` replaces whatever the response already holds for
    /// it. The status is on the wire before serialization starts, so an
    /// encode failure is reported to the caller but cannot change it.
    pub fn write_json<W, T>(
        &self,
        w: &mut W,
        status: StatusCode,
        payload: &T,
        headers: Option<&HeaderMap>,
    ) -> Result<(), Error>
    where
        W: ResponseWriter + ?Sized,
        T: Serialize + ?Sized,
    {
        if let Some(headers) = headers {
            let target = w.headers_mut();
            for key in headers.keys() {
                target.remove(key);
                for value in headers.get_all(key) {
                    target.append(key.clone(), value.clone());
                }
            }
        }
        w.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        w.write_header(status);

        serde_json::to_writer(&mut *w, payload).map_err(encode_error)?;
        w.write_all(b"\n").map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write response body")
                .with_source(err)
        })?;
        Ok(())
    }

    /// Write `{"error":true,"message":<err>}` with `status`, defaulting to 400.
    pub fn write_json_error<W, E>(
        &self,
        w: &mut W,
        err: &E,
        status: Option<StatusCode>,
    ) -> Result<(), Error>
    where
        W: ResponseWriter + ?Sized,
        E: StdError + ?Sized,
    {
        let envelope: Envelope<()> = Envelope::failure(err.to_string());
        self.write_json(
            w,
            status.unwrap_or(StatusCode::BAD_REQUEST),
            &envelope,
            None,
        )
    }
}

fn decode_single<T, R>(reader: &mut BodyReader<R>) -> Result<T, Error>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut unknown: Option<String> = None;
    let outcome = {
        let mut de = serde_json::Deserializer::from_reader(BufReader::new(&mut *reader));
        let first = serde_ignored::deserialize(&mut de, |path| {
            unknown.get_or_insert_with(|| path.to_string());
        });
        first.map(|value: T| (value, de.end()))
    };

    let (value, rest) = match (outcome, unknown) {
        (Ok(_), Some(field)) => return Err(unknown_field(field)),
        // A stray field often surfaces first as "missing field"; name the real culprit.
        (Err(err), Some(field)) if err.classify() == Category::Data => {
            return Err(unknown_field(field).with_source(err));
        }
        (Err(err), _) => return Err(decode_error(err, reader)),
        (Ok(parts), None) => parts,
    };
    if let Err(err) = rest {
        if err.is_io() {
            return Err(decode_error(err, reader));
        }
        return Err(Error::new(ErrorKind::TrailingData)
            .with_message(ErrorKind::TrailingData.describe())
            .with_position(err.line(), err.column())
            .with_source(err));
    }
    Ok(value)
}

fn decode_error<R: Read>(err: serde_json::Error, reader: &BodyReader<R>) -> Error {
    if reader.exceeded() {
        let limit = reader.limit().unwrap_or_default();
        return Error::new(ErrorKind::TooLarge)
            .with_message(format!("request body must not exceed {limit} bytes"))
            .with_source(err);
    }

    let kind = match err.classify() {
        Category::Io => ErrorKind::Io,
        Category::Syntax => ErrorKind::Syntax,
        Category::Eof if reader.is_blank() => ErrorKind::EmptyBody,
        Category::Eof => ErrorKind::Syntax,
        Category::Data if err.to_string().starts_with("unknown field") => ErrorKind::UnknownField,
        Category::Data => ErrorKind::Schema,
    };
    let message = match kind {
        ErrorKind::EmptyBody => kind.describe().to_string(),
        _ => err.to_string(),
    };
    Error::new(kind)
        .with_message(message)
        .with_position(err.line(), err.column())
        .with_source(err)
}

fn unknown_field(field: String) -> Error {
    Error::new(ErrorKind::UnknownField)
        .with_message(format!("unknown field \"{field}\""))
        .with_field(field)
}

fn encode_error(err: serde_json::Error) -> Error {
    if err.is_io() {
        return Error::new(ErrorKind::Io)
            .with_message("failed to write response body")
            .with_source(err);
    }
    Error::new(ErrorKind::Encode)
        .with_message(err.to_string())
        .with_source(err)
}
