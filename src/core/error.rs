use axum::http::StatusCode;
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Syntax,
    Schema,
    UnknownField,
    TrailingData,
    EmptyBody,
    TooLarge,
    Encode,
    Io,
}

impl ErrorKind {
    /// Fallback text used when an error carries no message of its own.
    pub fn describe(self) -> &'static str {
        match self {
            ErrorKind::Internal => "internal error",
            ErrorKind::Usage => "invalid usage",
            ErrorKind::Syntax => "malformed JSON",
            ErrorKind::Schema => "JSON does not match the expected shape",
            ErrorKind::UnknownField => "body contains unknown field",
            ErrorKind::TrailingData => "body must contain a single JSON object",
            ErrorKind::EmptyBody => "body must not be empty",
            ErrorKind::TooLarge => "request body too large",
            ErrorKind::Encode => "payload cannot be encoded as JSON",
            ErrorKind::Io => "i/o error",
        }
    }

    pub fn is_decode(self) -> bool {
        matches!(
            self,
            ErrorKind::Syntax
                | ErrorKind::Schema
                | ErrorKind::UnknownField
                | ErrorKind::TrailingData
                | ErrorKind::EmptyBody
                | ErrorKind::TooLarge
        )
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    field: Option<String>,
    line: Option<usize>,
    column: Option<usize>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            field: None,
            line: None,
            column: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Dotted path of the offending field, when the failure names one.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_position(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Status a handler would typically answer with for this failure.
    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::Usage
            | ErrorKind::Syntax
            | ErrorKind::Schema
            | ErrorKind::UnknownField
            | ErrorKind::TrailingData
            | ErrorKind::EmptyBody => StatusCode::BAD_REQUEST,
            ErrorKind::Encode | ErrorKind::Io | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None => f.write_str(self.kind.describe()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Syntax => 3,
        ErrorKind::Schema => 4,
        ErrorKind::UnknownField => 5,
        ErrorKind::TrailingData => 6,
        ErrorKind::EmptyBody => 7,
        ErrorKind::TooLarge => 8,
        ErrorKind::Encode => 9,
        ErrorKind::Io => 10,
    }
}
