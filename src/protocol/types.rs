//! RESP value types
//!
//! Defines the reply values, the decoded request and the codec errors.

use bytes::Bytes;
use std::fmt;

/// RESP value types
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Simple strings: +OK\r\n
    SimpleString(String),

    /// Errors: -Error message\r\n
    Error(String),

    /// Bulk strings: $6\r\nfoobar\r\n
    BulkString(Bytes),

    /// Null bulk string: $-1\r\n
    Null,

    /// Arrays: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
    Array(Vec<RespValue>),

    /// Pre-framed bytes, written to the wire verbatim
    Raw(Bytes),
}

impl RespValue {
    /// Create a simple string
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Create an error
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    /// Create a bulk string from bytes
    pub fn bulk_string(b: impl Into<Bytes>) -> Self {
        RespValue::BulkString(b.into())
    }

    /// Create a null value
    pub fn null() -> Self {
        RespValue::Null
    }

    /// Build a request: an array of bulk strings
    pub fn command<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        RespValue::Array(parts.into_iter().map(|p| RespValue::BulkString(p.into())).collect())
    }

    /// Check if this is an error reply
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "SimpleString({})", s),
            RespValue::Error(e) => write!(f, "Error({})", e),
            RespValue::BulkString(b) => write!(f, "BulkString({} bytes)", b.len()),
            RespValue::Null => write!(f, "Null"),
            RespValue::Array(arr) => write!(f, "Array({} elements)", arr.len()),
            RespValue::Raw(b) => write!(f, "Raw({} bytes)", b.len()),
        }
    }
}

/// A request decoded from the wire
///
/// `raw` holds the exact bytes the request occupied in the stream, which is
/// what gets forwarded to followers.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCommand {
    /// First element of the request array
    pub name: String,

    /// Remaining elements, in order
    pub args: Vec<Bytes>,

    /// The request exactly as received
    pub raw: Bytes,
}

impl fmt::Display for DecodedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} args, {} bytes)", self.name, self.args.len(), self.raw.len())
    }
}

/// RESP parsing errors
#[derive(Debug, Clone, PartialEq)]
pub enum RespError {
    /// Invalid protocol format
    InvalidProtocol(String),

    /// Invalid UTF-8 in a header or status line
    InvalidUtf8,

    /// Length or count is not a decimal integer
    InvalidInteger(String),

    /// Request array declares more elements than accepted
    TooManyElements { count: i64, max: usize },

    /// Header line exceeds the accepted length without a CRLF
    LineTooLong,
}

impl fmt::Display for RespError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespError::InvalidProtocol(msg) => write!(f, "invalid protocol: {}", msg),
            RespError::InvalidUtf8 => write!(f, "invalid UTF-8"),
            RespError::InvalidInteger(s) => write!(f, "invalid integer '{}'", s),
            RespError::TooManyElements { count, max } => {
                write!(f, "request has {} elements, at most {} are accepted", count, max)
            }
            RespError::LineTooLong => write!(f, "header line too long"),
        }
    }
}

impl std::error::Error for RespError {}
