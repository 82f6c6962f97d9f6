//! RESP2 parser and encoder
//!
//! Parsing walks a byte cursor over the read buffer and only consumes bytes once
//! a complete frame is available, so it can be called again after every read.

use super::types::{DecodedCommand, RespError, RespValue};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::ops::Range;

const CRLF: &[u8] = b"\r\n";

/// Largest element count accepted in a request array
pub const MAX_REQUEST_ELEMENTS: usize = 10;

/// Largest bulk string accepted in a request (512 MiB, as Redis does)
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Longest `*<count>` / `$<len>` header line accepted before its CRLF
const MAX_HEADER_LINE: usize = 64;

/// RESP2 Parser
pub struct RespParser;

impl RespParser {
    /// Parse a RESP value from a buffer
    ///
    /// Returns Ok(Some(value)) if a complete value was parsed,
    /// Ok(None) if more data is needed,
    /// Err(e) if parsing failed
    pub fn parse(buf: &mut BytesMut) -> Result<Option<RespValue>, RespError> {
        match Self::value_at(buf, 0)? {
            Some((value, end)) => {
                buf.advance(end);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Parse a request: an array of 1..=10 bulk strings
    ///
    /// The consumed bytes are kept verbatim in `DecodedCommand::raw`, and the
    /// name and arguments are slices of that same buffer.
    pub fn parse_command(buf: &mut BytesMut) -> Result<Option<DecodedCommand>, RespError> {
        if buf.is_empty() {
            return Ok(None);
        }

        if buf[0] != b'*' {
            return Err(RespError::InvalidProtocol(format!(
                "expected '*', got '{}'",
                buf[0].escape_ascii()
            )));
        }

        let Some((count, mut pos)) = Self::integer_line(buf, 1)? else {
            return Ok(None);
        };

        if count < 1 {
            return Err(RespError::InvalidProtocol(format!(
                "invalid request element count: {}",
                count
            )));
        }
        if count > MAX_REQUEST_ELEMENTS as i64 {
            return Err(RespError::TooManyElements {
                count,
                max: MAX_REQUEST_ELEMENTS,
            });
        }

        let mut spans = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match Self::bulk_span(buf, pos)? {
                Some((span, end)) => {
                    spans.push(span);
                    pos = end;
                }
                None => return Ok(None),
            }
        }

        // Every element is there: take the whole frame out of the buffer
        let raw = buf.split_to(pos).freeze();
        let Some((name, args)) = spans.split_first() else {
            return Err(RespError::InvalidProtocol("empty request".to_string()));
        };

        Ok(Some(DecodedCommand {
            name: String::from_utf8_lossy(&raw[name.clone()]).into_owned(),
            args: args.iter().map(|span| raw.slice(span.clone())).collect(),
            raw,
        }))
    }

    /// Parse a snapshot transfer: `$<len>\r\n` followed by exactly `len` raw bytes
    ///
    /// Unlike a bulk string there is no trailing CRLF. The length is bounded
    /// like a bulk string's.
    pub fn parse_snapshot(buf: &mut BytesMut) -> Result<Option<Bytes>, RespError> {
        if buf.is_empty() {
            return Ok(None);
        }

        if buf[0] != b'$' {
            return Err(RespError::InvalidProtocol(format!(
                "expected snapshot '$', got '{}'",
                buf[0].escape_ascii()
            )));
        }

        let Some((len, start)) = Self::integer_line(buf, 1)? else {
            return Ok(None);
        };
        if len < 0 || len as u64 > MAX_BULK_LEN as u64 {
            return Err(RespError::InvalidProtocol(format!(
                "invalid snapshot length: {}",
                len
            )));
        }

        let len = len as usize;
        if buf.len() < start + len {
            return Ok(None);
        }

        buf.advance(start);
        Ok(Some(buf.split_to(len).freeze()))
    }

    /// Parse any supported value starting at `pos`, returning it and the end offset
    fn value_at(buf: &[u8], pos: usize) -> Result<Option<(RespValue, usize)>, RespError> {
        if pos >= buf.len() {
            return Ok(None);
        }

        match buf[pos] {
            b'+' => Ok(Self::text_line(buf, pos + 1)?
                .map(|(s, end)| (RespValue::SimpleString(s), end))),
            b'-' => Ok(Self::text_line(buf, pos + 1)?.map(|(s, end)| (RespValue::Error(s), end))),
            b'$' => {
                let Some((len, start)) = Self::integer_line(buf, pos + 1)? else {
                    return Ok(None);
                };
                if len == -1 {
                    return Ok(Some((RespValue::Null, start)));
                }
                match Self::payload(buf, start, len)? {
                    Some(end) => Ok(Some((
                        RespValue::BulkString(Bytes::copy_from_slice(&buf[start..end])),
                        end + 2,
                    ))),
                    None => Ok(None),
                }
            }
            b'*' => {
                let Some((count, mut cursor)) = Self::integer_line(buf, pos + 1)? else {
                    return Ok(None);
                };
                if count == -1 {
                    return Ok(Some((RespValue::Null, cursor)));
                }
                if count < 0 {
                    return Err(RespError::InvalidProtocol(format!(
                        "invalid array count: {}",
                        count
                    )));
                }

                let mut elements = Vec::new();
                for _ in 0..count {
                    match Self::value_at(buf, cursor)? {
                        Some((value, end)) => {
                            elements.push(value);
                            cursor = end;
                        }
                        None => return Ok(None),
                    }
                }
                Ok(Some((RespValue::Array(elements), cursor)))
            }
            other => Err(RespError::InvalidProtocol(format!(
                "unknown type prefix: '{}'",
                other.escape_ascii()
            ))),
        }
    }

    /// Locate a bulk string element at `pos`: the payload range and the offset after it
    fn bulk_span(buf: &[u8], pos: usize) -> Result<Option<(Range<usize>, usize)>, RespError> {
        if pos >= buf.len() {
            return Ok(None);
        }

        if buf[pos] != b'$' {
            return Err(RespError::InvalidProtocol(format!(
                "expected '$', got '{}'",
                buf[pos].escape_ascii()
            )));
        }

        let Some((len, start)) = Self::integer_line(buf, pos + 1)? else {
            return Ok(None);
        };

        Ok(Self::payload(buf, start, len)?.map(|end| (start..end, end + 2)))
    }

    /// Check a `len`-byte payload at `start` followed by CRLF, returning the payload end
    fn payload(buf: &[u8], start: usize, len: i64) -> Result<Option<usize>, RespError> {
        if len < 0 || len as usize > MAX_BULK_LEN {
            return Err(RespError::InvalidProtocol(format!(
                "invalid bulk string length: {}",
                len
            )));
        }

        let end = start + len as usize;
        if buf.len() < end + 2 {
            return Ok(None);
        }

        if &buf[end..end + 2] != CRLF {
            return Err(RespError::InvalidProtocol(
                "bulk string length does not match its payload".to_string(),
            ));
        }

        Ok(Some(end))
    }

    /// Read a decimal header line starting at `start`
    fn integer_line(buf: &[u8], start: usize) -> Result<Option<(i64, usize)>, RespError> {
        let Some((line, end)) = Self::find_line(buf, start) else {
            if buf.len().saturating_sub(start) > MAX_HEADER_LINE {
                return Err(RespError::LineTooLong);
            }
            return Ok(None);
        };

        if line.len() > MAX_HEADER_LINE {
            return Err(RespError::LineTooLong);
        }

        let s = std::str::from_utf8(line).map_err(|_| RespError::InvalidUtf8)?;
        let value = s
            .parse::<i64>()
            .map_err(|_| RespError::InvalidInteger(s.to_string()))?;

        Ok(Some((value, end)))
    }

    /// Read a UTF-8 status line starting at `start`
    fn text_line(buf: &[u8], start: usize) -> Result<Option<(String, usize)>, RespError> {
        match Self::find_line(buf, start) {
            Some((line, end)) => {
                let s = String::from_utf8(line.to_vec()).map_err(|_| RespError::InvalidUtf8)?;
                Ok(Some((s, end)))
            }
            None => Ok(None),
        }
    }

    /// Scan for the next CRLF at or after `start`; returns the line (without CRLF)
    /// and the offset just past the CRLF
    fn find_line(buf: &[u8], start: usize) -> Option<(&[u8], usize)> {
        let window = buf.get(start..)?;
        window
            .windows(2)
            .position(|w| w == CRLF)
            .map(|i| (&window[..i], start + i + 2))
    }
}

/// RESP2 Encoder
pub struct RespEncoder;

impl RespEncoder {
    /// Encode a RESP value to bytes
    pub fn encode(value: &RespValue) -> Bytes {
        let mut buf = BytesMut::new();
        Self::encode_to(&mut buf, value);
        buf.freeze()
    }

    /// Encode a RESP value into an existing buffer
    pub fn encode_to(buf: &mut BytesMut, value: &RespValue) {
        match value {
            RespValue::SimpleString(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(CRLF);
            }
            RespValue::Error(e) => {
                buf.put_u8(b'-');
                buf.put_slice(e.as_bytes());
                buf.put_slice(CRLF);
            }
            RespValue::BulkString(bytes) => {
                buf.put_u8(b'$');
                buf.put_slice(bytes.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                buf.put_slice(bytes);
                buf.put_slice(CRLF);
            }
            RespValue::Null => {
                buf.put_slice(b"$-1\r\n");
            }
            RespValue::Array(arr) => {
                buf.put_u8(b'*');
                buf.put_slice(arr.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                for elem in arr {
                    Self::encode_to(buf, elem);
                }
            }
            RespValue::Raw(bytes) => {
                buf.put_slice(bytes);
            }
        }
    }

    /// Frame a snapshot payload: `$<len>\r\n<payload>`, no trailing CRLF
    pub fn encode_snapshot(buf: &mut BytesMut, payload: &[u8]) {
        buf.put_u8(b'$');
        buf.put_slice(payload.len().to_string().as_bytes());
        buf.put_slice(CRLF);
        buf.put_slice(payload);
    }
}
