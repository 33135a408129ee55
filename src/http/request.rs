//! Request parsing, validation and rewriting.
//!
//! # Responsibilities
//! - Force `Connection: close` on the request head
//! - Extract method, path, version and the `Host` header
//! - Reject anything that is not `GET <path> HTTP/1.0|1.1` with a host
//! - Derive the connect-to hostname and port from the `Host` value
//!
//! # Design Decisions
//! - Headers are matched at line starts only, so `X-Forwarded-Host:` never
//!   passes for `Host:` and `Proxy-Connection:` is left alone
//! - The request is rewritten by building a new buffer, never in place
//! - The head stays raw bytes; header values outside the request line and
//!   Host may carry any octets and are forwarded untouched

use thiserror::Error;

use crate::http::response::ErrorStatus;
use crate::net::io::{find, END_OF_HEADERS};

/// Header line the proxy forces on every forwarded request.
pub const CONNECTION_CLOSE: &str = "Connection: close";

const CRLF: &[u8] = b"\r\n";
const HOST_HEADER: &[u8] = b"\r\nHost: ";
const CONNECTION_HEADERS: [&[u8]; 2] = [b"\r\nConnection:", b"\r\nconnection:"];

/// Port used when the `Host` header carries none.
pub const DEFAULT_PORT: u16 = 80;

/// Reasons a request is refused before it reaches a destination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request line or Host value is not valid UTF-8")]
    NotUtf8,

    #[error("request has no end-of-headers marker")]
    MissingEndOfHeaders,

    #[error("request has no Host header")]
    MissingHost,

    #[error("unsupported HTTP version")]
    UnsupportedVersion,

    #[error("malformed request line")]
    MalformedRequestLine,

    #[error("method {0} is not supported")]
    MethodNotSupported(String),

    #[error("invalid port in host {0:?}")]
    InvalidPort(String),
}

impl RequestError {
    /// Status sent to the client for this error.
    pub fn status(&self) -> ErrorStatus {
        match self {
            RequestError::MissingHost
            | RequestError::UnsupportedVersion
            | RequestError::MalformedRequestLine
            | RequestError::NotUtf8 => ErrorStatus::BadRequest,
            RequestError::MethodNotSupported(_) => ErrorStatus::NotSupported,
            RequestError::MissingEndOfHeaders | RequestError::InvalidPort(_) => {
                ErrorStatus::InternalServerError
            }
        }
    }
}

/// The parts of a validated request the proxy acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHead<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub version: &'a str,
    /// Raw `Host` header value, exactly as the client sent it.
    pub host: &'a str,
}

/// Return a copy of `request` whose head carries `Connection: close`.
///
/// An existing `Connection:`/`connection:` header line is replaced; otherwise the
/// header is appended right before the end-of-headers marker. All other bytes,
/// including anything after the marker, are copied unchanged.
pub fn ensure_connection_close(request: &[u8]) -> Result<Vec<u8>, RequestError> {
    let end = find(request, END_OF_HEADERS).ok_or(RequestError::MissingEndOfHeaders)?;
    let head = &request[..end];

    let existing = CONNECTION_HEADERS
        .iter()
        .find_map(|pattern| find(head, pattern));

    let mut rewritten = Vec::with_capacity(request.len() + CONNECTION_CLOSE.len() + CRLF.len());
    match existing {
        Some(at) => {
            let line_start = at + CRLF.len();
            let line_end = find(&head[line_start..], CRLF)
                .map(|offset| line_start + offset)
                .unwrap_or(end);
            rewritten.extend_from_slice(&request[..line_start]);
            rewritten.extend_from_slice(CONNECTION_CLOSE.as_bytes());
            rewritten.extend_from_slice(&request[line_end..]);
        }
        None => {
            rewritten.extend_from_slice(&request[..end]);
            rewritten.extend_from_slice(CRLF);
            rewritten.extend_from_slice(CONNECTION_CLOSE.as_bytes());
            rewritten.extend_from_slice(&request[end..]);
        }
    }

    Ok(rewritten)
}

/// Raw value of the `Host: ` header, if present.
pub fn host_header(request: &[u8]) -> Option<&[u8]> {
    let start = find(request, HOST_HEADER)? + HOST_HEADER.len();
    let len = find(&request[start..], CRLF)?;
    Some(&request[start..start + len])
}

/// Validate `request` and split out the fields the proxy needs.
///
/// Only the request line and the Host value have to be UTF-8; other header
/// bytes are never inspected. Host, version and request-line failures map to
/// 400; a method other than `GET` maps to 501.
pub fn validate(request: &[u8]) -> Result<RequestHead<'_>, RequestError> {
    let host = host_header(request).ok_or(RequestError::MissingHost)?;
    let host = std::str::from_utf8(host).map_err(|_| RequestError::NotUtf8)?;

    let request_line = find(request, CRLF)
        .map(|end| &request[..end])
        .ok_or(RequestError::MalformedRequestLine)?;
    let request_line = std::str::from_utf8(request_line).map_err(|_| RequestError::NotUtf8)?;

    let mut tokens = request_line.split_whitespace();
    let (method, path, version) = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(method), Some(path), Some(version)) => (method, path, version),
        _ => return Err(RequestError::MalformedRequestLine),
    };

    if !is_supported_version(version) {
        return Err(RequestError::UnsupportedVersion);
    }
    if tokens.next().is_some() {
        return Err(RequestError::MalformedRequestLine);
    }
    if method != "GET" {
        return Err(RequestError::MethodNotSupported(method.to_string()));
    }

    Ok(RequestHead {
        method,
        path,
        version,
        host,
    })
}

fn is_supported_version(token: &str) -> bool {
    matches!(token.strip_prefix("HTTP/"), Some("1.0") | Some("1.1"))
}

/// Hostname to connect to: `http://` and `www.` prefixes and any `:port` removed.
pub fn clean_host(host: &str) -> &str {
    let host = host.strip_prefix("http://").unwrap_or(host);
    let host = host.strip_prefix("www.").unwrap_or(host);
    match host.find(':') {
        Some(colon) => &host[..colon],
        None => host,
    }
}

/// Destination port carried by a `Host` value.
///
/// No colon, or no digits after it, means port 80. Digits outside `[0, 65535]`
/// are an error. A leading `http://` is skipped so its colon is not taken for a port.
pub fn parse_port(host: &str) -> Result<u16, RequestError> {
    let authority = host.strip_prefix("http://").unwrap_or(host);
    let Some(colon) = authority.find(':') else {
        return Ok(DEFAULT_PORT);
    };

    let rest = authority[colon + 1..].trim_start();
    let (negative, unsigned) = match rest.as_bytes().first() {
        Some(b'-') => (true, &rest[1..]),
        Some(b'+') => (false, &rest[1..]),
        _ => (false, rest),
    };

    let digits_len = unsigned
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits_len == 0 {
        return Ok(DEFAULT_PORT);
    }

    let invalid = || RequestError::InvalidPort(host.to_string());
    let value: u64 = unsigned[..digits_len].parse().map_err(|_| invalid())?;

    if negative && value != 0 {
        return Err(invalid());
    }
    u16::try_from(value).map_err(|_| invalid())
}
