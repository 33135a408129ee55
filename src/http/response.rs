//! Client-visible error responses.
//!
//! # Responsibilities
//! - Map each refusal to its status line, title and description
//! - Render a complete `Connection: close` response with an HTML body
//! - Write it to the client socket

use std::io::{self, Write};

use chrono::{DateTime, Utc};

use crate::net::io::write_fully;

/// Value of the `Server` header on error responses.
pub const SERVER_NAME: &str = "webserver/1.0";

/// Error statuses the proxy can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    BadRequest,
    Forbidden,
    NotFound,
    InternalServerError,
    NotSupported,
}

impl ErrorStatus {
    /// Numeric status code.
    pub fn code(self) -> u16 {
        match self {
            ErrorStatus::BadRequest => 400,
            ErrorStatus::Forbidden => 403,
            ErrorStatus::NotFound => 404,
            ErrorStatus::InternalServerError => 500,
            ErrorStatus::NotSupported => 501,
        }
    }

    /// Status line text, also used as the page title.
    pub fn title(self) -> &'static str {
        match self {
            ErrorStatus::BadRequest => "400 Bad Request",
            ErrorStatus::Forbidden => "403 Forbidden",
            ErrorStatus::NotFound => "404 Not Found",
            ErrorStatus::InternalServerError => "500 Internal Server Error",
            ErrorStatus::NotSupported => "501 Not supported",
        }
    }

    /// One-line description shown in the page body.
    pub fn description(self) -> &'static str {
        match self {
            ErrorStatus::BadRequest => "Bad Request.",
            ErrorStatus::Forbidden => "Access denied.",
            ErrorStatus::NotFound => "File not found.",
            ErrorStatus::InternalServerError => "Some server side error.",
            ErrorStatus::NotSupported => "Method is not supported.",
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Render the full response for `status`, dated `now`.
pub fn render_error(status: ErrorStatus, now: DateTime<Utc>) -> String {
    let title = status.title();
    let body = format!(
        "<HTML><HEAD><TITLE>{title}</TITLE></HEAD>\r\n<BODY><H4>{title}</H4>\r\n{}\r\n</BODY></HTML>",
        status.description()
    );

    format!(
        "HTTP/1.1 {title}\r\n\
         Server: {SERVER_NAME}\r\n\
         Date: {}\r\n\
         Content-Type: text/html\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n\
         {body}",
        now.format("%a, %d %b %Y %H:%M:%S GMT"),
        body.len()
    )
}

/// Write the error response for `status` to `client`.
pub fn send_error<W: Write + ?Sized>(client: &mut W, status: ErrorStatus) -> io::Result<()> {
    let response = render_error(status, Utc::now());
    write_fully(client, response.as_bytes())?;
    client.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_forbidden_page() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let response = render_error(ErrorStatus::Forbidden, now);

        let body = "<HTML><HEAD><TITLE>403 Forbidden</TITLE></HEAD>\r\n<BODY><H4>403 Forbidden</H4>\r\nAccess denied.\r\n</BODY></HTML>";
        let expected = format!(
            "HTTP/1.1 403 Forbidden\r\nServer: webserver/1.0\r\nDate: Tue, 05 Mar 2024 07:08:09 GMT\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        assert_eq!(response, expected);
    }

    #[test]
    fn content_length_matches_body() {
        for status in [
            ErrorStatus::BadRequest,
            ErrorStatus::Forbidden,
            ErrorStatus::NotFound,
            ErrorStatus::InternalServerError,
            ErrorStatus::NotSupported,
        ] {
            let response = render_error(status, Utc::now());
            let (head, body) = response.split_once("\r\n\r\n").unwrap();
            let length: usize = head
                .lines()
                .find_map(|line| line.strip_prefix("Content-Length: "))
                .unwrap()
                .parse()
                .unwrap();
            assert_eq!(length, body.len(), "{status}");
            assert!(head.starts_with(&format!("HTTP/1.1 {}", status.code())));
        }
    }

    #[test]
    fn send_error_writes_whole_response() {
        let mut out = Vec::new();
        send_error(&mut out, ErrorStatus::NotSupported).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 501 Not supported\r\n"));
        assert!(text.ends_with("Method is not supported.\r\n</BODY></HTML>"));
    }
}
