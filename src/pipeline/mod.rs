//! Per-connection request pipeline.
//!
//! # Data Flow
//! ```text
//! ConnectionContext (accepted socket + policy snapshot)
//!     → read head until CRLFCRLF (client read timeout)   ── 500 on failure
//!     → force Connection: close                          ── 500
//!     → validate request line and Host                   ── 400 / 501
//!     → resolve cleaned host                             ── 404
//!     → evaluate policy                                  ── 403
//!     → parse destination port                           ── 500
//!     → connect                                          ── silent close
//!     → forward head                                     ── 500
//!     → relay response until destination EOF             ── 500
//!     → context dropped, client socket closed
//! ```
//!
//! Each stage either hands its result to the next or produces exactly one
//! [`PipelineError`]; the error response is written by [`Pipeline::handle`].

mod error;

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

pub use error::PipelineError;

use crate::config::schema::TimeoutConfig;
use crate::filter::{FilterDecision, Resolver};
use crate::http::request::{self, clean_host, ensure_connection_close, parse_port};
use crate::http::response::send_error;
use crate::net::connection::ConnectionContext;
use crate::net::io::{read_until_headers_end, relay, write_fully};

/// How a connection finished when no error response was due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The destination's response was copied to the client.
    Relayed { bytes: u64 },
    /// The destination refused or timed out; the client gets no response.
    DestinationUnreachable,
}

/// Runs accepted connections from request head to closed socket.
///
/// Shared by every worker; holds no per-connection state.
#[derive(Debug)]
pub struct Pipeline {
    resolver: Arc<dyn Resolver>,
    timeouts: TimeoutConfig,
}

impl Pipeline {
    pub fn new(resolver: Arc<dyn Resolver>, timeouts: TimeoutConfig) -> Self {
        Self { resolver, timeouts }
    }

    /// Process one connection to completion and release it.
    ///
    /// Failures are answered with their error response on a best-effort basis.
    /// The result is returned for callers that want to inspect it; the
    /// connection is closed either way.
    pub fn handle(&self, mut ctx: ConnectionContext) -> Result<Outcome, PipelineError> {
        let span = tracing::debug_span!("connection", connection_id = %ctx.id());
        let _entered = span.enter();

        let result = self.process(&mut ctx);

        match &result {
            Ok(Outcome::Relayed { bytes }) => {
                tracing::debug!(host = ?ctx.host_name, bytes, "Response relayed");
            }
            Ok(Outcome::DestinationUnreachable) => {}
            Err(err) => {
                let status = err.status();
                if err.is_rejection() {
                    tracing::info!(status = status.code(), error = %err, "Request rejected");
                } else {
                    tracing::warn!(status = status.code(), error = %err, "Request failed");
                }
                if let Err(e) = send_error(&mut ctx.client, status) {
                    tracing::debug!(error = %e, "Could not deliver error response");
                }
            }
        }

        result
    }

    fn process(&self, ctx: &mut ConnectionContext) -> Result<Outcome, PipelineError> {
        ctx.client
            .set_read_timeout(Some(self.timeouts.client_read()))
            .map_err(PipelineError::Read)?;
        let head = read_until_headers_end(&mut ctx.client).map_err(PipelineError::Read)?;

        ctx.request = ensure_connection_close(&head)?;

        let head = request::validate(&ctx.request)?;
        tracing::debug!(
            method = head.method,
            path = head.path,
            version = head.version,
            host = head.host,
            "Request accepted"
        );
        let host = head.host.to_string();
        ctx.host_name = Some(host.clone());

        let (host_ip, decision) = ctx.policy.check_host(self.resolver.as_ref(), &host)?;
        if let FilterDecision::Blocked(rule) = decision {
            return Err(PipelineError::Blocked { host, rule });
        }

        let port = parse_port(&host)?;
        ctx.clean_host_name = Some(clean_host(&host).to_string());
        ctx.host_port = Some(port);

        let addr = SocketAddr::from((host_ip, port));
        let mut destination = match self.connect(addr) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(destination = %addr, error = %e, "Destination unreachable");
                return Ok(Outcome::DestinationUnreachable);
            }
        };

        let bytes = exchange(&mut destination, &mut ctx.client, &ctx.request)?;
        Ok(Outcome::Relayed { bytes })
    }

    fn connect(&self, addr: SocketAddr) -> std::io::Result<TcpStream> {
        let stream = match self.timeouts.upstream_connect() {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        if let Some(timeout) = self.timeouts.upstream_io() {
            stream.set_read_timeout(Some(timeout))?;
            stream.set_write_timeout(Some(timeout))?;
        }
        Ok(stream)
    }
}

/// Send `request` to `destination`, then copy its response to `client` until EOF.
fn exchange<D, C>(destination: &mut D, client: &mut C, request: &[u8]) -> Result<u64, PipelineError>
where
    D: Read + Write + ?Sized,
    C: Write + ?Sized,
{
    write_fully(destination, request).map_err(PipelineError::Forward)?;
    relay(destination, client).map_err(PipelineError::Relay)
}
