//! HTTP handling subsystem.
//!
//! # Data Flow
//! ```text
//! Raw request head (from net::io)
//!     → request.rs (Connection: close, validation, host/port extraction)
//!     → pipeline (filter, connect, relay)
//!     → response.rs (error pages when a stage refuses)
//! ```
//!
//! # Design Decisions
//! - Only the request head is parsed; bodies are never read
//! - Every response the proxy writes itself closes the connection

pub mod request;
pub mod response;
