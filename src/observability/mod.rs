//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!
//! Per connection:
//!     listener assigns conn-N → pipeline span carries it → every event inside
//! ```
//!
//! # Design Decisions
//! - Structured key/value fields rather than formatted messages
//! - Connection ID flows through all pipeline stages

pub mod logging;
