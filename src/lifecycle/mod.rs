//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Worker pool → Filter policy (+ watcher) → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Budget spent or signal received → Stop accepting → Drain pool → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     Second signal → Immediate exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: pool first, listener last (traffic only when ready)
//! - Ordered shutdown: stop accept, drain, join workers
//! - Fail fast: any startup error is fatal

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
