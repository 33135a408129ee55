//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, request budget)
//!     → connection.rs (per-connection context, lifecycle tracking)
//!     → worker pool → pipeline
//!     → io.rs (head reads, full writes, response relay)
//! ```
//!
//! # Design Decisions
//! - Blocking sockets; concurrency comes from the worker pool
//! - Each connection tracked until its context is dropped
//! - The client is read until the end of the request head; bytes that arrived
//!   in the same reads are forwarded with it, nothing later is read

pub mod connection;
pub mod io;
pub mod listener;
