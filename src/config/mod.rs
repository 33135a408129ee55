//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command-line overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!
//! Filter file (with --watch):
//!     watcher.rs detects change
//!     → FilterPolicy::load re-reads it
//!     → atomic swap inside PolicyStore
//!     → connections accepted afterwards see the new policy
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the filter policy hot-reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::ProxyConfig;
pub use schema::ListenerConfig;
pub use schema::TimeoutConfig;
