//! Filtering HTTP forward proxy library.

pub mod config;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod pool;

pub use config::schema::ProxyConfig;
pub use lifecycle::startup::Proxy;
pub use lifecycle::Shutdown;
pub use pipeline::Pipeline;
pub use pool::WorkerPool;
