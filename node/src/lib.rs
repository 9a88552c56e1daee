//! Star registry node: wires the ledger and the verification queue
//! together behind the write gate, plus the config, logging and metrics
//! the daemon and the HTTP layer share.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use registry::{open_environment, StarRegistry};
