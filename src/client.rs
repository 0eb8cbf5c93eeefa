//! Client-side credential lifecycle: the held access credential and the coordinator that keeps
//! it fresh.

mod config;
mod coordinator;
mod metrics;
mod refresher;
mod state;

pub use config::CoordinatorConfig;
pub use coordinator::RefreshCoordinator;
pub use metrics::RefreshMetrics;
pub use refresher::*;
pub use state::*;
