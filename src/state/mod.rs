//! State stores for the dashboard.
//!
//! Holds the connection snapshot, the bounded activity log and the rolling
//! metric series. Each store applies its updates atomically behind its own lock.

mod activity;
mod connection;
mod metrics;

pub use activity::*;
pub use connection::*;
pub use metrics::*;
