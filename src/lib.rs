//! proxydash - real-time state synchronization for a proxy control dashboard.
//!
//! Merges server-pushed status events and client-initiated control actions into
//! one coherent view state, with a bounded activity history and a rolling
//! latency series.

pub mod actions;
pub mod config;
pub mod dashboard;
pub mod ingest;
pub mod probe;
pub mod remote;
pub mod scheduler;
pub mod state;
pub mod web;

pub use dashboard::{Dashboard, ViewModel};
