//! Node and session statistics

pub mod metrics;

pub use metrics::{NodeCounters, NodeStats, SessionCounters, SessionStats};
