//! Connectivity Module
//!
//! Online/offline tracking and coarse network quality classification.

mod monitor;
mod quality;

pub use monitor::{ConnectivityMonitor, ConnectivityState, Transition};
pub use quality::{LatencyStrategy, LinkSignals, LinkTypeStrategy, NetworkQuality, QualityStrategy};
