//! Connectivity Monitor
//!
//! Holds the last-known online flag and quality inputs, and publishes
//! online/offline transitions on a watch channel.

use std::sync::RwLock;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::quality::{LinkSignals, LinkTypeStrategy, NetworkQuality, QualityStrategy};

/// Snapshot of connectivity as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityState {
    pub is_online: bool,
    pub quality: NetworkQuality,
}

/// Outcome of feeding a host signal into the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentOnline,
    WentOffline,
    Unchanged,
}

// == Connectivity Monitor ==
#[derive(Debug)]
pub struct ConnectivityMonitor {
    online_tx: watch::Sender<bool>,
    signals: RwLock<LinkSignals>,
    strategy: Box<dyn QualityStrategy>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the link-type quality heuristic.
    pub fn new(initially_online: bool) -> Self {
        Self::with_strategy(initially_online, Box::new(LinkTypeStrategy))
    }

    pub fn with_strategy(initially_online: bool, strategy: Box<dyn QualityStrategy>) -> Self {
        let (online_tx, _) = watch::channel(initially_online);
        Self {
            online_tx,
            signals: RwLock::new(LinkSignals::default()),
            strategy,
        }
    }

    // == Is Connected ==
    /// Returns the last-known online flag.
    pub fn is_connected(&self) -> bool {
        *self.online_tx.borrow()
    }

    // == Network Quality ==
    /// `Offline` when disconnected, otherwise the strategy's verdict.
    pub fn network_quality(&self) -> NetworkQuality {
        if !self.is_connected() {
            return NetworkQuality::Offline;
        }
        match self.signals.read() {
            Ok(signals) => self.strategy.classify(&signals),
            Err(_) => NetworkQuality::Poor,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        ConnectivityState {
            is_online: self.is_connected(),
            quality: self.network_quality(),
        }
    }

    // == Host Signals ==
    /// Records an online/offline signal from the host.
    ///
    /// Subscribers are only woken on an actual change, so a burst of
    /// identical signals yields a single transition.
    pub fn set_online(&self, online: bool) -> Transition {
        let changed = self.online_tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        match (changed, online) {
            (false, _) => {
                debug!("Connectivity signal unchanged (online={})", online);
                Transition::Unchanged
            }
            (true, true) => {
                info!("Connectivity restored");
                Transition::WentOnline
            }
            (true, false) => {
                warn!("Connectivity lost, switching to offline mode");
                Transition::WentOffline
            }
        }
    }

    /// Records the host's effective link type, `None` to clear it.
    pub fn set_link_hint(&self, hint: Option<String>) {
        if let Ok(mut signals) = self.signals.write() {
            signals.link_hint = hint;
        }
    }

    /// Records a round-trip sample for latency-based strategies.
    pub fn record_latency(&self, rtt: Duration) {
        if let Ok(mut signals) = self.signals.write() {
            signals.latency = Some(rtt);
        }
    }

    /// Receiver that observes every online flag change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online_tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
