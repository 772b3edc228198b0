//! Network quality classification.
//!
//! Quality is a coarse, best-effort heuristic. Strategies never block and
//! never fail; anything they cannot interpret leans towards `Poor`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Coarse network quality as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkQuality {
    Good,
    Poor,
    Offline,
}

impl fmt::Display for NetworkQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkQuality::Good => write!(f, "good"),
            NetworkQuality::Poor => write!(f, "poor"),
            NetworkQuality::Offline => write!(f, "offline"),
        }
    }
}

/// Quality inputs reported by the host while online.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSignals {
    /// Effective link type hint such as `4g`, `3g` or `wifi`
    pub link_hint: Option<String>,
    /// Most recent round-trip sample
    pub latency: Option<Duration>,
}

// == Quality Strategy ==
/// Classifies an online link. Only consulted while connected; the monitor
/// reports `Offline` itself otherwise.
pub trait QualityStrategy: Send + Sync + fmt::Debug {
    fn classify(&self, signals: &LinkSignals) -> NetworkQuality;
}

/// Classifies by effective link type. No hint at all reads as `Good`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkTypeStrategy;

impl QualityStrategy for LinkTypeStrategy {
    fn classify(&self, signals: &LinkSignals) -> NetworkQuality {
        let Some(hint) = signals.link_hint.as_deref() else {
            return NetworkQuality::Good;
        };

        match hint.trim().to_ascii_lowercase().as_str() {
            "4g" | "5g" | "wifi" | "ethernet" => NetworkQuality::Good,
            // 3g, 2g, slow-2g and anything unrecognised
            _ => NetworkQuality::Poor,
        }
    }
}

/// Classifies by the last latency sample, falling back to the link type
/// when no sample exists yet.
#[derive(Debug, Clone, Copy)]
pub struct LatencyStrategy {
    /// Round-trips at or above this are `Poor`
    pub poor_at: Duration,
}

impl Default for LatencyStrategy {
    fn default() -> Self {
        Self {
            poor_at: Duration::from_millis(800),
        }
    }
}

impl QualityStrategy for LatencyStrategy {
    fn classify(&self, signals: &LinkSignals) -> NetworkQuality {
        match signals.latency {
            Some(rtt) if rtt >= self.poor_at => NetworkQuality::Poor,
            Some(_) => NetworkQuality::Good,
            None => LinkTypeStrategy.classify(signals),
        }
    }
}
