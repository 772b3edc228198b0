//! Notification channels and the fallback chain between them.
//!
//! Patients are reached through the in-app channel when possible, by SMS
//! when not, and as a last resort are told to call the helpline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::connectivity::ConnectivityMonitor;

/// Why a channel could not deliver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel unavailable: {0}")]
    Unavailable(String),

    #[error("message rejected: {0}")]
    Rejected(String),
}

// == Notification Channel ==
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, recipient: &str, message: &str) -> Result<(), ChannelError>;
}

/// In-app push. Only reachable while the device is online.
#[derive(Debug, Clone)]
pub struct InAppChannel {
    monitor: Arc<ConnectivityMonitor>,
}

impl InAppChannel {
    pub fn new(monitor: Arc<ConnectivityMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl NotificationChannel for InAppChannel {
    fn name(&self) -> &'static str {
        "in-app"
    }

    async fn send(&self, recipient: &str, message: &str) -> Result<(), ChannelError> {
        if !self.monitor.is_connected() {
            return Err(ChannelError::Unavailable("device is offline".to_string()));
        }
        info!("In-app notification to {}: {}", recipient, message);
        Ok(())
    }
}

/// SMS gateway stand-in: logs the message and accepts it after a short
/// simulated hand-off delay.
#[derive(Debug, Clone)]
pub struct SimulatedSmsGateway {
    pub latency: Duration,
}

impl Default for SimulatedSmsGateway {
    fn default() -> Self {
        Self {
            latency: Duration::from_secs(1),
        }
    }
}

#[async_trait]
impl NotificationChannel for SimulatedSmsGateway {
    fn name(&self) -> &'static str {
        "sms"
    }

    async fn send(&self, recipient: &str, message: &str) -> Result<(), ChannelError> {
        if recipient.trim().is_empty() {
            return Err(ChannelError::Rejected("empty phone number".to_string()));
        }
        tokio::time::sleep(self.latency).await;
        info!("SMS fallback to {}: {}", recipient, message);
        Ok(())
    }
}

/// Which route finally carried a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "channel", rename_all = "camelCase")]
pub enum Delivery {
    Primary,
    Sms,
    /// Nothing automated worked; the user must phone in
    Helpline { instruction: String },
}

// == Notifier ==
/// Primary channel with SMS fallback and a helpline instruction as the
/// terminal step.
#[derive(Clone)]
pub struct Notifier {
    primary: Arc<dyn NotificationChannel>,
    sms: Arc<dyn NotificationChannel>,
    helpline: String,
}

impl Notifier {
    pub fn new(
        primary: Arc<dyn NotificationChannel>,
        sms: Arc<dyn NotificationChannel>,
        helpline: impl Into<String>,
    ) -> Self {
        Self {
            primary,
            sms,
            helpline: helpline.into(),
        }
    }

    pub fn helpline_instruction(&self) -> String {
        format!("Please call our helpline: {}", self.helpline)
    }

    // == SMS Fallback ==
    /// Best-effort SMS; `false` on any failure.
    pub async fn send_sms_fallback(&self, phone: &str, message: &str) -> bool {
        match self.sms.send(phone, message).await {
            Ok(()) => true,
            Err(e) => {
                warn!("SMS fallback to {} failed: {}", phone, e);
                false
            }
        }
    }

    // == Notify ==
    /// Tries the primary channel, then SMS when a phone number is known.
    pub async fn notify(&self, recipient: &str, phone: Option<&str>, message: &str) -> Delivery {
        match self.primary.send(recipient, message).await {
            Ok(()) => return Delivery::Primary,
            Err(e) => warn!(
                "{} notification to {} failed: {}",
                self.primary.name(),
                recipient,
                e
            ),
        }

        if let Some(phone) = phone {
            if self.send_sms_fallback(phone, message).await {
                return Delivery::Sms;
            }
        }

        Delivery::Helpline {
            instruction: self.helpline_instruction(),
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("primary", &self.primary.name())
            .field("sms", &self.sms.name())
            .field("helpline", &self.helpline)
            .finish()
    }
}
