//! Voice booking with a phone-call fallback, for users who cannot read the
//! booking forms.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{OfflineError, Result};

/// Default recognition language for rural deployments.
pub const DEFAULT_VOICE_LANGUAGE: &str = "hi-IN";

// == Speech Recognizer ==
/// Host speech-to-text capability.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Captures one utterance and returns its transcript.
    ///
    /// Hosts without the capability return `OfflineError::Unsupported`.
    async fn recognize(&self, language: &str) -> Result<String>;
}

/// Outcome of a voice booking attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum VoiceBooking {
    /// The spoken request, for the booking flow to interpret
    Transcript { text: String },
    /// Voice unavailable; the user must phone in
    PhoneFallback { instruction: String },
}

/// Runs voice capture, degrading to a helpline instruction when the host has
/// no recognizer or recognition fails.
pub async fn initiate_voice_booking(
    recognizer: Option<&dyn SpeechRecognizer>,
    language: &str,
    helpline: &str,
) -> VoiceBooking {
    let result = match recognizer {
        Some(recognizer) => recognizer.recognize(language).await,
        None => Err(OfflineError::Unsupported(
            "speech recognition not available on this device".to_string(),
        )),
    };

    match result {
        Ok(text) => {
            info!("Voice booking transcript received ({} chars)", text.len());
            VoiceBooking::Transcript { text }
        }
        Err(e) => {
            warn!("Voice booking unavailable: {}", e);
            VoiceBooking::PhoneFallback {
                instruction: format!(
                    "Voice booking unavailable. Please call our helpline: {}",
                    helpline
                ),
            }
        }
    }
}
