//! Resilience Module
//!
//! Retry policy for transient remote calls, and fallbacks for when the
//! primary channel, the booked doctor or the prescribed medicine is not
//! available.

mod alternatives;
mod channels;
mod redirect;
mod retry;
mod voice;

pub use alternatives::{alternatives_cache_key, builtin_alternatives, Alternative};
pub use channels::{
    ChannelError, Delivery, InAppChannel, NotificationChannel, Notifier, SimulatedSmsGateway,
};
pub use redirect::{
    redirect_message, select_alternative, Availability, DoctorProfile, DOCTORS_CACHE_KEY,
};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use voice::{initiate_voice_booking, SpeechRecognizer, VoiceBooking, DEFAULT_VOICE_LANGUAGE};
