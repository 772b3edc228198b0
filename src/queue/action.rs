//! Pending action records.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Action Type ==
/// Kind of mutating intent. Unknown tags are carried through as `Custom` so
/// newer front-ends can queue types this build has no handler for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    BookAppointment,
    ApproveAppointment,
    SendPrescription,
    UpdateInventory,
    RedirectPatient,
    Custom(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::BookAppointment => "book_appointment",
            ActionType::ApproveAppointment => "approve_appointment",
            ActionType::SendPrescription => "send_prescription",
            ActionType::UpdateInventory => "update_inventory",
            ActionType::RedirectPatient => "redirect_patient",
            ActionType::Custom(tag) => tag.as_str(),
        }
    }

    /// The types this crate knows by name.
    pub fn known() -> [ActionType; 5] {
        [
            ActionType::BookAppointment,
            ActionType::ApproveAppointment,
            ActionType::SendPrescription,
            ActionType::UpdateInventory,
            ActionType::RedirectPatient,
        ]
    }
}

impl From<&str> for ActionType {
    fn from(tag: &str) -> Self {
        match tag {
            "book_appointment" => ActionType::BookAppointment,
            "approve_appointment" => ActionType::ApproveAppointment,
            "send_prescription" => ActionType::SendPrescription,
            "update_inventory" => ActionType::UpdateInventory,
            "redirect_patient" => ActionType::RedirectPatient,
            other => ActionType::Custom(other.to_string()),
        }
    }
}

impl From<String> for ActionType {
    fn from(tag: String) -> Self {
        ActionType::from(tag.as_str())
    }
}

impl From<ActionType> for String {
    fn from(action_type: ActionType) -> Self {
        action_type.as_str().to_string()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Action Intent ==
/// What a caller asks to have done once connectivity allows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionIntent {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub payload: Value,
}

impl ActionIntent {
    pub fn new(action_type: impl Into<ActionType>, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
        }
    }
}

// == Pending Action ==
/// An accepted intent, owned by the queue until it completes or is
/// dead-lettered. Persisted as one element of the `pending_actions` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    /// Timestamp-derived, strictly increasing within a queue
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub payload: Value,
    /// Unix milliseconds at enqueue
    pub enqueued_at: u64,
    /// Failed execution attempts so far
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingAction {
    pub fn new(id: String, intent: ActionIntent, enqueued_at: u64) -> Self {
        Self {
            id,
            action_type: intent.action_type,
            payload: intent.payload,
            enqueued_at,
            attempts: 0,
            last_error: None,
        }
    }
}
