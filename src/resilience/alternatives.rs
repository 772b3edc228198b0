//! Alternative medicine suggestions.

use serde::{Deserialize, Serialize};

/// A substitute for an out-of-stock medicine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub name: String,
    pub reason: String,
}

impl Alternative {
    fn new(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Cache key holding pharmacy-provided alternatives for `medicine`.
pub fn alternatives_cache_key(medicine: &str) -> String {
    format!("alternatives_{}", medicine)
}

/// Built-in common substitutes, matched case-insensitively. Empty when the
/// medicine is unknown.
pub fn builtin_alternatives(medicine: &str) -> Vec<Alternative> {
    match medicine.trim().to_lowercase().as_str() {
        "paracetamol" => vec![
            Alternative::new("Ibuprofen", "Similar pain relief properties"),
            Alternative::new("Aspirin", "Alternative pain reliever"),
        ],
        "azithromycin" => vec![
            Alternative::new("Amoxicillin", "Alternative antibiotic"),
            Alternative::new("Ciprofloxacin", "Broad spectrum antibiotic"),
        ],
        _ => Vec::new(),
    }
}
