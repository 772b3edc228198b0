//! Doctor-unavailable redirection.
//!
//! Picks a replacement doctor from the cached doctor directory.

use serde::{Deserialize, Serialize};

/// Cache key of the doctor directory.
pub const DOCTORS_CACHE_KEY: &str = "doctors";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub emergency_leave: bool,
}

/// The subset of a doctor profile redirection needs. Unknown fields in the
/// cached directory are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_available: Option<String>,
}

impl DoctorProfile {
    pub fn can_take_patients(&self) -> bool {
        self.availability.is_available && !self.availability.emergency_leave
    }
}

/// First available doctor other than `unavailable_id`, from the same
/// specialization when the unavailable doctor is in the directory.
pub fn select_alternative<'a>(
    doctors: &'a [DoctorProfile],
    unavailable_id: &str,
) -> Option<&'a DoctorProfile> {
    let specialization = doctors
        .iter()
        .find(|d| d.id == unavailable_id)
        .map(|d| d.specialization.as_str());

    doctors
        .iter()
        .filter(|d| d.id != unavailable_id)
        .filter(|d| specialization.map_or(true, |s| d.specialization == s))
        .find(|d| d.can_take_patients())
}

/// Message sent to the patient after a redirect.
pub fn redirect_message(doctor: &DoctorProfile) -> String {
    match &doctor.next_available {
        Some(slot) => format!(
            "Your doctor is unavailable. You've been redirected to Dr. {}. New appointment time: {}",
            doctor.name, slot
        ),
        None => format!(
            "Your doctor is unavailable. You've been redirected to Dr. {}. The clinic will confirm your new time.",
            doctor.name
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(id: &str, specialization: &str, available: bool) -> DoctorProfile {
        DoctorProfile {
            id: id.to_string(),
            name: format!("Doc {}", id),
            specialization: specialization.to_string(),
            availability: Availability {
                is_available: available,
                emergency_leave: false,
            },
            next_available: None,
        }
    }

    #[test]
    fn test_prefers_same_specialization() {
        let doctors = vec![
            doctor("d1", "cardiology", false),
            doctor("d2", "general", true),
            doctor("d3", "cardiology", true),
        ];
        assert_eq!(select_alternative(&doctors, "d1").unwrap().id, "d3");
    }

    #[test]
    fn test_unknown_doctor_considers_everyone() {
        let doctors = vec![doctor("d2", "general", false), doctor("d3", "dermatology", true)];
        assert_eq!(select_alternative(&doctors, "ghost").unwrap().id, "d3");
    }

    #[test]
    fn test_never_picks_the_unavailable_doctor() {
        let doctors = vec![doctor("d1", "general", true)];
        assert!(select_alternative(&doctors, "d1").is_none());
    }

    #[test]
    fn test_no_available_alternatives() {
        let doctors = vec![doctor("d1", "general", false), doctor("d2", "general", false)];
        assert!(select_alternative(&doctors, "d1").is_none());
    }

    #[test]
    fn test_emergency_leave_excluded() {
        let mut on_leave = doctor("d2", "general", true);
        on_leave.availability.emergency_leave = true;
        let doctors = vec![doctor("d1", "general", false), on_leave];
        assert!(select_alternative(&doctors, "d1").is_none());
    }

    #[test]
    fn test_parses_directory_with_extra_fields() {
        let json = r#"[{"id":"d9","name":"Meera","specialization":"general",
            "consultationFee":200,"availability":{"isAvailable":true,"workingDays":["Mon"]},
            "nextAvailable":"10:30"}]"#;
        let doctors: Vec<DoctorProfile> = serde_json::from_str(json).unwrap();
        assert!(doctors[0].can_take_patients());
        assert!(redirect_message(&doctors[0]).contains("Dr. Meera"));
        assert!(redirect_message(&doctors[0]).contains("10:30"));
    }
}
