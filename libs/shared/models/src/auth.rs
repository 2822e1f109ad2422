use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub name: Option<String>,
    pub iat: Option<u64>,
}

/// Caller roles recognised by the clinic. Unknown role claims collapse to `Patient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim.map(|c| c.to_ascii_lowercase()).as_deref() {
            Some("doctor") => Role::Doctor,
            Some("admin") => Role::Admin,
            _ => Role::Patient,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Doctors and admins manage the clinic side of the app.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Doctor | Role::Admin)
    }

    pub fn owns(&self, patient_id: Option<&str>) -> bool {
        patient_id == Some(self.id.as_str())
    }

    /// Staff may touch any record; patients only their own.
    pub fn can_access(&self, patient_id: Option<&str>) -> bool {
        self.is_staff() || self.owns(patient_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "patient-1".to_string(),
            email: None,
            name: None,
            role,
            created_at: None,
        }
    }

    #[test]
    fn role_claims_are_case_insensitive() {
        assert_eq!(Role::from_claim(Some("Doctor")), Role::Doctor);
        assert_eq!(Role::from_claim(Some("ADMIN")), Role::Admin);
        assert_eq!(Role::from_claim(Some("nurse")), Role::Patient);
        assert_eq!(Role::from_claim(None), Role::Patient);
    }

    #[test]
    fn patients_only_reach_their_own_records() {
        let patient = user(Role::Patient);
        assert!(patient.can_access(Some("patient-1")));
        assert!(!patient.can_access(Some("patient-2")));
        assert!(!patient.can_access(None));

        let doctor = user(Role::Doctor);
        assert!(doctor.can_access(Some("patient-2")));
        assert!(doctor.can_access(None));
    }
}
