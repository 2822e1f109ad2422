// libs/appointment-cell/src/services/booking.rs
use serde::{Deserialize, Serialize};

use crate::models::{AppointmentError, CreateAppointmentRequest};
use crate::services::grid::{parse_calendar_date, parse_hour};

pub const MAX_PATIENT_AGE: u32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    Doctor,
    Schedule,
    Patient,
    Review,
}

impl BookingStep {
    fn next(self) -> Self {
        match self {
            BookingStep::Doctor => BookingStep::Schedule,
            BookingStep::Schedule => BookingStep::Patient,
            BookingStep::Patient | BookingStep::Review => BookingStep::Review,
        }
    }

    fn previous(self) -> Self {
        match self {
            BookingStep::Doctor | BookingStep::Schedule => BookingStep::Doctor,
            BookingStep::Patient => BookingStep::Schedule,
            BookingStep::Review => BookingStep::Patient,
        }
    }
}

/// Strip spaces and dashes and require exactly ten digits.
pub fn normalize_mobile(mobile: &str) -> Result<String, AppointmentError> {
    let digits: String = mobile
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if digits.len() == 10 && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(digits)
    } else {
        Err(AppointmentError::Validation(
            "mobile number must be exactly 10 digits".to_string(),
        ))
    }
}

pub fn validate_patient(name: &str, age: u32, mobile: &str) -> Result<String, AppointmentError> {
    if name.trim().is_empty() {
        return Err(AppointmentError::Validation("patient name is required".to_string()));
    }
    if age > MAX_PATIENT_AGE {
        return Err(AppointmentError::Validation(format!(
            "age must be between 0 and {}",
            MAX_PATIENT_AGE
        )));
    }
    normalize_mobile(mobile)
}

pub fn validate_schedule(date: &str, time: &str) -> Result<(), AppointmentError> {
    if parse_calendar_date(date).is_none() {
        return Err(AppointmentError::Validation(format!("unreadable date '{}'", date)));
    }
    if parse_hour(time).is_none() {
        return Err(AppointmentError::Validation(format!("unreadable time '{}'", time)));
    }
    Ok(())
}

/// Validate a complete booking and return it with the mobile normalized.
pub fn validate_booking(
    mut request: CreateAppointmentRequest,
) -> Result<CreateAppointmentRequest, AppointmentError> {
    request.mobile = validate_patient(&request.patient_name, request.age, &request.mobile)?;
    request.patient_name = request.patient_name.trim().to_string();
    validate_schedule(&request.date, &request.time)?;
    Ok(request)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub doctor_id: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_specialty: Option<String>,
    pub doctor_image: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub patient_name: Option<String>,
    pub age: Option<u32>,
    pub mobile: Option<String>,
    pub patient_id: Option<String>,
    pub notes: Option<String>,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, AppointmentError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppointmentError::Validation(format!("{} is required", field)))
}

/// Multi-step booking form. Each step is validated before the next opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingWizard {
    step: BookingStep,
    pub draft: BookingDraft,
}

impl Default for BookingWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingWizard {
    pub fn new() -> Self {
        Self {
            step: BookingStep::Doctor,
            draft: BookingDraft::default(),
        }
    }

    pub fn step(&self) -> BookingStep {
        self.step
    }

    fn validate_step(&self, step: BookingStep) -> Result<(), AppointmentError> {
        let draft = &self.draft;
        match step {
            BookingStep::Doctor => required(&draft.doctor_name, "doctor").map(|_| ()),
            BookingStep::Schedule => {
                validate_schedule(required(&draft.date, "date")?, required(&draft.time, "time")?)
            }
            BookingStep::Patient => {
                let age = draft
                    .age
                    .ok_or_else(|| AppointmentError::Validation("age is required".to_string()))?;
                validate_patient(
                    required(&draft.patient_name, "patient name")?,
                    age,
                    required(&draft.mobile, "mobile")?,
                )
                .map(|_| ())
            }
            BookingStep::Review => Ok(()),
        }
    }

    pub fn advance(&mut self) -> Result<BookingStep, AppointmentError> {
        self.validate_step(self.step)?;
        self.step = self.step.next();
        Ok(self.step)
    }

    pub fn back(&mut self) -> BookingStep {
        self.step = self.step.previous();
        self.step
    }

    /// Produce the booking request. Only available from the review step.
    pub fn submit(&self) -> Result<CreateAppointmentRequest, AppointmentError> {
        if self.step != BookingStep::Review {
            return Err(AppointmentError::Validation(
                "booking is not ready for review".to_string(),
            ));
        }
        for step in [BookingStep::Doctor, BookingStep::Schedule, BookingStep::Patient] {
            self.validate_step(step)?;
        }

        let draft = self.draft.clone();
        validate_booking(CreateAppointmentRequest {
            patient_name: draft.patient_name.unwrap_or_default(),
            age: draft.age.unwrap_or_default(),
            mobile: draft.mobile.unwrap_or_default(),
            date: draft.date.unwrap_or_default(),
            time: draft.time.unwrap_or_default(),
            doctor_id: draft.doctor_id,
            doctor_name: draft.doctor_name,
            doctor_specialty: draft.doctor_specialty,
            doctor_image: draft.doctor_image,
            patient_id: draft.patient_id,
            notes: draft.notes,
            status: None,
            paid: false,
        })
    }
}
