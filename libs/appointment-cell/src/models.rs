// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_database::StoreError;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_name: String,
    pub age: u32,
    pub mobile: String,
    /// Display date. Written as `YYYY-MM-DD` by this service, but legacy
    /// records carry whatever the booking form produced.
    pub date: String,
    /// Display time, e.g. `10:00` or `11:00 AM`.
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub doctor_specialty: Option<String>,
    #[serde(default)]
    pub doctor_image: Option<String>,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Waiting,
    Rescheduled,
    #[serde(alias = "cancelled")]
    Canceled,
    Upcoming,
    Completed,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Confirmed,
        AppointmentStatus::Waiting,
        AppointmentStatus::Rescheduled,
        AppointmentStatus::Canceled,
        AppointmentStatus::Upcoming,
        AppointmentStatus::Completed,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Canceled | AppointmentStatus::Completed)
    }

    /// Canceled appointments free their slot; everything else holds it.
    pub fn occupies_slot(&self) -> bool {
        *self != AppointmentStatus::Canceled
    }

    /// The week board folds every week onto one grid, so only appointments
    /// still ahead hold a cell there.
    pub fn holds_board_cell(&self) -> bool {
        !self.is_terminal()
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Waiting => "Waiting",
            AppointmentStatus::Rescheduled => "Rescheduled",
            AppointmentStatus::Canceled => "Canceled",
            AppointmentStatus::Upcoming => "Upcoming",
            AppointmentStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Waiting => write!(f, "waiting"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
            AppointmentStatus::Canceled => write!(f, "canceled"),
            AppointmentStatus::Upcoming => write!(f, "upcoming"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "waiting" => Ok(AppointmentStatus::Waiting),
            "rescheduled" => Ok(AppointmentStatus::Rescheduled),
            "canceled" | "cancelled" => Ok(AppointmentStatus::Canceled),
            "upcoming" => Ok(AppointmentStatus::Upcoming),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(AppointmentError::Validation(format!(
                "unknown appointment status '{}'",
                other
            ))),
        }
    }
}

// ==============================================================================
// CALENDAR MODELS
// ==============================================================================

/// One (day-of-week, hour) cell of the week grid, `slot-{day}-{hour}` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotId {
    pub day_index: u8,
    pub hour: u32,
}

impl SlotId {
    pub fn new(day_index: u8, hour: u32) -> Result<Self, AppointmentError> {
        if day_index > 6 || hour > 23 {
            return Err(AppointmentError::InvalidSlot(format!(
                "slot-{}-{}",
                day_index, hour
            )));
        }
        Ok(Self { day_index, hour })
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}-{}", self.day_index, self.hour)
    }
}

impl FromStr for SlotId {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppointmentError::InvalidSlot(s.to_string());
        let rest = s.strip_prefix("slot-").ok_or_else(invalid)?;
        let (day, hour) = rest.split_once('-').ok_or_else(invalid)?;
        let day = day.parse::<u8>().map_err(|_| invalid())?;
        let hour = hour.parse::<u32>().map_err(|_| invalid())?;
        SlotId::new(day, hour)
    }
}

impl TryFrom<String> for SlotId {
    type Error = AppointmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotId> for String {
    fn from(slot: SlotId) -> Self {
        slot.to_string()
    }
}

/// An appointment placed on the week grid. Derived on every mapping, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarAppointment {
    pub appointment: Appointment,
    pub slot: SlotId,
    /// Hour bucket label: `9:00` when mapped, `11:00 AM` after a move.
    pub time: String,
}

impl CalendarAppointment {
    pub fn id(&self) -> &str {
        &self.appointment.id
    }

    pub fn day_index(&self) -> u8 {
        self.slot.day_index
    }

    pub fn hour(&self) -> u32 {
        self.slot.hour
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnplacedAppointment {
    pub appointment: Appointment,
    pub reason: String,
}

/// Emitted once per successful drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveNotification {
    pub appointment_id: String,
    pub new_date: NaiveDate,
    pub new_time: String,
    pub target: SlotId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelNotification {
    pub appointment_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub message: String,
    pub shown_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Banner {
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_name: String,
    pub age: u32,
    pub mobile: String,
    pub date: String,
    pub time: String,
    pub doctor_id: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_specialty: Option<String>,
    pub doctor_image: Option<String>,
    pub patient_id: Option<String>,
    pub notes: Option<String>,
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub paid: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub patient_name: Option<String>,
    pub age: Option<u32>,
    pub mobile: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub doctor_id: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_specialty: Option<String>,
    pub doctor_image: Option<String>,
    pub notes: Option<String>,
    pub paid: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentQuery {
    pub status: Option<AppointmentStatus>,
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub date: Option<String>,
    /// Case-insensitive patient name search.
    pub q: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarQuery {
    pub doctor_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveAppointmentRequest {
    pub appointment_id: String,
    pub target: SlotId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarCancelRequest {
    pub appointment_id: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment {0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Invalid slot '{0}'")]
    InvalidSlot(String),

    #[error("Slot {slot} is already taken by appointment {occupant}")]
    SlotOccupied { slot: SlotId, occupant: String },

    #[error("Appointment {0} is already in {1}")]
    SameSlot(String, SlotId),

    #[error("Appointment {0} has an unconfirmed change in flight")]
    ChangePending(String),

    #[error("No cancellation is awaiting confirmation")]
    NoCancellationRequested,

    #[error("Appointment could not be placed on the calendar: {0}")]
    Unplaced(String),

    #[error("Persisting the change failed: {0}")]
    Persistence(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound(_) => AppError::NotFound(err.to_string()),
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::InvalidSlot(_) | AppointmentError::Unplaced(_) => {
                AppError::BadRequest(err.to_string())
            }
            AppointmentError::NoCancellationRequested => AppError::BadRequest(err.to_string()),
            AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::SlotOccupied { .. }
            | AppointmentError::SameSlot(..)
            | AppointmentError::ChangePending(_) => AppError::Conflict(err.to_string()),
            AppointmentError::Persistence(msg) => AppError::ExternalService(msg),
            AppointmentError::Storage(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn slot_ids_round_trip_through_their_wire_form() {
        let slot: SlotId = "slot-3-11".parse().unwrap();
        assert_eq!(slot, SlotId { day_index: 3, hour: 11 });
        assert_eq!(slot.to_string(), "slot-3-11");
        assert_eq!(serde_json::to_value(slot).unwrap(), "slot-3-11");
    }

    #[test]
    fn malformed_slot_ids_are_rejected() {
        for raw in ["slot-7-10", "slot-2-24", "slot-2", "cell-2-10", "slot-a-10", ""] {
            assert_matches!(raw.parse::<SlotId>(), Err(AppointmentError::InvalidSlot(_)), "{}", raw);
        }
        assert!(serde_json::from_str::<SlotId>("\"slot-9-9\"").is_err());
    }

    #[test]
    fn legacy_status_spellings_deserialize() {
        let status: AppointmentStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, AppointmentStatus::Canceled);
        assert_eq!("Cancelled".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Canceled);
        assert_eq!(AppointmentStatus::Canceled.to_string(), "canceled");
    }

    #[test]
    fn only_canceled_frees_a_slot() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.occupies_slot(), status != AppointmentStatus::Canceled);
        }
    }

    #[test]
    fn past_visits_leave_the_board_free() {
        assert!(!AppointmentStatus::Completed.holds_board_cell());
        assert!(!AppointmentStatus::Canceled.holds_board_cell());
        assert!(AppointmentStatus::Rescheduled.holds_board_cell());
        assert!(AppointmentStatus::Completed.occupies_slot());
    }
}
