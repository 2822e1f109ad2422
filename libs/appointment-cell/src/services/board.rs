// libs/appointment-cell/src/services/board.rs
//! Local calendar state with optimistic changes.
//!
//! A move or cancellation is applied to the board immediately and parked as
//! a pending change holding the previous card. The caller then either commits
//! it once persistence succeeded or rolls it back, restoring the exact card
//! that was there before.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::{debug, info};

use crate::models::{
    AppointmentError, AppointmentStatus, Banner, CalendarAppointment, CancelNotification,
    MoveNotification, UnplacedAppointment,
};
use crate::services::drag::{find_occupant, MoveProposal};
use crate::services::grid::{format_12h, GridMapping};
use crate::services::lifecycle::AppointmentLifecycleService;

pub const CANCEL_SUCCESS_MESSAGE: &str = "Appointment canceled successfully";

/// Date of weekday `day_index` (Sunday = 0) in the week containing `now`.
pub fn date_in_week(now: DateTime<Utc>, day_index: u8) -> NaiveDate {
    let today = now.date_naive();
    let week_start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
    week_start + Duration::days(day_index as i64)
}

#[derive(Debug, Clone)]
pub struct CalendarBoard {
    appointments: Vec<CalendarAppointment>,
    unplaced: Vec<UnplacedAppointment>,
    pending: HashMap<String, CalendarAppointment>,
    cancel_dialog: Option<String>,
    banner: Option<Banner>,
    banner_ttl: Duration,
    lifecycle: AppointmentLifecycleService,
}

impl CalendarBoard {
    pub fn new(mapping: GridMapping, banner_ttl_ms: i64) -> Self {
        Self {
            appointments: mapping.placed,
            unplaced: mapping.unplaced,
            pending: HashMap::new(),
            cancel_dialog: None,
            banner: None,
            banner_ttl: Duration::milliseconds(banner_ttl_ms),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub fn appointments(&self) -> &[CalendarAppointment] {
        &self.appointments
    }

    pub fn unplaced(&self) -> &[UnplacedAppointment] {
        &self.unplaced
    }

    pub fn get(&self, appointment_id: &str) -> Option<&CalendarAppointment> {
        self.appointments.iter().find(|c| c.id() == appointment_id)
    }

    pub fn is_pending(&self, appointment_id: &str) -> bool {
        self.pending.contains_key(appointment_id)
    }

    fn position(&self, appointment_id: &str) -> Result<usize, AppointmentError> {
        self.appointments
            .iter()
            .position(|c| c.id() == appointment_id)
            .ok_or_else(|| AppointmentError::NotFound(appointment_id.to_string()))
    }

    fn ensure_settled(&self, appointment_id: &str) -> Result<(), AppointmentError> {
        if self.is_pending(appointment_id) {
            return Err(AppointmentError::ChangePending(appointment_id.to_string()));
        }
        Ok(())
    }

    /// Optimistically move a card. The board re-checks the target itself, so
    /// a stale proposal cannot double-book a slot.
    pub fn apply_move(
        &mut self,
        proposal: &MoveProposal,
        now: DateTime<Utc>,
    ) -> Result<MoveNotification, AppointmentError> {
        let id = proposal.appointment_id.as_str();
        self.ensure_settled(id)?;
        let index = self.position(id)?;

        let current = &self.appointments[index];
        if current.slot == proposal.to {
            return Err(AppointmentError::SameSlot(id.to_string(), proposal.to));
        }
        self.lifecycle
            .ensure_can_reschedule(current.appointment.status)?;

        if let Some(occupant) = find_occupant(&self.appointments, proposal.to, id) {
            return Err(AppointmentError::SlotOccupied {
                slot: proposal.to,
                occupant: occupant.id().to_string(),
            });
        }

        let new_date = date_in_week(now, proposal.to.day_index);
        let new_time = format_12h(proposal.to.hour);

        let previous = self.appointments[index].clone();
        let card = &mut self.appointments[index];
        card.slot = proposal.to;
        card.time = new_time.clone();
        card.appointment.status = AppointmentStatus::Rescheduled;
        card.appointment.date = new_date.format("%Y-%m-%d").to_string();
        card.appointment.time = new_time.clone();
        card.appointment.start_time = None;
        card.appointment.updated_at = now;
        self.pending.insert(id.to_string(), previous);

        debug!("Moved {} to {} pending confirmation", id, proposal.to);
        Ok(MoveNotification {
            appointment_id: id.to_string(),
            new_date,
            new_time,
            target: proposal.to,
        })
    }

    /// Open the confirmation dialog for cancelling `appointment_id`.
    pub fn request_cancel(&mut self, appointment_id: &str) -> Result<(), AppointmentError> {
        let index = self.position(appointment_id)?;
        self.lifecycle
            .ensure_can_cancel(self.appointments[index].appointment.status)?;
        self.cancel_dialog = Some(appointment_id.to_string());
        Ok(())
    }

    pub fn cancel_dialog(&self) -> Option<&str> {
        self.cancel_dialog.as_deref()
    }

    pub fn dismiss_cancel(&mut self) {
        self.cancel_dialog = None;
    }

    /// Confirm the open dialog: the appointment becomes `canceled` pending
    /// persistence. The dialog closes either way.
    pub fn confirm_cancel(&mut self, now: DateTime<Utc>) -> Result<CancelNotification, AppointmentError> {
        let id = self
            .cancel_dialog
            .take()
            .ok_or(AppointmentError::NoCancellationRequested)?;
        self.ensure_settled(&id)?;
        let index = self.position(&id)?;
        self.lifecycle
            .ensure_can_cancel(self.appointments[index].appointment.status)?;

        let previous = self.appointments[index].clone();
        let card = &mut self.appointments[index];
        card.appointment.status = AppointmentStatus::Canceled;
        card.appointment.updated_at = now;
        self.pending.insert(id.clone(), previous);

        Ok(CancelNotification { appointment_id: id })
    }

    /// Persistence succeeded; forget the saved previous state.
    pub fn commit(&mut self, appointment_id: &str) -> bool {
        self.pending.remove(appointment_id).is_some()
    }

    /// Persistence failed; put the previous card back.
    pub fn rollback(&mut self, appointment_id: &str) -> bool {
        let Some(previous) = self.pending.remove(appointment_id) else {
            return false;
        };
        if let Some(card) = self
            .appointments
            .iter_mut()
            .find(|c| c.id() == appointment_id)
        {
            *card = previous;
        }
        info!("Rolled back pending change for {}", appointment_id);
        true
    }

    pub fn show_banner(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Banner {
        let banner = Banner {
            message: message.into(),
            shown_at: now,
            expires_at: now + self.banner_ttl,
        };
        self.banner = Some(banner.clone());
        banner
    }

    /// The success banner while it is still on screen.
    pub fn banner(&self, now: DateTime<Utc>) -> Option<&Banner> {
        self.banner.as_ref().filter(|b| b.is_visible(now))
    }

    pub fn clear_expired_banner(&mut self, now: DateTime<Utc>) {
        if self.banner.as_ref().is_some_and(|b| !b.is_visible(now)) {
            self.banner = None;
        }
    }
}
