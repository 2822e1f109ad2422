// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Status rules. Transitions only move forward: `canceled` and `completed`
/// are terminal, and every reschedule lands in `rescheduled`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Upcoming => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Waiting,
                AppointmentStatus::Rescheduled,
                AppointmentStatus::Canceled,
                AppointmentStatus::Completed,
            ],
            AppointmentStatus::Waiting => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Rescheduled,
                AppointmentStatus::Canceled,
                AppointmentStatus::Completed,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Waiting,
                AppointmentStatus::Rescheduled,
                AppointmentStatus::Canceled,
                AppointmentStatus::Completed,
            ],
            // A rescheduled appointment may be moved again.
            AppointmentStatus::Rescheduled => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Waiting,
                AppointmentStatus::Rescheduled,
                AppointmentStatus::Canceled,
                AppointmentStatus::Completed,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Canceled => vec![],
            AppointmentStatus::Completed => vec![],
        }
    }

    pub fn ensure_can_reschedule(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        self.validate_status_transition(current_status, AppointmentStatus::Rescheduled)
    }

    pub fn ensure_can_cancel(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        self.validate_status_transition(current_status, AppointmentStatus::Canceled)
    }

    /// Apply a requested status change, treating "no change" as allowed.
    pub fn next_status(
        &self,
        current_status: AppointmentStatus,
        requested: Option<AppointmentStatus>,
    ) -> Result<AppointmentStatus, AppointmentError> {
        match requested {
            Some(new_status) if new_status != current_status => {
                self.validate_status_transition(current_status, new_status)?;
                Ok(new_status)
            }
            _ => Ok(current_status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn terminal_statuses_have_no_exits() {
        let lifecycle = AppointmentLifecycleService::new();
        for status in AppointmentStatus::ALL {
            assert_eq!(
                lifecycle.get_valid_transitions(status).is_empty(),
                status.is_terminal(),
                "{}",
                status
            );
        }
    }

    #[test]
    fn nothing_returns_to_upcoming() {
        let lifecycle = AppointmentLifecycleService::new();
        for status in AppointmentStatus::ALL {
            assert!(!lifecycle
                .get_valid_transitions(status)
                .contains(&AppointmentStatus::Upcoming));
        }
    }

    #[test]
    fn cancel_is_final() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle.ensure_can_cancel(AppointmentStatus::Confirmed).is_ok());
        assert_matches!(
            lifecycle.ensure_can_reschedule(AppointmentStatus::Canceled),
            Err(AppointmentError::InvalidStatusTransition {
                from: AppointmentStatus::Canceled,
                to: AppointmentStatus::Rescheduled,
            })
        );
    }

    #[test]
    fn unchanged_status_is_not_a_transition() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_eq!(
            lifecycle
                .next_status(AppointmentStatus::Completed, Some(AppointmentStatus::Completed))
                .unwrap(),
            AppointmentStatus::Completed
        );
        assert_eq!(
            lifecycle.next_status(AppointmentStatus::Waiting, None).unwrap(),
            AppointmentStatus::Waiting
        );
        assert!(lifecycle
            .next_status(AppointmentStatus::Completed, Some(AppointmentStatus::Waiting))
            .is_err());
    }
}
