// libs/appointment-cell/src/services/calendar.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{AppointmentError, Banner, CancelNotification, MoveNotification, SlotId};
use crate::services::board::{CalendarBoard, CANCEL_SUCCESS_MESSAGE};
use crate::services::drag::{DragController, DropOutcome, MoveProposal, Point};
use crate::services::render::{render_week, WeekView};

/// Where confirmed calendar changes are written.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleSink: Send + Sync {
    async fn persist_move(&self, notice: &MoveNotification) -> Result<(), AppointmentError>;
    async fn persist_cancel(&self, notice: &CancelNotification) -> Result<(), AppointmentError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DropResult {
    Moved(MoveNotification),
    Unchanged(DropOutcome),
}

/// Drives the board from pointer input and keeps it in step with storage:
/// a change that fails to persist is rolled back.
pub struct CalendarController {
    board: CalendarBoard,
    drag: DragController,
    sink: Arc<dyn ScheduleSink>,
}

impl CalendarController {
    pub fn new(board: CalendarBoard, drag: DragController, sink: Arc<dyn ScheduleSink>) -> Self {
        Self { board, drag, sink }
    }

    pub fn board(&self) -> &CalendarBoard {
        &self.board
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn press(&mut self, appointment_id: &str, at: Point) -> bool {
        if self.board.is_pending(appointment_id) {
            return false;
        }
        self.drag.press(appointment_id, at)
    }

    pub fn pointer_move(&mut self, at: Point) -> bool {
        self.drag.pointer_move(at, self.board.appointments())
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    pub async fn release(
        &mut self,
        target: Option<SlotId>,
        now: DateTime<Utc>,
    ) -> Result<DropResult, AppointmentError> {
        match self.drag.release(target, self.board.appointments()) {
            DropOutcome::Valid(proposal) => self.move_to(&proposal, now).await.map(DropResult::Moved),
            other => Ok(DropResult::Unchanged(other)),
        }
    }

    /// Apply a move and persist it.
    pub async fn move_to(
        &mut self,
        proposal: &MoveProposal,
        now: DateTime<Utc>,
    ) -> Result<MoveNotification, AppointmentError> {
        let notice = self.board.apply_move(proposal, now)?;

        match self.sink.persist_move(&notice).await {
            Ok(()) => {
                self.board.commit(&notice.appointment_id);
                info!(
                    "Appointment {} moved to {} {}",
                    notice.appointment_id, notice.new_date, notice.new_time
                );
                Ok(notice)
            }
            Err(e) => {
                warn!("Move of {} not saved, reverting: {}", notice.appointment_id, e);
                self.board.rollback(&notice.appointment_id);
                Err(e)
            }
        }
    }

    pub fn request_cancel(&mut self, appointment_id: &str) -> Result<(), AppointmentError> {
        self.board.request_cancel(appointment_id)
    }

    pub fn dismiss_cancel(&mut self) {
        self.board.dismiss_cancel();
    }

    /// Confirm the open cancel dialog. The success banner only appears once
    /// the cancellation is saved.
    pub async fn confirm_cancel(&mut self, now: DateTime<Utc>) -> Result<Banner, AppointmentError> {
        let notice = self.board.confirm_cancel(now)?;

        match self.sink.persist_cancel(&notice).await {
            Ok(()) => {
                self.board.commit(&notice.appointment_id);
                info!("Appointment {} canceled", notice.appointment_id);
                Ok(self.board.show_banner(CANCEL_SUCCESS_MESSAGE, now))
            }
            Err(e) => {
                warn!("Cancel of {} not saved, reverting: {}", notice.appointment_id, e);
                self.board.rollback(&notice.appointment_id);
                Err(e)
            }
        }
    }

    pub fn view(&mut self, now: DateTime<Utc>) -> WeekView {
        self.board.clear_expired_banner(now);
        render_week(&self.board, self.drag.bounds(), Some(&self.drag), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Appointment, AppointmentStatus};
    use crate::services::drag::GridBounds;
    use crate::services::grid::GridMapper;
    use assert_matches::assert_matches;
    use chrono::{Duration, NaiveDate, TimeZone};
    use shared_config::DayPlacement;

    const BOUNDS: GridBounds = GridBounds {
        first_hour: 8,
        last_hour: 19,
    };

    fn appointment(id: &str, date: &str, time: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: id.to_string(),
            patient_name: format!("Patient {}", id),
            age: 61,
            mobile: "9876543210".to_string(),
            date: date.to_string(),
            time: time.to_string(),
            start_time: None,
            status,
            doctor_id: Some("doc-1".to_string()),
            doctor_name: Some("Dr. Iyer".to_string()),
            doctor_specialty: None,
            doctor_image: None,
            patient_id: None,
            paid: false,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 10, 30, 0).unwrap()
    }

    fn controller(sink: MockScheduleSink) -> CalendarController {
        let appointments = vec![
            appointment("apt-9", "2024-04-30", "10:00", AppointmentStatus::Confirmed),
            appointment("apt-4", "2024-05-02", "14:00", AppointmentStatus::Waiting),
        ];
        let board = CalendarBoard::new(GridMapper::new(DayPlacement::Strict).map(&appointments), 3000);
        CalendarController::new(board, DragController::new(8.0, BOUNDS), Arc::new(sink))
    }

    fn drag_apt_9(controller: &mut CalendarController) {
        assert!(controller.press("apt-9", Point::new(100.0, 100.0)));
        assert!(controller.pointer_move(Point::new(100.0, 160.0)));
    }

    #[tokio::test]
    async fn valid_drop_persists_exactly_once() {
        let mut sink = MockScheduleSink::new();
        sink.expect_persist_move()
            .withf(|notice| {
                notice.appointment_id == "apt-9"
                    && notice.new_date == NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
                    && notice.new_time == "11:00 AM"
            })
            .times(1)
            .returning(|_| Ok(()));
        sink.expect_persist_cancel().never();

        let mut controller = controller(sink);
        drag_apt_9(&mut controller);
        let result = controller
            .release(Some("slot-3-11".parse().unwrap()), now())
            .await
            .unwrap();

        assert_matches!(result, DropResult::Moved(ref notice) if notice.target == SlotId { day_index: 3, hour: 11 });
        let moved = controller.board().get("apt-9").unwrap();
        assert_eq!(moved.appointment.status, AppointmentStatus::Rescheduled);
        assert!(!controller.board().is_pending("apt-9"));
    }

    #[tokio::test]
    async fn refused_drops_never_reach_storage() {
        let mut sink = MockScheduleSink::new();
        sink.expect_persist_move().never();

        let mut controller = controller(sink);
        drag_apt_9(&mut controller);
        let result = controller
            .release(Some("slot-4-14".parse().unwrap()), now())
            .await
            .unwrap();
        assert_matches!(result, DropResult::Unchanged(DropOutcome::Occupied { .. }));

        drag_apt_9(&mut controller);
        let result = controller
            .release(Some("slot-2-10".parse().unwrap()), now())
            .await
            .unwrap();
        assert_matches!(result, DropResult::Unchanged(DropOutcome::SameSlot { .. }));

        // a short press is a click
        controller.press("apt-9", Point::new(0.0, 0.0));
        controller.pointer_move(Point::new(5.0, 5.0));
        let result = controller.release(None, now()).await.unwrap();
        assert_matches!(result, DropResult::Unchanged(DropOutcome::Click { .. }));
    }

    #[tokio::test]
    async fn failed_persist_rolls_the_move_back() {
        let mut sink = MockScheduleSink::new();
        sink.expect_persist_move()
            .times(1)
            .returning(|_| Err(AppointmentError::Persistence("disk full".to_string())));

        let mut controller = controller(sink);
        let before = controller.board().get("apt-9").cloned().unwrap();

        drag_apt_9(&mut controller);
        let result = controller.release(Some("slot-3-11".parse().unwrap()), now()).await;

        assert_matches!(result, Err(AppointmentError::Persistence(_)));
        assert_eq!(controller.board().get("apt-9"), Some(&before));
        assert!(!controller.board().is_pending("apt-9"));
    }

    #[tokio::test]
    async fn cancel_shows_banner_after_saving() {
        let mut sink = MockScheduleSink::new();
        sink.expect_persist_cancel()
            .withf(|notice| notice.appointment_id == "apt-4")
            .times(1)
            .returning(|_| Ok(()));

        let mut controller = controller(sink);
        controller.request_cancel("apt-4").unwrap();
        let banner = controller.confirm_cancel(now()).await.unwrap();

        assert_eq!(banner.message, CANCEL_SUCCESS_MESSAGE);
        assert_eq!(
            controller.board().get("apt-4").unwrap().appointment.status,
            AppointmentStatus::Canceled
        );
        assert!(controller.view(now() + Duration::milliseconds(1500)).banner.is_some());
        assert!(controller.view(now() + Duration::milliseconds(3000)).banner.is_none());
    }

    #[tokio::test]
    async fn failed_cancel_shows_no_banner() {
        let mut sink = MockScheduleSink::new();
        sink.expect_persist_cancel()
            .times(1)
            .returning(|_| Err(AppointmentError::Persistence("offline".to_string())));

        let mut controller = controller(sink);
        controller.request_cancel("apt-4").unwrap();
        assert!(controller.confirm_cancel(now()).await.is_err());

        let view = controller.view(now());
        assert!(view.banner.is_none());
        assert!(view.cancel_dialog.is_none());
        assert_eq!(
            controller.board().get("apt-4").unwrap().appointment.status,
            AppointmentStatus::Waiting
        );
    }

    #[tokio::test]
    async fn dismissed_dialog_cancels_nothing() {
        let mut sink = MockScheduleSink::new();
        sink.expect_persist_cancel().never();

        let mut controller = controller(sink);
        controller.request_cancel("apt-4").unwrap();
        controller.dismiss_cancel();
        assert_matches!(
            controller.confirm_cancel(now()).await,
            Err(AppointmentError::NoCancellationRequested)
        );
    }
}
