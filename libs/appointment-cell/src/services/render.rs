// libs/appointment-cell/src/services/render.rs
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    AppointmentStatus, Banner, CalendarAppointment, SlotId, UnplacedAppointment,
};
use crate::services::board::{date_in_week, CalendarBoard};
use crate::services::drag::{find_occupant, DragController, GridBounds};
use crate::services::grid::weekday_index;

const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn status_color(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Confirmed => "#16a34a",
        AppointmentStatus::Waiting => "#d97706",
        AppointmentStatus::Rescheduled => "#2563eb",
        AppointmentStatus::Canceled => "#dc2626",
        AppointmentStatus::Upcoming => "#4f46e5",
        AppointmentStatus::Completed => "#6b7280",
    }
}

/// Row label such as `8 AM` or `12 PM`.
pub fn hour_row_label(hour: u32) -> String {
    let meridiem = if hour < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{} {}", display, meridiem)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub patient_name: String,
    pub time: String,
    pub status: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarCard {
    pub id: String,
    pub patient_name: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub doctor_name: Option<String>,
    pub pending: bool,
    pub lifted: bool,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub slot: SlotId,
    pub is_current: bool,
    pub is_drop_target: bool,
    pub cards: Vec<CalendarCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourRow {
    pub hour: u32,
    pub label: String,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayHeader {
    pub day_index: u8,
    pub label: String,
    pub date: NaiveDate,
    pub is_today: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekView {
    pub week_start: NaiveDate,
    pub days: Vec<DayHeader>,
    pub rows: Vec<HourRow>,
    /// Placed appointments whose hour is outside the visible rows.
    pub off_grid: Vec<CalendarCard>,
    pub unplaced: Vec<UnplacedAppointment>,
    pub dragging: Option<String>,
    pub cancel_dialog: Option<String>,
    pub banner: Option<Banner>,
}

impl WeekView {
    pub fn cell(&self, slot: SlotId) -> Option<&GridCell> {
        self.rows
            .iter()
            .find(|row| row.hour == slot.hour)
            .and_then(|row| row.cells.get(slot.day_index as usize))
    }
}

fn card(placed: &CalendarAppointment, board: &CalendarBoard, lifted: Option<&str>) -> CalendarCard {
    let status = placed.appointment.status;
    CalendarCard {
        id: placed.id().to_string(),
        patient_name: placed.appointment.patient_name.clone(),
        time: placed.time.clone(),
        status,
        doctor_name: placed.appointment.doctor_name.clone(),
        pending: board.is_pending(placed.id()),
        lifted: lifted == Some(placed.id()),
        tooltip: Tooltip {
            patient_name: placed.appointment.patient_name.clone(),
            time: placed.time.clone(),
            status: status.label().to_string(),
            color: status_color(status).to_string(),
        },
    }
}

/// Lay the board out as the visible week. `drag` marks free cells as drop
/// targets while a card is lifted.
pub fn render_week(
    board: &CalendarBoard,
    bounds: GridBounds,
    drag: Option<&DragController>,
    now: DateTime<Utc>,
) -> WeekView {
    let today = now.date_naive();
    let today_index = weekday_index(today);
    let current_hour = now.hour();
    let active = drag.and_then(|d| d.active());
    let lifted = active.map(|(id, _)| id);

    let days = (0..7u8)
        .map(|day_index| DayHeader {
            day_index,
            label: DAY_LABELS[day_index as usize].to_string(),
            date: date_in_week(now, day_index),
            is_today: day_index == today_index,
        })
        .collect();

    let rows = bounds
        .hours()
        .map(|hour| HourRow {
            hour,
            label: hour_row_label(hour),
            cells: (0..7u8)
                .map(|day_index| {
                    let slot = SlotId { day_index, hour };
                    let is_drop_target = match active {
                        Some((id, source)) => {
                            slot != source && find_occupant(board.appointments(), slot, id).is_none()
                        }
                        None => false,
                    };
                    GridCell {
                        slot,
                        is_current: day_index == today_index && hour == current_hour,
                        is_drop_target,
                        cards: board
                            .appointments()
                            .iter()
                            .filter(|placed| placed.slot == slot)
                            .map(|placed| card(placed, board, lifted))
                            .collect(),
                    }
                })
                .collect(),
        })
        .collect();

    let off_grid = board
        .appointments()
        .iter()
        .filter(|placed| !bounds.contains(placed.slot))
        .map(|placed| card(placed, board, lifted))
        .collect();

    WeekView {
        week_start: date_in_week(now, 0),
        days,
        rows,
        off_grid,
        unplaced: board.unplaced().to_vec(),
        dragging: lifted.map(str::to_string),
        cancel_dialog: board.cancel_dialog().map(str::to_string),
        banner: board.banner(now).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Appointment;
    use crate::services::drag::Point;
    use crate::services::grid::GridMapper;
    use chrono::TimeZone;
    use shared_config::DayPlacement;

    const BOUNDS: GridBounds = GridBounds {
        first_hour: 8,
        last_hour: 19,
    };

    fn appointment(id: &str, date: &str, time: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: id.to_string(),
            patient_name: format!("Patient {}", id),
            age: 29,
            mobile: "9876543210".to_string(),
            date: date.to_string(),
            time: time.to_string(),
            start_time: None,
            status,
            doctor_id: None,
            doctor_name: None,
            doctor_specialty: None,
            doctor_image: None,
            patient_id: None,
            paid: false,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn board() -> CalendarBoard {
        let appointments = vec![
            appointment("apt-9", "2024-04-30", "10:00", AppointmentStatus::Confirmed),
            appointment("apt-4", "2024-05-02", "14:00", AppointmentStatus::Waiting),
            appointment("apt-late", "2024-05-02", "21:00", AppointmentStatus::Upcoming),
            appointment("apt-bad", "??", "10:00", AppointmentStatus::Upcoming),
        ];
        CalendarBoard::new(GridMapper::new(DayPlacement::Strict).map(&appointments), 3000)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 14, 5, 0).unwrap()
    }

    #[test]
    fn grid_has_seven_days_and_twelve_hours() {
        let view = render_week(&board(), BOUNDS, None, now());
        assert_eq!(view.days.len(), 7);
        assert_eq!(view.rows.len(), 12);
        assert_eq!(view.rows[0].label, "8 AM");
        assert_eq!(view.rows[11].label, "7 PM");
        assert!(view.rows.iter().all(|row| row.cells.len() == 7));
        assert_eq!(view.week_start, NaiveDate::from_ymd_opt(2024, 4, 28).unwrap());
    }

    #[test]
    fn each_appointment_renders_in_exactly_its_cell() {
        let view = render_week(&board(), BOUNDS, None, now());

        let mut seen = Vec::new();
        for row in &view.rows {
            for cell in &row.cells {
                for card in &cell.cards {
                    seen.push((card.id.clone(), cell.slot));
                }
            }
        }
        assert_eq!(
            seen,
            vec![
                ("apt-9".to_string(), "slot-2-10".parse::<SlotId>().unwrap()),
                ("apt-4".to_string(), "slot-4-14".parse::<SlotId>().unwrap()),
            ]
        );
        assert_eq!(view.off_grid.len(), 1);
        assert_eq!(view.off_grid[0].id, "apt-late");
        assert_eq!(view.unplaced.len(), 1);
    }

    #[test]
    fn current_day_and_hour_are_highlighted() {
        let view = render_week(&board(), BOUNDS, None, now());
        let current: Vec<SlotId> = view
            .rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .filter(|cell| cell.is_current)
            .map(|cell| cell.slot)
            .collect();
        assert_eq!(current, vec![SlotId { day_index: 4, hour: 14 }]);
        assert!(view.days[4].is_today);
    }

    #[test]
    fn tooltips_carry_status_and_color() {
        let view = render_week(&board(), BOUNDS, None, now());
        let cell = view.cell("slot-4-14".parse().unwrap()).unwrap();
        let tooltip = &cell.cards[0].tooltip;
        assert_eq!(tooltip.patient_name, "Patient apt-4");
        assert_eq!(tooltip.time, "14:00");
        assert_eq!(tooltip.status, "Waiting");
        assert_eq!(tooltip.color, status_color(AppointmentStatus::Waiting));
    }

    #[test]
    fn drop_targets_only_while_dragging() {
        let board = board();
        let idle = render_week(&board, BOUNDS, None, now());
        assert!(idle
            .rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .all(|cell| !cell.is_drop_target));

        let mut drag = DragController::new(8.0, BOUNDS);
        drag.press("apt-9", Point::new(0.0, 0.0));
        drag.pointer_move(Point::new(30.0, 0.0), board.appointments());

        let view = render_week(&board, BOUNDS, Some(&drag), now());
        assert_eq!(view.dragging.as_deref(), Some("apt-9"));
        let target = |raw: &str| view.cell(raw.parse().unwrap()).unwrap().is_drop_target;
        assert!(!target("slot-2-10"), "source cell");
        assert!(!target("slot-4-14"), "occupied cell");
        assert!(target("slot-3-11"));
        assert!(view.cell("slot-2-10".parse().unwrap()).unwrap().cards[0].lifted);
    }
}
