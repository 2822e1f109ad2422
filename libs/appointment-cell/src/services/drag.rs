// libs/appointment-cell/src/services/drag.rs
//! Pointer drag state machine for the week grid.
//!
//! `Idle -> Pressed -> Dragging -> Idle`. A press only becomes a drag once the
//! pointer has travelled past the activation distance; releasing earlier is a
//! click. Every release returns to `Idle` and reports what happened.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CalendarAppointment, SlotId};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Visible hour range of the grid; drops outside it count as outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub first_hour: u32,
    pub last_hour: u32,
}

impl GridBounds {
    pub fn contains(&self, slot: SlotId) -> bool {
        slot.day_index < 7 && (self.first_hour..=self.last_hour).contains(&slot.hour)
    }

    pub fn hours(&self) -> impl Iterator<Item = u32> {
        self.first_hour..=self.last_hour
    }
}

impl From<&shared_config::CalendarSettings> for GridBounds {
    fn from(settings: &shared_config::CalendarSettings) -> Self {
        Self {
            first_hour: settings.first_hour,
            last_hour: settings.last_hour(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Pressed {
        appointment_id: String,
        origin: Point,
    },
    Dragging {
        appointment_id: String,
        source: SlotId,
        pointer: Point,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveProposal {
    pub appointment_id: String,
    pub from: SlotId,
    pub to: SlotId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DropOutcome {
    /// Released before the drag activated.
    Click { appointment_id: String },
    /// Released over no grid cell.
    Outside { appointment_id: String },
    SameSlot { appointment_id: String, slot: SlotId },
    Occupied {
        appointment_id: String,
        target: SlotId,
        occupant_id: String,
    },
    Valid(MoveProposal),
    /// Release without a preceding press.
    Ignored,
}

/// First active appointment other than `exclude` holding `slot`.
pub fn find_occupant<'a>(
    board: &'a [CalendarAppointment],
    slot: SlotId,
    exclude: &str,
) -> Option<&'a CalendarAppointment> {
    board.iter().find(|placed| {
        placed.slot == slot
            && placed.appointment.id != exclude
            && placed.appointment.status.holds_board_cell()
    })
}

#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    activation_distance: f64,
    bounds: GridBounds,
}

impl DragController {
    pub fn new(activation_distance: f64, bounds: GridBounds) -> Self {
        Self {
            state: DragState::Idle,
            activation_distance,
            bounds,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Id and source slot of the lifted card, if any.
    pub fn active(&self) -> Option<(&str, SlotId)> {
        match &self.state {
            DragState::Dragging {
                appointment_id,
                source,
                ..
            } => Some((appointment_id.as_str(), *source)),
            _ => None,
        }
    }

    /// Pointer down on a card. Ignored while another press or drag is active.
    pub fn press(&mut self, appointment_id: impl Into<String>, at: Point) -> bool {
        if self.state != DragState::Idle {
            return false;
        }
        self.state = DragState::Pressed {
            appointment_id: appointment_id.into(),
            origin: at,
        };
        true
    }

    /// Track the pointer. Returns true while a drag is active.
    pub fn pointer_move(&mut self, at: Point, board: &[CalendarAppointment]) -> bool {
        match &mut self.state {
            DragState::Idle => false,
            DragState::Dragging { pointer, .. } => {
                *pointer = at;
                true
            }
            DragState::Pressed {
                appointment_id,
                origin,
            } => {
                if origin.distance_to(at) <= self.activation_distance {
                    return false;
                }

                let Some(source) = board
                    .iter()
                    .find(|placed| placed.appointment.id == *appointment_id)
                    .map(|placed| placed.slot)
                else {
                    debug!("Pressed card {} is no longer on the board", appointment_id);
                    self.state = DragState::Idle;
                    return false;
                };

                debug!("Drag started for {} from {}", appointment_id, source);
                self.state = DragState::Dragging {
                    appointment_id: std::mem::take(appointment_id),
                    source,
                    pointer: at,
                };
                true
            }
        }
    }

    /// Pointer up. `target` is the cell under the pointer, if any.
    pub fn release(&mut self, target: Option<SlotId>, board: &[CalendarAppointment]) -> DropOutcome {
        let state = std::mem::replace(&mut self.state, DragState::Idle);

        let (appointment_id, source) = match state {
            DragState::Idle => return DropOutcome::Ignored,
            DragState::Pressed { appointment_id, .. } => {
                return DropOutcome::Click { appointment_id }
            }
            DragState::Dragging {
                appointment_id,
                source,
                ..
            } => (appointment_id, source),
        };

        let target = match target {
            Some(slot) if self.bounds.contains(slot) => slot,
            _ => return DropOutcome::Outside { appointment_id },
        };

        if target == source {
            return DropOutcome::SameSlot {
                appointment_id,
                slot: target,
            };
        }

        if let Some(occupant) = find_occupant(board, target, &appointment_id) {
            debug!(
                "Drop of {} on {} refused, held by {}",
                appointment_id,
                target,
                occupant.id()
            );
            return DropOutcome::Occupied {
                appointment_id,
                target,
                occupant_id: occupant.id().to_string(),
            };
        }

        DropOutcome::Valid(MoveProposal {
            appointment_id,
            from: source,
            to: target,
        })
    }

    /// Abandon the current press or drag (e.g. Escape) without any change.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}
