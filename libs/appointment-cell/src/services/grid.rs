// libs/appointment-cell/src/services/grid.rs
//! Places appointments on the 7-day × hour week grid.
//!
//! The hour comes from the first `H:MM` found in `start_time` or `time`, the
//! day from the weekday of `start_time` or `date`. Bad input never raises: an
//! unreadable time falls back to 9 o'clock, and an unreadable date is either
//! reported as unplaced or, under [`DayPlacement::IdFallback`], derived from
//! the last digit of the id.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::debug;

use shared_config::DayPlacement;

use crate::models::{Appointment, CalendarAppointment, SlotId, UnplacedAppointment};

pub const DEFAULT_HOUR: u32 = 9;

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2}):(\d{2})(?:\s*([ap])\.?m\b\.?)?").expect("static time pattern")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

// %B and %A also accept the abbreviated names when parsing.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%A, %B %d, %Y",
    "%d %B %Y",
    "%a %b %d %Y",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("appointment {id} has an unreadable date '{date}'")]
    UnparsableDate { id: String, date: String },

    #[error("appointment {id} has an unreadable date and its id does not end in a digit")]
    NoFallbackDigit { id: String },
}

/// Hour of the first `H:MM` in `text`, with `AM`/`PM` honoured and the
/// result clamped into `0..=23`.
pub fn parse_hour(text: &str) -> Option<u32> {
    let captures = TIME_PATTERN.captures(text)?;
    let hour: u32 = captures.get(1)?.as_str().parse().ok()?;

    let hour = match captures.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(meridiem) if (1..=12).contains(&hour) => {
            let base = hour % 12;
            if meridiem == "p" {
                base + 12
            } else {
                base
            }
        }
        _ => hour,
    };

    Some(hour.min(23))
}

pub fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        })
}

/// Sunday = 0, like a browser's `Date.getDay()`.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn hour_bucket(appointment: &Appointment) -> u32 {
    appointment
        .start_time
        .as_deref()
        .and_then(parse_hour)
        .or_else(|| parse_hour(&appointment.time))
        .unwrap_or(DEFAULT_HOUR)
}

pub fn appointment_date(appointment: &Appointment) -> Option<NaiveDate> {
    appointment
        .start_time
        .as_deref()
        .and_then(parse_calendar_date)
        .or_else(|| parse_calendar_date(&appointment.date))
}

pub fn day_bucket(appointment: &Appointment, placement: DayPlacement) -> Result<u8, PlacementError> {
    if let Some(date) = appointment_date(appointment) {
        return Ok(weekday_index(date));
    }

    match placement {
        DayPlacement::Strict => Err(PlacementError::UnparsableDate {
            id: appointment.id.clone(),
            date: appointment.date.clone(),
        }),
        DayPlacement::IdFallback => appointment
            .id
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .map(|digit| (digit % 7) as u8)
            .ok_or_else(|| PlacementError::NoFallbackDigit {
                id: appointment.id.clone(),
            }),
    }
}

/// Label used for a freshly mapped hour bucket, e.g. `9:00`.
pub fn hour_label(hour: u32) -> String {
    format!("{}:00", hour)
}

/// Twelve-hour label written back after a move, e.g. `11:00 AM`.
pub fn format_12h(hour: u32) -> String {
    let meridiem = if hour < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:00 {}", display, meridiem)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridMapping {
    pub placed: Vec<CalendarAppointment>,
    pub unplaced: Vec<UnplacedAppointment>,
}

#[derive(Debug, Clone, Copy)]
pub struct GridMapper {
    placement: DayPlacement,
}

impl GridMapper {
    pub fn new(placement: DayPlacement) -> Self {
        Self { placement }
    }

    pub fn placement(&self) -> DayPlacement {
        self.placement
    }

    pub fn place(&self, appointment: &Appointment) -> Result<CalendarAppointment, PlacementError> {
        let day_index = day_bucket(appointment, self.placement)?;
        let hour = hour_bucket(appointment);

        Ok(CalendarAppointment {
            appointment: appointment.clone(),
            slot: SlotId { day_index, hour },
            time: hour_label(hour),
        })
    }

    /// Every input lands exactly once in `placed` or `unplaced`, in input order.
    pub fn map(&self, appointments: &[Appointment]) -> GridMapping {
        let mut mapping = GridMapping::default();

        for appointment in appointments {
            match self.place(appointment) {
                Ok(placed) => mapping.placed.push(placed),
                Err(reason) => {
                    debug!("Leaving appointment off the grid: {}", reason);
                    mapping.unplaced.push(UnplacedAppointment {
                        appointment: appointment.clone(),
                        reason: reason.to_string(),
                    });
                }
            }
        }

        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::Utc;

    fn appointment(id: &str, date: &str, time: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            patient_name: "Asha Rao".to_string(),
            age: 34,
            mobile: "9876543210".to_string(),
            date: date.to_string(),
            time: time.to_string(),
            start_time: None,
            status: AppointmentStatus::Upcoming,
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

    #[test]
    fn parsed_hours_are_used_and_clamped() {
        for hour in 0..=23u32 {
            assert_eq!(parse_hour(&format!("{:02}:15", hour)), Some(hour));
            assert_eq!(parse_hour(&format!("{}:15", hour)), Some(hour));
        }
        assert_eq!(parse_hour("45:00"), Some(23));
        assert_eq!(parse_hour("99:59"), Some(23));
    }

    #[test]
    fn twelve_hour_suffixes_are_honoured() {
        assert_eq!(parse_hour("11:00 AM"), Some(11));
        assert_eq!(parse_hour("2:30 pm"), Some(14));
        assert_eq!(parse_hour("12:00 PM"), Some(12));
        assert_eq!(parse_hour("12:00 AM"), Some(0));
        assert_eq!(parse_hour("9:00a.m."), Some(9));
    }

    #[test]
    fn time_is_found_inside_longer_strings() {
        assert_eq!(parse_hour("2024-05-01T10:30:00"), Some(10));
        assert_eq!(parse_hour("Morning slot 08:45"), Some(8));
        assert_eq!(parse_hour("soon"), None);
    }

    #[test]
    fn unreadable_time_defaults_to_nine() {
        let apt = appointment("apt-1", "2024-05-01", "whenever");
        assert_eq!(hour_bucket(&apt), DEFAULT_HOUR);
    }

    #[test]
    fn start_time_wins_over_display_fields() {
        let mut apt = appointment("apt-1", "2024-05-01", "09:00");
        apt.start_time = Some("2024-05-04T15:00:00Z".to_string());
        assert_eq!(hour_bucket(&apt), 15);
        assert_eq!(day_bucket(&apt, DayPlacement::Strict), Ok(6));
    }

    #[test]
    fn common_date_shapes_parse() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1);
        for raw in [
            "2024-05-01",
            "05/01/2024",
            "May 1, 2024",
            "May 01, 2024",
            "Wednesday, May 1, 2024",
            "1 May 2024",
            "2024-05-01T10:00",
            "2024-05-01 10:00:00",
            "2024-05-01T10:00:00+05:30",
        ] {
            assert_eq!(parse_calendar_date(raw), expected, "{}", raw);
        }
        assert_eq!(parse_calendar_date("not a date"), None);
    }

    #[test]
    fn day_bucket_is_the_weekday_with_sunday_first() {
        // 2024-05-05 was a Sunday.
        let sunday = appointment("apt-1", "2024-05-05", "10:00");
        let saturday = appointment("apt-1", "2024-05-11", "10:00");
        assert_eq!(day_bucket(&sunday, DayPlacement::Strict), Ok(0));
        assert_eq!(day_bucket(&saturday, DayPlacement::Strict), Ok(6));
    }

    #[test]
    fn strict_placement_reports_bad_dates() {
        let apt = appointment("apt-9", "someday", "10:00");
        assert_eq!(
            day_bucket(&apt, DayPlacement::Strict),
            Err(PlacementError::UnparsableDate {
                id: "apt-9".to_string(),
                date: "someday".to_string()
            })
        );
    }

    #[test]
    fn id_fallback_uses_the_last_digit_mod_seven() {
        for digit in 0..=9u32 {
            let apt = appointment(&format!("apt-{}", digit), "someday", "10:00");
            assert_eq!(
                day_bucket(&apt, DayPlacement::IdFallback),
                Ok((digit % 7) as u8)
            );
        }
        let no_digit = appointment("apt-x", "someday", "10:00");
        assert!(matches!(
            day_bucket(&no_digit, DayPlacement::IdFallback),
            Err(PlacementError::NoFallbackDigit { .. })
        ));
    }

    #[test]
    fn mapping_keeps_every_input_exactly_once() {
        let appointments = vec![
            appointment("apt-1", "2024-05-05", "10:00"),
            appointment("apt-2", "garbage", "10:00"),
            appointment("apt-3", "2024-05-05", "10:00"),
        ];
        let mapping = GridMapper::new(DayPlacement::Strict).map(&appointments);

        let placed: Vec<&str> = mapping.placed.iter().map(|c| c.id()).collect();
        assert_eq!(placed, vec!["apt-1", "apt-3"]);
        assert_eq!(mapping.unplaced.len(), 1);
        assert_eq!(mapping.unplaced[0].appointment.id, "apt-2");

        // no deduplication of colliding appointments
        assert_eq!(mapping.placed[0].slot, mapping.placed[1].slot);
        assert_eq!(mapping.placed[0].time, "10:00");
    }

    #[test]
    fn empty_input_maps_to_empty_grid() {
        let mapping = GridMapper::new(DayPlacement::IdFallback).map(&[]);
        assert!(mapping.placed.is_empty());
        assert!(mapping.unplaced.is_empty());
    }

    #[test]
    fn twelve_hour_labels() {
        assert_eq!(format_12h(0), "12:00 AM");
        assert_eq!(format_12h(9), "9:00 AM");
        assert_eq!(format_12h(11), "11:00 AM");
        assert_eq!(format_12h(12), "12:00 PM");
        assert_eq!(format_12h(19), "7:00 PM");
    }
}
