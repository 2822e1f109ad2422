use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How the calendar places an appointment whose date cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPlacement {
    /// Report the appointment as unplaced with the parse error.
    Strict,
    /// Legacy demo behaviour: last digit of the id, modulo 7.
    IdFallback,
}

impl FromStr for DayPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(DayPlacement::Strict),
            "id" | "id_fallback" | "legacy" => Ok(DayPlacement::IdFallback),
            other => Err(format!("unknown day placement '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSettings {
    pub first_hour: u32,
    pub hour_count: u32,
    pub drag_activation_px: f64,
    pub cancel_banner_ms: i64,
    pub day_placement: DayPlacement,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            first_hour: 8,
            hour_count: 12,
            drag_activation_px: 8.0,
            cancel_banner_ms: 3000,
            day_placement: DayPlacement::Strict,
        }
    }
}

impl CalendarSettings {
    /// Last visible hour, inclusive.
    pub fn last_hour(&self) -> u32 {
        self.first_hour
            .saturating_add(self.hour_count)
            .saturating_sub(1)
            .min(23)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub data_dir: Option<PathBuf>,
    pub bind_addr: String,
    pub calendar: CalendarSettings,
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = CalendarSettings::default();

        let mut calendar = CalendarSettings {
            first_hour: parsed_or("CALENDAR_FIRST_HOUR", defaults.first_hour),
            hour_count: parsed_or("CALENDAR_HOURS", defaults.hour_count),
            drag_activation_px: parsed_or("DRAG_ACTIVATION_PX", defaults.drag_activation_px),
            cancel_banner_ms: parsed_or("CANCEL_BANNER_MS", defaults.cancel_banner_ms),
            day_placement: parsed_or("CALENDAR_DAY_FALLBACK", defaults.day_placement),
        };

        if calendar.first_hour > 23 || calendar.hour_count == 0 {
            warn!(
                "Calendar hours {}+{} out of range, using defaults",
                calendar.first_hour, calendar.hour_count
            );
            calendar.first_hour = defaults.first_hour;
            calendar.hour_count = defaults.hour_count;
        }
        let room = 24 - calendar.first_hour;
        if calendar.hour_count > room {
            warn!(
                "CALENDAR_HOURS {} runs past midnight, showing {}",
                calendar.hour_count, room
            );
            calendar.hour_count = room;
        }

        let config = Self {
            jwt_secret: env::var("AUTH_JWT_SECRET").unwrap_or_else(|_| {
                warn!("AUTH_JWT_SECRET not set, every request will be rejected");
                String::new()
            }),
            data_dir: env::var("DATA_DIR").ok().map(PathBuf::from).or_else(|| {
                warn!("DATA_DIR not set, using in-memory storage");
                None
            }),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            calendar,
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }

    pub fn is_persistent(&self) -> bool {
        self.data_dir.is_some()
    }
}
