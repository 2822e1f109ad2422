// libs/appointment-cell/src/services/legacy.rs
//! Upgrade of appointment lists saved by the browser build, where records
//! used camelCase keys, numeric ids and capitalised statuses.

use serde_json::{Map, Value};
use tracing::warn;

use crate::models::AppointmentStatus;

const RENAMES: &[(&str, &str)] = &[
    ("patientName", "patient_name"),
    ("name", "patient_name"),
    ("patientId", "patient_id"),
    ("doctorId", "doctor_id"),
    ("doctorName", "doctor_name"),
    ("doctorSpecialty", "doctor_specialty"),
    ("specialty", "doctor_specialty"),
    ("doctorImage", "doctor_image"),
    ("image", "doctor_image"),
    ("startTime", "start_time"),
    ("isPaid", "paid"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

fn stringify_id(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        other => other,
    }
}

fn normalize_status(id: &Value, value: Option<Value>) -> Value {
    let raw = value.as_ref().and_then(Value::as_str).unwrap_or_default();
    match raw.parse::<AppointmentStatus>() {
        Ok(status) => Value::String(status.to_string()),
        Err(_) => {
            warn!("Appointment {} had status '{}', storing as upcoming", id, raw);
            Value::String(AppointmentStatus::Upcoming.to_string())
        }
    }
}

fn text_or_empty(record: &mut Map<String, Value>, key: &str) {
    let text = match record.remove(key) {
        Some(Value::String(text)) => text,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    record.insert(key.to_string(), Value::String(text));
}

fn upgrade_record(index: usize, mut record: Map<String, Value>) -> Map<String, Value> {
    for (old, new) in RENAMES {
        if let Some(value) = record.remove(*old) {
            record.entry(new.to_string()).or_insert(value);
        }
    }

    for key in ["id", "patient_id", "doctor_id"] {
        if let Some(value) = record.remove(key) {
            record.insert(key.to_string(), stringify_id(value));
        }
    }
    if !matches!(record.get("id"), Some(Value::String(id)) if !id.is_empty()) {
        warn!("Appointment #{} had no id, storing as legacy-{}", index, index);
        record.insert("id".to_string(), Value::String(format!("legacy-{}", index)));
    }

    let id = record.get("id").cloned().unwrap_or(Value::Null);
    let status = normalize_status(&id, record.remove("status"));
    record.insert("status".to_string(), status);

    let age = match record.get("age") {
        Some(Value::String(age)) => age.trim().parse::<u32>().unwrap_or(0),
        Some(Value::Number(age)) => age
            .as_u64()
            .and_then(|age| u32::try_from(age).ok())
            .unwrap_or(0),
        _ => 0,
    };
    record.insert("age".to_string(), Value::from(age));

    // The browser form saved partial records; anything missing reads as blank.
    for key in ["patient_name", "mobile", "date", "time"] {
        text_or_empty(&mut record, key);
    }

    record
}

/// Version 0 to 1 of the `appointments` document.
pub fn upgrade_appointments_v0(value: Value) -> Result<Value, String> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => return Err(format!("expected a list of appointments, found {}", kind(&other))),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(Value::Object(upgrade_record(index, record))),
            other => Err(format!("appointment #{} is {}, not an object", index, kind(&other))),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
