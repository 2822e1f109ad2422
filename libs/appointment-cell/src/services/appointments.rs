// libs/appointment-cell/src/services/appointments.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{DocumentStore, MigrationReport, Repository};

use crate::models::{
    Appointment, AppointmentError, AppointmentQuery, AppointmentStatus, CancelNotification,
    CreateAppointmentRequest, MoveNotification, RescheduleAppointmentRequest, SlotId,
    UpdateAppointmentRequest,
};
use crate::services::board::CalendarBoard;
use crate::services::booking::{normalize_mobile, validate_booking, validate_schedule, MAX_PATIENT_AGE};
use crate::services::calendar::ScheduleSink;
use crate::services::grid::{
    appointment_date, hour_bucket, parse_calendar_date, weekday_index, GridMapper,
};
use crate::services::legacy::upgrade_appointments_v0;
use crate::services::lifecycle::AppointmentLifecycleService;

pub const APPOINTMENTS_KEY: &str = "appointments";

/// Appointment id of the form `apt-<32 hex>`.
fn new_appointment_id() -> String {
    format!("apt-{}", Uuid::new_v4().simple())
}

fn iso_date(raw: &str) -> Result<NaiveDate, AppointmentError> {
    parse_calendar_date(raw)
        .ok_or_else(|| AppointmentError::Validation(format!("unreadable date '{}'", raw)))
}

fn doctor_key(appointment: &Appointment) -> Option<&str> {
    appointment
        .doctor_id
        .as_deref()
        .or(appointment.doctor_name.as_deref())
}

/// First other active appointment booked with the same doctor at the same
/// date and hour as `candidate`.
fn find_conflict<'a>(
    appointments: &'a [Appointment],
    candidate: &Appointment,
) -> Option<&'a Appointment> {
    let doctor = doctor_key(candidate)?;
    let date = appointment_date(candidate)?;
    let hour = hour_bucket(candidate);

    appointments.iter().find(|other| {
        other.id != candidate.id
            && other.status.occupies_slot()
            && doctor_key(other) == Some(doctor)
            && appointment_date(other) == Some(date)
            && hour_bucket(other) == hour
    })
}

fn ensure_free(
    appointments: &[Appointment],
    candidate: &Appointment,
) -> Result<(), AppointmentError> {
    if !candidate.status.occupies_slot() {
        return Ok(());
    }
    match find_conflict(appointments, candidate) {
        Some(other) => {
            warn!(
                "Appointment {} clashes with {} on {} at {}",
                candidate.id, other.id, candidate.date, candidate.time
            );
            Err(AppointmentError::SlotOccupied {
                slot: SlotId {
                    day_index: appointment_date(candidate)
                        .map(weekday_index)
                        .unwrap_or_default(),
                    hour: hour_bucket(candidate),
                },
                occupant: other.id.clone(),
            })
        }
        None => Ok(()),
    }
}

#[derive(Clone)]
pub struct AppointmentService {
    repo: Repository<Vec<Appointment>>,
    lifecycle: AppointmentLifecycleService,
    write_lock: Arc<Mutex<()>>,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Result<Self, AppointmentError> {
        let repo = Repository::new(store, APPOINTMENTS_KEY)?.with_migration(0, upgrade_appointments_v0);
        Ok(Self {
            repo,
            lifecycle: AppointmentLifecycleService::new(),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Rewrite the stored list in the current format.
    pub async fn migrate(&self) -> Result<MigrationReport, AppointmentError> {
        let _guard = self.write_lock.lock().await;
        Ok(self.repo.migrate().await?)
    }

    pub async fn list(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let date = query.date.as_deref().and_then(parse_calendar_date);
        let needle = query.q.as_deref().map(|q| q.trim().to_lowercase());

        let appointments = self.repo.load().await?;
        Ok(appointments
            .into_iter()
            .filter(|apt| query.status.is_none_or(|s| apt.status == s))
            .filter(|apt| {
                query
                    .patient_id
                    .as_deref()
                    .is_none_or(|id| apt.patient_id.as_deref() == Some(id))
            })
            .filter(|apt| {
                query
                    .doctor_id
                    .as_deref()
                    .is_none_or(|id| apt.doctor_id.as_deref() == Some(id))
            })
            .filter(|apt| match (&query.date, date) {
                (None, _) => true,
                (Some(_), Some(date)) => appointment_date(apt) == Some(date),
                (Some(raw), None) => apt.date == *raw,
            })
            .filter(|apt| {
                needle
                    .as_deref()
                    .is_none_or(|n| n.is_empty() || apt.patient_name.to_lowercase().contains(n))
            })
            .collect())
    }

    pub async fn get(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        self.repo
            .load()
            .await?
            .into_iter()
            .find(|apt| apt.id == appointment_id)
            .ok_or_else(|| AppointmentError::NotFound(appointment_id.to_string()))
    }

    pub async fn create(&self, request: CreateAppointmentRequest) -> Result<Appointment, AppointmentError> {
        let request = validate_booking(request)?;
        let status = request.status.unwrap_or(AppointmentStatus::Upcoming);
        if status.is_terminal() {
            return Err(AppointmentError::Validation(format!(
                "a new appointment cannot start as {}",
                status
            )));
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: new_appointment_id(),
            patient_name: request.patient_name,
            age: request.age,
            mobile: request.mobile,
            date: iso_date(&request.date)?.format("%Y-%m-%d").to_string(),
            time: request.time.trim().to_string(),
            start_time: None,
            status,
            doctor_id: request.doctor_id,
            doctor_name: request.doctor_name,
            doctor_specialty: request.doctor_specialty,
            doctor_image: request.doctor_image,
            patient_id: request.patient_id,
            paid: request.paid,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        let _guard = self.write_lock.lock().await;
        let mut appointments = self.repo.load().await?;
        ensure_free(&appointments, &appointment)?;
        appointments.push(appointment.clone());
        self.repo.save(&appointments).await?;

        info!(
            "Booked appointment {} for {} on {} at {}",
            appointment.id, appointment.patient_name, appointment.date, appointment.time
        );
        Ok(appointment)
    }

    pub async fn update(
        &self,
        appointment_id: &str,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.write_lock.lock().await;
        let mut appointments = self.repo.load().await?;
        let index = position(&appointments, appointment_id)?;

        let mut updated = appointments[index].clone();
        updated.status = self.lifecycle.next_status(updated.status, request.status)?;

        if let Some(name) = request.patient_name {
            if name.trim().is_empty() {
                return Err(AppointmentError::Validation("patient name is required".to_string()));
            }
            updated.patient_name = name.trim().to_string();
        }
        if let Some(age) = request.age {
            if age > MAX_PATIENT_AGE {
                return Err(AppointmentError::Validation(format!(
                    "age must be between 0 and {}",
                    MAX_PATIENT_AGE
                )));
            }
            updated.age = age;
        }
        if let Some(mobile) = request.mobile {
            updated.mobile = normalize_mobile(&mobile)?;
        }
        if request.doctor_id.is_some() {
            updated.doctor_id = request.doctor_id;
        }
        if request.doctor_name.is_some() {
            updated.doctor_name = request.doctor_name;
        }
        if request.doctor_specialty.is_some() {
            updated.doctor_specialty = request.doctor_specialty;
        }
        if request.doctor_image.is_some() {
            updated.doctor_image = request.doctor_image;
        }
        if request.notes.is_some() {
            updated.notes = request.notes;
        }
        if let Some(paid) = request.paid {
            updated.paid = paid;
        }

        ensure_free(&appointments, &updated)?;
        updated.updated_at = Utc::now();
        appointments[index] = updated.clone();
        self.repo.save(&appointments).await?;

        debug!("Updated appointment {}", appointment_id);
        Ok(updated)
    }

    pub async fn delete(&self, appointment_id: &str) -> Result<(), AppointmentError> {
        let _guard = self.write_lock.lock().await;
        let mut appointments = self.repo.load().await?;
        let index = position(&appointments, appointment_id)?;
        appointments.remove(index);
        self.repo.save(&appointments).await?;

        info!("Deleted appointment {}", appointment_id);
        Ok(())
    }

    pub async fn cancel(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        let _guard = self.write_lock.lock().await;
        let mut appointments = self.repo.load().await?;
        let index = position(&appointments, appointment_id)?;

        let appointment = &mut appointments[index];
        self.lifecycle.ensure_can_cancel(appointment.status)?;
        appointment.status = AppointmentStatus::Canceled;
        appointment.updated_at = Utc::now();
        let canceled = appointment.clone();
        self.repo.save(&appointments).await?;

        info!("Canceled appointment {}", appointment_id);
        Ok(canceled)
    }

    pub async fn reschedule(
        &self,
        appointment_id: &str,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        validate_schedule(&request.date, &request.time)?;
        let date = iso_date(&request.date)?;

        let _guard = self.write_lock.lock().await;
        let mut appointments = self.repo.load().await?;
        let index = position(&appointments, appointment_id)?;

        let mut moved = appointments[index].clone();
        self.lifecycle.ensure_can_reschedule(moved.status)?;
        moved.date = date.format("%Y-%m-%d").to_string();
        moved.time = request.time.trim().to_string();
        moved.start_time = None;
        moved.status = AppointmentStatus::Rescheduled;

        ensure_free(&appointments, &moved)?;
        moved.updated_at = Utc::now();
        appointments[index] = moved.clone();
        self.repo.save(&appointments).await?;

        info!(
            "Rescheduled appointment {} to {} at {}",
            appointment_id, moved.date, moved.time
        );
        Ok(moved)
    }

    /// Calendar state for the current appointment list, optionally for one doctor.
    pub async fn calendar_board(
        &self,
        doctor_id: Option<&str>,
        mapper: GridMapper,
        banner_ttl_ms: i64,
    ) -> Result<CalendarBoard, AppointmentError> {
        let appointments: Vec<Appointment> = self
            .repo
            .load()
            .await?
            .into_iter()
            .filter(|apt| doctor_id.is_none_or(|id| apt.doctor_id.as_deref() == Some(id)))
            .collect();

        Ok(CalendarBoard::new(mapper.map(&appointments), banner_ttl_ms))
    }
}

fn position(appointments: &[Appointment], appointment_id: &str) -> Result<usize, AppointmentError> {
    appointments
        .iter()
        .position(|apt| apt.id == appointment_id)
        .ok_or_else(|| AppointmentError::NotFound(appointment_id.to_string()))
}

#[async_trait]
impl ScheduleSink for AppointmentService {
    /// Writes a calendar move. The slot is checked again against storage,
    /// since another request may have taken it since the board was built.
    async fn persist_move(&self, notice: &MoveNotification) -> Result<(), AppointmentError> {
        let _guard = self.write_lock.lock().await;
        let mut appointments = self.repo.load().await?;
        let index = position(&appointments, &notice.appointment_id)?;

        let mut moved = appointments[index].clone();
        self.lifecycle.ensure_can_reschedule(moved.status)?;
        moved.date = notice.new_date.format("%Y-%m-%d").to_string();
        moved.time = notice.new_time.clone();
        moved.start_time = None;
        moved.status = AppointmentStatus::Rescheduled;

        ensure_free(&appointments, &moved)?;
        moved.updated_at = Utc::now();
        appointments[index] = moved;
        self.repo.save(&appointments).await?;
        Ok(())
    }

    async fn persist_cancel(&self, notice: &CancelNotification) -> Result<(), AppointmentError> {
        self.cancel(&notice.appointment_id).await.map(|_| ())
    }
}
