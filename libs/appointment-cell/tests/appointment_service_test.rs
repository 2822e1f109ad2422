use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, Utc};
use serde_json::json;

use appointment_cell::services::calendar::ScheduleSink;
use appointment_cell::services::grid::GridMapper;
use appointment_cell::{
    AppointmentError, AppointmentQuery, AppointmentService, AppointmentStatus,
    CreateAppointmentRequest, MoveNotification, SlotId,
};
use shared_config::DayPlacement;
use shared_database::{DocumentStore, FileStore, MemoryStore};

fn request(patient: &str, date: &str, time: &str) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        patient_name: patient.to_string(),
        age: 47,
        mobile: "98765-43210".to_string(),
        date: date.to_string(),
        time: time.to_string(),
        doctor_id: Some("doc-7".to_string()),
        doctor_name: Some("Dr. Menon".to_string()),
        ..CreateAppointmentRequest::default()
    }
}

#[tokio::test]
async fn test_legacy_browser_blob_migrates_on_startup() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn DocumentStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());

    // unversioned list as the browser build left it
    store
        .put(
            "appointments",
            json!([
                {
                    "id": 9,
                    "patientName": "Leela",
                    "age": 70,
                    "mobile": "9876543210",
                    "date": "2024-04-30",
                    "time": "10:00 AM",
                    "status": "Cancelled",
                    "doctorName": "Dr. Menon",
                    "isPaid": true
                },
                {
                    "id": "apt-4",
                    "name": "Farhan",
                    "age": 33,
                    "mobile": "9123456780",
                    "date": "05/02/2024",
                    "time": "14:00",
                    "status": "waiting"
                }
            ]),
        )
        .await
        .unwrap();

    let service = AppointmentService::new(store.clone()).unwrap();
    let report = service.migrate().await.unwrap();
    assert_eq!(report.from_version, 0);
    assert!(report.rewritten);

    let stored = store.get("appointments").await.unwrap().unwrap();
    assert_eq!(stored["version"], report.to_version);

    let leela = service.get("9").await.unwrap();
    assert_eq!(leela.patient_name, "Leela");
    assert_eq!(leela.status, AppointmentStatus::Canceled);
    assert!(leela.paid);

    let farhan = service.get("apt-4").await.unwrap();
    assert_eq!(farhan.patient_name, "Farhan");
    assert_eq!(farhan.status, AppointmentStatus::Waiting);

    // a second run has nothing to do
    let again = service.migrate().await.unwrap();
    assert!(!again.rewritten);
}

#[tokio::test]
async fn test_partial_browser_records_do_not_block_the_list() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    store
        .put(
            "appointments",
            json!([
                {
                    "id": 1,
                    "name": "Complete",
                    "age": 52,
                    "mobile": "9876543210",
                    "date": "May 1, 2024",
                    "time": "10:00 AM",
                    "status": "upcoming"
                },
                { "id": 2, "name": "NoAgeNoMobile", "date": "May 1, 2024", "time": "11:00 AM", "status": "upcoming" }
            ]),
        )
        .await
        .unwrap();

    let service = AppointmentService::new(store).unwrap();
    service.migrate().await.unwrap();

    let all = service.list(&AppointmentQuery::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(service.get("1").await.unwrap().patient_name, "Complete");
    let partial = service.get("2").await.unwrap();
    assert_eq!(partial.age, 0);
    assert_eq!(partial.mobile, "");
}

#[tokio::test]
async fn test_bookings_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let id = {
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let service = AppointmentService::new(store).unwrap();
        service
            .create(request("Zoya", "May 6, 2024", "9:30 AM"))
            .await
            .unwrap()
            .id
    };

    let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let service = AppointmentService::new(store).unwrap();
    let appointment = service.get(&id).await.unwrap();
    assert_eq!(appointment.date, "2024-05-06");
    assert_eq!(appointment.mobile, "9876543210");
}

#[tokio::test]
async fn test_list_filters_combine() {
    let service = AppointmentService::new(Arc::new(MemoryStore::new())).unwrap();
    service.create(request("Zoya Khan", "2024-05-06", "09:00")).await.unwrap();
    service.create(request("Arjun", "2024-05-06", "10:00")).await.unwrap();
    service.create(request("Zoya Khan", "2024-05-07", "09:00")).await.unwrap();

    let by_date = service
        .list(&AppointmentQuery {
            date: Some("May 6, 2024".to_string()),
            ..AppointmentQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(by_date.len(), 2);

    let by_name = service
        .list(&AppointmentQuery {
            q: Some("zoya".to_string()),
            date: Some("2024-05-07".to_string()),
            ..AppointmentQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);

    let none = service
        .list(&AppointmentQuery {
            doctor_id: Some("doc-unknown".to_string()),
            ..AppointmentQuery::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_persist_move_rechecks_the_stored_slot() {
    let service = AppointmentService::new(Arc::new(MemoryStore::new())).unwrap();
    let moving = service.create(request("Zoya", "2024-05-06", "09:00")).await.unwrap();
    service.create(request("Arjun", "2024-05-07", "11:00")).await.unwrap();

    // a stale board could propose the slot Arjun already holds
    let stale = MoveNotification {
        appointment_id: moving.id.clone(),
        new_date: NaiveDate::from_ymd_opt(2024, 5, 7).unwrap(),
        new_time: "11:00 AM".to_string(),
        target: SlotId { day_index: 2, hour: 11 },
    };
    assert_matches!(
        service.persist_move(&stale).await,
        Err(AppointmentError::SlotOccupied { .. })
    );
    assert_eq!(service.get(&moving.id).await.unwrap().time, "09:00");

    let free = MoveNotification {
        new_time: "12:00 PM".to_string(),
        target: SlotId { day_index: 2, hour: 12 },
        ..stale
    };
    service.persist_move(&free).await.unwrap();
    let moved = service.get(&moving.id).await.unwrap();
    assert_eq!(moved.date, "2024-05-07");
    assert_eq!(moved.time, "12:00 PM");
    assert_eq!(moved.status, AppointmentStatus::Rescheduled);
}

#[tokio::test]
async fn test_calendar_board_reports_unplaced_records() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    store
        .put(
            "appointments",
            json!({
                "version": 1,
                "saved_at": Utc::now(),
                "data": [
                    { "id": "apt-3", "patient_name": "A", "age": 1, "mobile": "9876543210",
                      "date": "2024-05-06", "time": "10:00", "status": "upcoming" },
                    { "id": "apt-5", "patient_name": "B", "age": 1, "mobile": "9876543210",
                      "date": "next week", "time": "10:00", "status": "upcoming" }
                ]
            }),
        )
        .await
        .unwrap();
    let service = AppointmentService::new(store).unwrap();

    let strict = service
        .calendar_board(None, GridMapper::new(DayPlacement::Strict), 3000)
        .await
        .unwrap();
    assert_eq!(strict.appointments().len(), 1);
    assert_eq!(strict.unplaced().len(), 1);
    assert_eq!(strict.unplaced()[0].appointment.id, "apt-5");

    let fallback = service
        .calendar_board(None, GridMapper::new(DayPlacement::IdFallback), 3000)
        .await
        .unwrap();
    assert_eq!(fallback.appointments().len(), 2);
    assert_eq!(fallback.get("apt-5").unwrap().slot, SlotId { day_index: 5, hour: 10 });
}
