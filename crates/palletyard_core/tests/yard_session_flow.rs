use palletyard_core::db::{open_db, open_db_in_memory};
use palletyard_core::{
    DetachedSqliteWriter, DurableWriter, Manifest, PackingManifest, PackingRow, PlacementError,
    ScanError, ScanOutcome, ScanRecord, ScanRepository, ShipmentStatus, SlotId, SlotPosition,
    SqliteScanRepository, StatusSink, StatusSinkError, TruckKey, TruckRange, TruckState,
    YardSession,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
struct RecordingWriter {
    records: Arc<Mutex<Vec<ScanRecord>>>,
}

impl DurableWriter for RecordingWriter {
    fn enqueue(&self, record: ScanRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(TruckKey, ShipmentStatus)>>,
}

impl StatusSink for RecordingSink {
    fn publish(&self, truck: &TruckKey, status: ShipmentStatus) -> Result<(), StatusSinkError> {
        self.events.lock().unwrap().push((truck.clone(), status));
        Ok(())
    }
}

const LAYOUT: [&str; 6] = ["C1-1", "C1-2", "C1-3", "C2-1", "C2-2", "C2-3"];

fn serials(pallet: u32) -> (String, String) {
    (format!("SN{pallet}00"), format!("SN{pallet}99"))
}

/// Truck "5" carries pallets 1..=6, truck "2" carries 7..=8.
fn manifest() -> PackingManifest {
    let mut rows = Vec::new();
    for pallet in 1..=8 {
        let (first, last) = serials(pallet);
        rows.push(PackingRow {
            pallet: Some(pallet.to_string()),
            serial: first,
            box_number: Some(format!("B{pallet}")),
        });
        rows.push(PackingRow {
            pallet: None,
            serial: last,
            box_number: None,
        });
    }
    PackingManifest::new(
        vec![
            TruckRange {
                truck: "5".to_string(),
                first_pallet: "1".to_string(),
                last_pallet: "6".to_string(),
            },
            TruckRange {
                truck: "2".to_string(),
                first_pallet: "7".to_string(),
                last_pallet: "8".to_string(),
            },
        ],
        rows,
    )
    .unwrap()
}

fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn six_pallets_fill_three_slots_and_delivery_empties_them() {
    let conn = open_db_in_memory().unwrap();
    let writer = RecordingWriter::default();
    let sink = Arc::new(RecordingSink::default());
    let mut session = YardSession::open(
        SqliteScanRepository::new(&conn),
        manifest(),
        Box::new(writer.clone()),
        sink.clone(),
    )
    .unwrap();
    session.reload_layout(LAYOUT);

    let truck = TruckKey::new("5");
    let progress = session.select_truck(truck.clone());
    assert_eq!(progress.total, 6);
    assert_eq!(progress.state, TruckState::Unbound);
    assert_eq!(progress.lane, Some(1));

    let mut reports = Vec::new();
    for pallet in 1..=6 {
        let (first, last) = serials(pallet);
        reports.push(session.scan(&first, &last).unwrap());
    }

    let slots: Vec<(SlotId, SlotPosition)> = reports
        .iter()
        .map(|report| {
            let placement = report.outcome.placement();
            (placement.slot, placement.position)
        })
        .collect();
    assert_eq!(
        slots,
        vec![
            (SlotId::new(1, 1), SlotPosition::First),
            (SlotId::new(1, 1), SlotPosition::Second),
            (SlotId::new(1, 2), SlotPosition::First),
            (SlotId::new(1, 2), SlotPosition::Second),
            (SlotId::new(1, 3), SlotPosition::First),
            (SlotId::new(1, 3), SlotPosition::Second),
        ]
    );
    assert!(reports.iter().all(|report| report.matches_expected()));
    assert!(reports[5].truck_completed);
    assert!(reports[..5].iter().all(|report| !report.truck_completed));
    assert_eq!(session.progress(&truck).state, TruckState::Complete);
    assert_eq!(writer.records.lock().unwrap().len(), 6);
    for slot in session.catalog().slots_for_lane(1) {
        assert_eq!(session.assignments()[&slot].len(), 2);
    }

    let report = session.deliver(&truck).unwrap();
    assert_eq!(report.assignments_released, 6);
    assert_eq!(report.slots_freed, 3);
    assert!(session.assignments().is_empty());
    assert!(session.ledger().is_empty());
    for pallet in 1..=6 {
        assert!(!session.ledger().is_scanned(&truck, &pallet.to_string()));
    }
    assert_eq!(session.progress(&truck).state, TruckState::Delivered);
    assert_eq!(session.pending_trucks(), vec![TruckKey::new("2")]);
    assert!(session.active_truck().is_none());

    assert!(wait_for(|| {
        let events = sink.events.lock().unwrap();
        events.contains(&(truck.clone(), ShipmentStatus::Ready))
            && events.contains(&(truck.clone(), ShipmentStatus::Delivered))
    }));
}

#[test]
fn rescanning_a_pallet_returns_the_first_placement() {
    let conn = open_db_in_memory().unwrap();
    let writer = RecordingWriter::default();
    let mut session = YardSession::open(
        SqliteScanRepository::new(&conn),
        manifest(),
        Box::new(writer.clone()),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();
    session.reload_layout(LAYOUT);
    session.select_truck(TruckKey::new("5"));

    let (first, last) = serials(3);
    let once = session.scan(&first, &last).unwrap();
    let twice = session.scan(&first, &last).unwrap();

    assert!(matches!(once.outcome, ScanOutcome::Placed(_)));
    assert!(matches!(twice.outcome, ScanOutcome::AlreadyScanned(_)));
    assert_eq!(once.outcome.placement(), twice.outcome.placement());
    assert_eq!(session.ledger().len(), 1);
    assert_eq!(writer.records.lock().unwrap().len(), 1);
}

#[test]
fn numeric_truck_key_takes_its_own_lane() {
    let conn = open_db_in_memory().unwrap();
    let mut session = YardSession::open(
        SqliteScanRepository::new(&conn),
        manifest(),
        Box::new(RecordingWriter::default()),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();
    session.reload_layout(LAYOUT);

    session.select_truck(TruckKey::new("2"));
    let (first, last) = serials(7);
    let report = session.scan(&first, &last).unwrap();

    // Pallet 7 pairs into index 4, which lane 2 lacks.
    assert_eq!(report.outcome.placement().slot, SlotId::new(2, 1));
    assert_eq!(report.expected_slot, Some(SlotId::new(2, 4)));
    assert!(!report.matches_expected());
}

#[test]
fn scan_errors_leave_state_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let mut session = YardSession::open(
        SqliteScanRepository::new(&conn),
        manifest(),
        Box::new(RecordingWriter::default()),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();

    let (first, last) = serials(1);
    assert_eq!(session.scan(&first, &last).unwrap_err(), ScanError::NoActiveTruck);

    session.select_truck(TruckKey::new("5"));
    let err = session.scan(&first, &last).unwrap_err();
    assert_eq!(err, ScanError::Placement(PlacementError::NoLaneAvailable));

    session.reload_layout(LAYOUT);
    let err = session.scan(&first, "SN999").unwrap_err();
    assert!(matches!(err, ScanError::UnknownSerials { .. }));

    let (other_first, other_last) = serials(7);
    let err = session.scan(&other_first, &other_last).unwrap_err();
    assert!(matches!(err, ScanError::UnknownSerials { .. }));
    assert!(session.ledger().is_empty());
}

#[test]
fn background_writes_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scans.db");
    let truck = TruckKey::new("5");

    let conn = open_db(&path).unwrap();
    {
        let mut session = YardSession::open(
            SqliteScanRepository::new(&conn),
            manifest(),
            Box::new(DetachedSqliteWriter::spawn(&path).unwrap()),
            Arc::new(RecordingSink::default()),
        )
        .unwrap();
        session.reload_layout(LAYOUT);
        session.select_truck(truck.clone());
        for pallet in 1..=3 {
            let (first, last) = serials(pallet);
            session.scan(&first, &last).unwrap();
        }
    }

    let repo = SqliteScanRepository::new(&conn);
    assert!(wait_for(|| repo
        .list_scans()
        .map(|rows| rows.len() == 3)
        .unwrap_or(false)));

    let restarted = open_db(&path).unwrap();
    let mut session = YardSession::open(
        SqliteScanRepository::new(&restarted),
        manifest(),
        Box::new(RecordingWriter::default()),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();
    session.reload_layout(LAYOUT);

    assert_eq!(session.ledger().scanned_count(&truck), 3);
    assert_eq!(session.assignments()[&SlotId::new(1, 1)].len(), 2);
    assert_eq!(
        session.ledger().locate(&truck, "3").unwrap().slot,
        SlotId::new(1, 2)
    );
    assert_eq!(session.progress(&truck).state, TruckState::PartiallyScanned);
    assert_eq!(session.lane_for(&truck), Ok(1));

    session.deliver(&truck).unwrap();
    assert!(repo.list_scans().unwrap().is_empty());
}

#[test]
fn reset_clears_store_and_memory() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteScanRepository::new(&conn);
    let mut session = YardSession::open(
        SqliteScanRepository::new(&conn),
        manifest(),
        Box::new(RecordingWriter::default()),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();
    session.reload_layout(LAYOUT);
    session.select_truck(TruckKey::new("5"));
    let (first, last) = serials(1);
    let report = session.scan(&first, &last).unwrap();
    repo.insert_scan(&ScanRecord {
        truck: report.truck.clone(),
        pallet: report.pallet.clone(),
        first_serial: first,
        last_serial: last,
        slot: report.outcome.placement().slot,
        position: report.outcome.placement().position,
        inserted_at: None,
    })
    .unwrap();
    session.deliver(&TruckKey::new("2")).unwrap();

    assert_eq!(session.reset().unwrap(), 1);
    assert!(session.ledger().is_empty());
    assert!(session.state().delivered().is_empty());
    assert!(repo.list_scans().unwrap().is_empty());
    assert_eq!(session.manifest().trucks().len(), 2);
}

#[test]
fn assignment_index_serializes_for_renderers() {
    let conn = open_db_in_memory().unwrap();
    let mut session = YardSession::open(
        SqliteScanRepository::new(&conn),
        manifest(),
        Box::new(RecordingWriter::default()),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();
    session.reload_layout(LAYOUT);
    session.select_truck(TruckKey::new("5"));
    let (first, last) = serials(2);
    session.scan(&first, &last).unwrap();

    let json = serde_json::to_value(session.assignments()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "C1-1": [{ "truck": "5", "pallet": "2", "slot": "C1-1", "position": 1 }]
        })
    );
}

#[test]
fn delivering_right_after_a_scan_leaves_no_durable_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scans.db");
    let conn = open_db(&path).unwrap();
    let truck = TruckKey::new("5");

    let mut session = YardSession::open(
        SqliteScanRepository::new(&conn),
        manifest(),
        Box::new(DetachedSqliteWriter::spawn(&path).unwrap()),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();
    session.reload_layout(LAYOUT);
    session.select_truck(truck.clone());
    let (first, last) = serials(1);
    session.scan(&first, &last).unwrap();
    session.deliver(&truck).unwrap();
    drop(session);

    thread::sleep(Duration::from_millis(200));
    let repo = SqliteScanRepository::new(&conn);
    assert!(repo.list_scans().unwrap().is_empty());

    let restarted = open_db(&path).unwrap();
    let session = YardSession::open(
        SqliteScanRepository::new(&restarted),
        manifest(),
        Box::new(RecordingWriter::default()),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();
    assert!(session.ledger().is_empty());
}

#[test]
fn reset_waits_for_queued_background_inserts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scans.db");
    let conn = open_db(&path).unwrap();

    let mut session = YardSession::open(
        SqliteScanRepository::new(&conn),
        manifest(),
        Box::new(DetachedSqliteWriter::spawn(&path).unwrap()),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();
    session.reload_layout(LAYOUT);
    session.select_truck(TruckKey::new("5"));
    for pallet in 1..=4 {
        let (first, last) = serials(pallet);
        session.scan(&first, &last).unwrap();
    }

    assert_eq!(session.reset().unwrap(), 4);
    assert!(SqliteScanRepository::new(&conn).list_scans().unwrap().is_empty());
}
