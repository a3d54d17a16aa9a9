//! Background persistence of scan records.
//!
//! # Invariants
//! - One worker thread owns the write connection; records are applied in
//!   enqueue order.
//! - `flush` returns only after every record enqueued before it was applied
//!   or dropped with a logged error.

use crate::db::open_db;
use crate::model::scan::ScanRecord;
use crate::repo::scan_repo::{ScanRepository, SqliteScanRepository};
use log::{debug, info, warn};
use rusqlite::Connection;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Instant;

/// Sink for scan records that must reach the durable store eventually.
///
/// `enqueue` returns immediately. Implementations must tolerate many
/// records for the same (truck, pallet) key.
pub trait DurableWriter: Send + Sync {
    fn enqueue(&self, record: ScanRecord);

    /// Blocks until every record enqueued so far has been handled.
    fn flush(&self) {}
}

enum WriterCommand {
    Insert(ScanRecord),
    Flush(Sender<()>),
}

/// Writes records on one long-lived worker thread with its own connection.
///
/// The worker exits once the writer is dropped and its queue is drained.
#[derive(Debug)]
pub struct DetachedSqliteWriter {
    tx: Sender<WriterCommand>,
}

impl DetachedSqliteWriter {
    /// Starts the worker for the store at `db_path`.
    ///
    /// The connection opens lazily on the worker; an open failure is logged
    /// and retried on the next record.
    pub fn spawn(db_path: impl Into<PathBuf>) -> io::Result<Self> {
        let db_path = db_path.into();
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("scan-writer".to_string())
            .spawn(move || run_worker(&db_path, rx))?;
        Ok(Self { tx })
    }
}

impl DurableWriter for DetachedSqliteWriter {
    fn enqueue(&self, record: ScanRecord) {
        if let Err(mpsc::SendError(WriterCommand::Insert(record))) =
            self.tx.send(WriterCommand::Insert(record))
        {
            warn!(
                "event=scan_persist module=sync status=error truck={} pallet={} error_code=writer_stopped",
                record.truck, record.pallet
            );
        }
    }

    fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(WriterCommand::Flush(ack_tx)).is_err() {
            return;
        }
        // A dead worker drops the ack sender, which also ends the wait.
        let _ = ack_rx.recv();
    }
}

fn run_worker(db_path: &Path, rx: Receiver<WriterCommand>) {
    info!(
        "event=scan_writer module=sync status=start db={}",
        db_path.display()
    );
    let mut conn: Option<Connection> = None;
    while let Ok(command) = rx.recv() {
        match command {
            WriterCommand::Insert(record) => persist(db_path, &mut conn, &record),
            WriterCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    info!("event=scan_writer module=sync status=stopped");
}

fn persist(db_path: &Path, conn: &mut Option<Connection>, record: &ScanRecord) {
    let started_at = Instant::now();
    if conn.is_none() {
        match open_db(db_path) {
            Ok(opened) => *conn = Some(opened),
            Err(err) => {
                warn!(
                    "event=scan_persist module=sync status=error truck={} pallet={} error_code=db_open_failed error={}",
                    record.truck, record.pallet, err
                );
                return;
            }
        }
    }
    let Some(active) = conn.as_ref() else {
        return;
    };

    match SqliteScanRepository::new(active).insert_scan(record) {
        Ok(inserted) => debug!(
            "event=scan_persist module=sync status=ok truck={} pallet={} slot={} inserted={} duration_ms={}",
            record.truck,
            record.pallet,
            record.slot,
            inserted,
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event=scan_persist module=sync status=error truck={} pallet={} duration_ms={} error_code=insert_failed error={}",
            record.truck,
            record.pallet,
            started_at.elapsed().as_millis(),
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{DetachedSqliteWriter, DurableWriter};
    use crate::db::open_db;
    use crate::model::scan::{ScanRecord, TruckKey};
    use crate::model::slot::{SlotId, SlotPosition};
    use crate::repo::scan_repo::{ScanRepository, SqliteScanRepository};

    fn record(pallet: u32) -> ScanRecord {
        ScanRecord {
            truck: TruckKey::new("5"),
            pallet: pallet.to_string(),
            first_serial: format!("S{pallet}A"),
            last_serial: format!("S{pallet}Z"),
            slot: SlotId::new(1, pallet.div_ceil(2)),
            position: if pallet % 2 == 1 {
                SlotPosition::First
            } else {
                SlotPosition::Second
            },
            inserted_at: None,
        }
    }

    #[test]
    fn flush_returns_after_every_queued_record_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scans.db");
        let conn = open_db(&path).unwrap();
        let writer = DetachedSqliteWriter::spawn(&path).unwrap();

        for pallet in 1..=20 {
            writer.enqueue(record(pallet));
        }
        writer.enqueue(record(1));
        writer.flush();

        let rows = SqliteScanRepository::new(&conn).list_scans().unwrap();
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[0].pallet, "1");
        assert_eq!(rows[19].pallet, "20");
    }

    #[test]
    fn flush_with_an_empty_queue_returns() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DetachedSqliteWriter::spawn(dir.path().join("scans.db")).unwrap();
        writer.flush();
        writer.flush();
    }
}
