//! Append-only persistence sink.
//!
//! Rows are handed over a bounded channel to a blocking writer worker; the
//! submitting side never waits on the filesystem. A full queue drops the row.

#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::records::{Record, RecordSink, Table};

/// Where and how deep the recorder writes.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Directory holding one JSON Lines file per table. Created on demand;
    /// existing tables are truncated, one run per directory.
    pub dir: PathBuf,
    /// Bound of the submission queue.
    pub queue_depth: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("/tmp/flowprobe"), queue_depth: 256 }
    }
}

/// Handle to the writer worker. Dropping it (or calling [`Recorder::close`])
/// closes the queue and lets the worker drain and exit.
pub struct Recorder {
    tx: mpsc::Sender<Record>,
    worker: JoinHandle<()>,
}

impl Recorder {
    /// Create the table files and start the writer worker.
    ///
    /// Must run inside a tokio runtime. Fails if the directory or any table
    /// file cannot be created; the receiver treats that as a startup error.
    pub fn create(config: RecorderConfig) -> flowprobe_core::Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        let mut writers = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            let file = File::create(config.dir.join(table.file_name()))?;
            writers.push(BufWriter::new(file));
        }
        info!(dir = %config.dir.display(), "record tables created");

        let (tx, mut rx) = mpsc::channel::<Record>(config.queue_depth);
        let worker = tokio::task::spawn_blocking(move || {
            while let Some(record) = rx.blocking_recv() {
                let writer = &mut writers[record.table() as usize];
                if let Err(e) = write_row(writer, &record) {
                    error!("failed to append record: {e}");
                }
            }
            for writer in &mut writers {
                let _ = writer.flush();
            }
        });

        Ok(Self { tx, worker })
    }

    /// Hand one row to the worker without blocking. A full or closed queue
    /// drops the row; loss measurement must never stall on persistence.
    pub fn submit(&self, record: Record) {
        if self.tx.try_send(record).is_err() {
            warn!("recorder queue full, dropping record");
        }
    }

    /// Close the queue and wait for the worker to drain.
    pub async fn close(self) {
        let Recorder { tx, worker } = self;
        drop(tx);
        let _ = worker.await;
    }
}

impl RecordSink for Recorder {
    fn submit(&self, record: Record) {
        Recorder::submit(self, record);
    }
}

fn write_row(writer: &mut BufWriter<File>, record: &Record) -> std::io::Result<()> {
    let line = match record {
        Record::Drops(r) => serde_json::to_string(r),
        Record::Bursts(r) => serde_json::to_string(r),
        Record::Sbursts(r) => serde_json::to_string(r),
        Record::Flows(r) => serde_json::to_string(r),
    }?;
    writeln!(writer, "{line}")?;
    writer.flush()
}
