mod availability;
mod candidates;
mod conflict;
mod error;
mod lifecycle;
mod lineup;
mod mutations;
mod queries;
mod store;

pub use availability::{
    NON_BLOCKING, available_musicians, free_windows, is_band_available, is_musician_available,
    merge_overlapping, subtract_intervals,
};
pub use candidates::filter_for_instrument;
pub use error::{EngineError, Entity, ErrorKind};
pub use lineup::assign_lineup;
pub use store::{BookingStore, InMemoryStore};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, mpsc, oneshot};
use tracing::info;
use ulid::Ulid;

use crate::config::Config;
use crate::model::Event;
use crate::notify::NotifyHub;
use crate::observability::{WAL_FLUSH_BATCH_SIZE, WAL_FLUSH_DURATION_SECONDS};
use crate::wal::Wal;

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

/// Background task that owns the WAL and batches appends for group commit:
/// take the first append, drain whatever else is already queued, then write
/// and fsync the whole batch once. A non-append command ends the batch and is
/// handled right after it.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let first = match cmd {
            WalCommand::Append { event, response } => (event, response),
            other => {
                handle_command(&mut wal, other);
                continue;
            }
        };

        let mut batch = vec![first];
        let mut deferred = None;
        while let Ok(next) = rx.try_recv() {
            match next {
                WalCommand::Append { event, response } => batch.push((event, response)),
                other => {
                    deferred = Some(other);
                    break;
                }
            }
        }

        commit_batch(&mut wal, batch);
        if let Some(cmd) = deferred {
            handle_command(&mut wal, cmd);
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: Vec<PendingAppend>) {
    metrics::histogram!(WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let started = Instant::now();
    let result = write_batch(wal, &batch);
    metrics::histogram!(WAL_FLUSH_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

    for (_, tx) in batch {
        let reply = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(reply);
    }
}

fn write_batch(wal: &mut Wal, batch: &[PendingAppend]) -> io::Result<()> {
    let appended = batch.iter().try_for_each(|(event, _)| wal.append_buffered(event));
    // Flush even after a failed append so partial bytes don't leak into the next batch.
    let flushed = wal.flush_sync();
    appended.and(flushed)
}

fn handle_command(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Append { event, response } => commit_batch(wal, vec![(event, response)]),
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
    }
}

/// The booking scheduler: in-memory state rebuilt from the WAL, plus the
/// lock table that serializes check-then-act sequences.
pub struct Engine {
    pub store: InMemoryStore,
    wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
    /// One mutex per band or musician id.
    locks: DashMap<Ulid, Arc<Mutex<()>>>,
    /// Writers hold it shared; compaction holds it exclusively so no event
    /// lands between the snapshot and the file swap.
    commit_gate: RwLock<()>,
}

impl Engine {
    pub fn new(wal_path: PathBuf, notify: Arc<NotifyHub>) -> io::Result<Self> {
        let events = Wal::recover(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            store: InMemoryStore::new(),
            wal_tx,
            notify,
            locks: DashMap::new(),
            commit_gate: RwLock::new(()),
        };
        for event in &events {
            engine.store.apply_event(event);
        }
        Ok(engine)
    }

    /// Create the data dir, replay `bookings.wal`, install metrics and start
    /// the background compactor. The compactor stops once the last `Arc` is
    /// dropped.
    pub fn open(config: &Config) -> io::Result<Arc<Self>> {
        std::fs::create_dir_all(&config.data_dir)?;
        crate::observability::init(config.metrics_port).map_err(io::Error::other)?;

        let engine = Arc::new(Self::new(config.wal_path(), Arc::new(NotifyHub::new()))?);
        tokio::spawn(crate::compactor::run_compactor(
            Arc::downgrade(&engine),
            config.compact_threshold,
            config.compact_interval,
        ));

        info!("gigbook engine opened");
        info!("  data_dir: {}", config.data_dir.display());
        info!("  bookings recovered: {}", engine.store.all_bookings().len());
        info!(
            "  metrics: {}",
            config
                .metrics_port
                .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
        );
        Ok(engine)
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// WAL-append, apply to the store, notify the band's subscribers.
    async fn persist_and_apply(&self, event: &Event) -> Result<(), EngineError> {
        let _gate = self.commit_gate.read().await;
        self.wal_append(event).await?;
        self.store.apply_event(event);
        if let Some(band_id) = event.band_id() {
            self.notify.send(band_id, event);
        }
        Ok(())
    }

    /// Lock every id in sorted order to prevent deadlocks.
    async fn lock_all(&self, mut ids: Vec<Ulid>) -> Vec<OwnedMutexGuard<()>> {
        ids.sort();
        ids.dedup();
        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            let lock = self.locks.entry(id).or_default().clone();
            guards.push(lock.lock_owned().await);
        }
        guards
    }
}
