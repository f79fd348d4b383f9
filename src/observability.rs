use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::engine::EngineError;

// ── Scheduler operations ────────────────────────────────────────

/// Counter: exposed mutations. Labels: operation, outcome.
pub const OPERATIONS_TOTAL: &str = "gigbook_operations_total";

/// Histogram: lineup assignment latency in seconds.
pub const ASSIGNMENT_DURATION_SECONDS: &str = "gigbook_assignment_duration_seconds";

/// Histogram: musicians per confirmed lineup.
pub const LINEUP_SIZE: &str = "gigbook_lineup_size";

// ── Storage ─────────────────────────────────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "gigbook_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "gigbook_wal_flush_batch_size";

/// Counter: completed WAL compactions.
pub const WAL_COMPACTIONS_TOTAL: &str = "gigbook_wal_compactions_total";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Record one operation outcome.
pub fn record<T>(operation: &'static str, result: &Result<T, EngineError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => error_label(e),
    };
    metrics::counter!(OPERATIONS_TOTAL, "operation" => operation, "outcome" => outcome).increment(1);
}

/// Map an error variant to a short outcome label.
pub fn error_label(err: &EngineError) -> &'static str {
    match err {
        EngineError::NotFound(..) => "not_found",
        EngineError::AlreadyExists(..) => "already_exists",
        EngineError::InvalidTimeRange { .. } => "invalid_time_range",
        EngineError::BandUnavailable { .. } => "band_unavailable",
        EngineError::AlreadyAssigned(_) => "already_assigned",
        EngineError::InstrumentsNotDefined(_) => "instruments_not_defined",
        EngineError::NoMusicianForInstrument { .. } => "no_musician",
        EngineError::AlreadyCompleted(_) => "already_completed",
        EngineError::AlreadyCancelled(_) => "already_cancelled",
        EngineError::IllegalTransition { .. } => "illegal_transition",
        EngineError::LimitExceeded(_) => "limit_exceeded",
        EngineError::WalError(_) => "wal_error",
    }
}
