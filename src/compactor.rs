use std::sync::Weak;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::Engine;

/// Background task that rewrites the WAL once enough appends have piled up
/// since the last compaction. Exits when the engine has been dropped.
pub async fn run_compactor(engine: Weak<Engine>, threshold: u64, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let Some(engine) = engine.upgrade() else {
            debug!("engine dropped, compactor exiting");
            return;
        };
        if compact_if_due(&engine, threshold).await {
            info!("compacted WAL");
        }
    }
}

/// One compactor pass. Returns true if the WAL was rewritten.
pub(crate) async fn compact_if_due(engine: &Engine, threshold: u64) -> bool {
    let appends = engine.wal_appends_since_compact().await;
    if appends == 0 || appends < threshold {
        return false;
    }
    debug!(appends, threshold, "WAL over compaction threshold");
    match engine.compact_wal().await {
        Ok(()) => true,
        Err(e) => {
            warn!("WAL compaction failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyHub;
    use crate::wal::Wal;
    use std::path::PathBuf;
    use std::sync::Arc;
    use ulid::Ulid;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("gigbook_test_compactor");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[tokio::test]
    async fn below_threshold_is_skipped() {
        let path = test_wal_path("below_threshold.wal");
        let engine = Engine::new(path, Arc::new(NotifyHub::new())).unwrap();

        assert!(!compact_if_due(&engine, 10).await);
        engine
            .register_instrument(Ulid::new(), "Guitar".into())
            .await
            .unwrap();
        assert!(!compact_if_due(&engine, 10).await);
        assert_eq!(engine.wal_appends_since_compact().await, 1);
    }

    #[tokio::test]
    async fn over_threshold_compacts_and_keeps_state() {
        let path = test_wal_path("over_threshold.wal");
        let engine = Engine::new(path.clone(), Arc::new(NotifyHub::new())).unwrap();

        let ids: Vec<Ulid> = (0..5).map(|_| Ulid::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            engine
                .register_style(*id, format!("style {i}"))
                .await
                .unwrap();
        }

        assert!(compact_if_due(&engine, 3).await);
        assert_eq!(engine.wal_appends_since_compact().await, 0);

        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed.len(), ids.len());
    }

    #[tokio::test]
    async fn compactor_exits_after_engine_drop() {
        let path = test_wal_path("exits_after_drop.wal");
        let engine = Arc::new(Engine::new(path, Arc::new(NotifyHub::new())).unwrap());
        let task = tokio::spawn(run_compactor(
            Arc::downgrade(&engine),
            1000,
            Duration::from_millis(10),
        ));

        drop(engine);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("compactor still running after engine drop")
            .unwrap();
    }
}
