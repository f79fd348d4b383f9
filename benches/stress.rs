use std::sync::Arc;
use std::time::{Duration, Instant};

use ulid::Ulid;

use gigbook::engine::{Engine, EngineError};
use gigbook::model::{Band, Client, Musician};
use gigbook::notify::NotifyHub;

const HOUR: i64 = 3_600_000; // 1 hour in ms

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

/// One client, a pool of shared session players and `n_bands` four-piece bands
/// drawing from that pool.
struct Scene {
    client: Ulid,
    bands: Vec<Ulid>,
}

async fn setup(engine: &Engine, n_bands: usize) -> Scene {
    let instruments: Vec<Ulid> = (0..4).map(|_| Ulid::new()).collect();
    for (i, id) in instruments.iter().enumerate() {
        engine
            .register_instrument(*id, format!("instrument {i}"))
            .await
            .unwrap();
    }
    let style = Ulid::new();
    engine.register_style(style, "Rock".into()).await.unwrap();

    let mut players = Vec::new();
    for i in 0..n_bands * 2 {
        let id = Ulid::new();
        engine
            .register_musician(Musician {
                id,
                name: format!("player {i}"),
                email: None,
                phone: None,
                instruments: [instruments[i % 4]].into_iter().collect(),
                styles: [style].into_iter().collect(),
            })
            .await
            .unwrap();
        players.push(id);
    }

    let mut bands = Vec::new();
    for b in 0..n_bands {
        let id = Ulid::new();
        let members: Vec<Ulid> = (0..8).map(|k| players[(b * 4 + k) % players.len()]).collect();
        engine
            .register_band(Band {
                id,
                name: format!("band {b}"),
                required_instruments: instruments.clone(),
                styles: [style].into_iter().collect(),
                members,
            })
            .await
            .unwrap();
        bands.push(id);
    }

    let client = Ulid::new();
    engine
        .register_client(Client {
            id: client,
            name: "bench".into(),
            email: None,
            phone: None,
        })
        .await
        .unwrap();

    println!("  {} bands sharing {} musicians", bands.len(), players.len());
    Scene { client, bands }
}

async fn phase1_sequential(engine: &Engine, scene: &Scene) {
    let band = scene.bands[0];
    let n = 2000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let s = (i as i64) * HOUR;
        let t = Instant::now();
        engine
            .create_booking(scene.client, band, s, s + HOUR, "Austin".into(), "TX".into())
            .await
            .unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} bookings in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("create_booking", &mut latencies);
}

/// Every band books and staffs the same evenings, so assignments fight over
/// the shared musicians.
async fn phase2_contended_assign(engine: Arc<Engine>, scene: &Scene) {
    let n_per_band = 200;
    let base = 10_000 * HOUR;

    let start = Instant::now();
    let mut handles = Vec::new();
    for &band in &scene.bands {
        let engine = engine.clone();
        let client = scene.client;
        handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(n_per_band);
            let mut confirmed = 0usize;
            let mut short = 0usize;
            for j in 0..n_per_band {
                let s = base + (j as i64) * 24 * HOUR;
                let booking = engine
                    .create_booking(client, band, s, s + 3 * HOUR, "Austin".into(), "TX".into())
                    .await
                    .unwrap();
                let t = Instant::now();
                match engine.assign_musicians(booking.id).await {
                    Ok(_) => confirmed += 1,
                    Err(EngineError::NoMusicianForInstrument { .. }) => short += 1,
                    Err(e) => panic!("assign failed: {e}"),
                }
                latencies.push(t.elapsed());
            }
            (latencies, confirmed, short)
        }));
    }

    let mut all = Vec::new();
    let (mut confirmed, mut short) = (0, 0);
    for h in handles {
        let (lat, c, s) = h.await.unwrap();
        all.extend(lat);
        confirmed += c;
        short += s;
    }

    let elapsed = start.elapsed();
    let total = scene.bands.len() * n_per_band;
    println!(
        "  {} bands x {n_per_band} gigs = {total} in {:.2}s ({confirmed} confirmed, {short} short-handed)",
        scene.bands.len(),
        elapsed.as_secs_f64()
    );
    print_latency("assign_musicians", &mut all);
}

async fn phase3_read_under_load(engine: Arc<Engine>, scene: &Scene) {
    let band = scene.bands[0];
    let base = 100_000 * HOUR;

    let writer = {
        let engine = engine.clone();
        let client = scene.client;
        tokio::spawn(async move {
            for j in 0..1000i64 {
                let s = base + j * HOUR;
                let _ = engine
                    .create_booking(client, band, s, s + HOUR, "Austin".into(), "TX".into())
                    .await;
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        readers.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(500);
            for k in 0..500i64 {
                let s = base + (k % 1000) * HOUR;
                let t = Instant::now();
                engine.free_windows(&band, s, s + 24 * HOUR).unwrap();
                latencies.push(t.elapsed());
                tokio::task::yield_now().await;
            }
            latencies
        }));
    }

    writer.await.unwrap();
    let mut all = Vec::new();
    for r in readers {
        all.extend(r.await.unwrap());
    }
    print_latency("free_windows", &mut all);
}

async fn phase4_compaction(engine: &Engine) {
    let appends = engine.wal_appends_since_compact().await;
    let t = Instant::now();
    engine.compact_wal().await.unwrap();
    println!(
        "  compacted {appends} appends into {} bookings in {:.2}ms",
        engine.list_bookings().len(),
        t.elapsed().as_secs_f64() * 1000.0
    );
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::ERROR)
        .init();

    let n_bands: usize = std::env::var("GIGBOOK_BENCH_BANDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    let dir = std::env::temp_dir().join(format!("gigbook_bench_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let engine = Arc::new(Engine::new(dir.join("bookings.wal"), Arc::new(NotifyHub::new())).unwrap());

    println!("=== gigbook stress benchmark ===");
    println!("wal: {}\n", dir.display());

    println!("[setup]");
    let scene = setup(&engine, n_bands).await;

    println!("\n[phase 1] sequential booking throughput");
    phase1_sequential(&engine, &scene).await;

    println!("\n[phase 2] contended lineup assignment");
    phase2_contended_assign(engine.clone(), &scene).await;

    println!("\n[phase 3] free-window reads under write load");
    phase3_read_under_load(engine.clone(), &scene).await;

    println!("\n[phase 4] WAL compaction");
    phase4_compaction(&engine).await;

    let _ = std::fs::remove_dir_all(&dir);
    println!("\n=== benchmark complete ===");
}
