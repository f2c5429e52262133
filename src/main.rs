use nodetable::*;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Node {
    #[allow(dead_code)]
    ino: u64,
}

type Handle = Arc<Node>;
type DynTable = Arc<dyn NodeTable<u64, Handle>>;

const KEYS: u64 = 100_000;
const THREADS: u64 = 8;

fn benchmark<F>(name: &str, iterations: u64, mut f: F)
where
    F: FnMut(u64),
{
    let start = Instant::now();
    for i in 0..iterations {
        f(i);
    }
    report(name, iterations, start);
}

fn report(name: &str, ops: u64, start: Instant) {
    let elapsed = start.elapsed();
    let ops_per_sec = ops as f64 / elapsed.as_secs_f64();
    let ns_per_op = elapsed.as_nanos() / ops as u128;

    println!("{}", name);
    println!("  Total time: {:?}", elapsed);
    println!("  Ops/sec: {:.2}", ops_per_sec);
    println!("  ns/op: {}", ns_per_op);
    println!();
}

fn run_benchmarks(table: &DynTable, label: &str) {
    println!("{}\n", label);

    println!(" Single-threaded \n");

    let node = Arc::new(Node::default());
    benchmark("Set (sequential ids)", KEYS, |i| {
        table.set(i, Arc::clone(&node));
    });

    benchmark("Get (random hits)", KEYS, |_| {
        let _ = table.get(&(rand::random::<u64>() % KEYS));
    });

    benchmark("Get (misses)", KEYS, |i| {
        let _ = table.get(&(KEYS + i));
    });

    println!(" Multi-threaded ({} threads) \n", THREADS);

    let start = Instant::now();
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let table = Arc::clone(table);
            thread::spawn(move || {
                for _ in 0..KEYS {
                    let _ = table.get(&(rand::random::<u64>() % KEYS));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    report("Concurrent reads", KEYS * THREADS, start);

    let start = Instant::now();
    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let table = Arc::clone(table);
            thread::spawn(move || {
                for i in 0..KEYS {
                    let ino = KEYS * (thread_id + 1) + i;
                    match i % 3 {
                        0 => table.set(ino, Arc::new(Node { ino })),
                        1 => {
                            let _ = table.get(&(ino - 1));
                        }
                        _ => table.delete(&(ino - 2)),
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    report("Mixed set/get/delete", KEYS * THREADS, start);

    let start = Instant::now();
    for i in 0..KEYS {
        table.delete(&i);
    }
    report("Delete (drain)", KEYS, start);

    println!("Final table size: {}\n", table.count());
}

fn load_config() -> std::result::Result<MapConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            let config = MapConfig::from_toml_str(&text)?;
            info!(%path, ?config, "loaded table config");
            Ok(config)
        }
        None => Ok(MapConfig::default()),
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let base = load_config()?;

    for backend in [Backend::Sharded, Backend::Simple] {
        let config = MapConfig {
            backend,
            ..base.clone()
        };
        let table: DynTable = Arc::from(config.build::<u64, Handle>()?);
        run_benchmarks(&table, &format!("NODE TABLE BENCHMARKS ({:?})", backend));
    }

    println!(" Pool reuse (sharded) \n");

    let map: ShardedMap<u64, Handle> = ShardedMap::with_config(&base)?;
    for round in 0..4 {
        for i in 0..KEYS {
            map.set(i, Arc::new(Node { ino: i }));
        }
        for i in 0..KEYS - KEYS / 100 {
            map.delete(&i);
        }
        map.force_compact();
        let stats = map.pool_stats();
        println!(
            "  round {}: live {}, pool hits {}, misses {}, recycled {}, discarded {}, pooled {}",
            round,
            map.count(),
            stats.hits,
            stats.misses,
            stats.recycled,
            stats.discarded,
            stats.pooled
        );
        for i in KEYS - KEYS / 100..KEYS {
            map.delete(&i);
        }
    }

    Ok(())
}
