use docket_bench::make_file_topics;
use docket_core::never_cancel;
use docket_storage::CodeDb;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::TempDir;

const FILE: u32 = 1;
const TOPICS: usize = 500;

/// Open a fresh database holding `TOPICS` topics in `FILE`.
fn populated_db() -> (TempDir, CodeDb) {
    let dir = TempDir::new().unwrap();
    let db = CodeDb::open(&dir.path().join("bench.db")).unwrap();
    {
        let mut accessor = db.accessor().unwrap();
        accessor.get_read_possible_write_lock().unwrap();
        let mut topics = make_file_topics(FILE, TOPICS, 3);
        accessor
            .update_topics_in_file(FILE, &mut topics, &never_cancel)
            .unwrap();
    }
    (dir, db)
}

/// Benchmark reconciling a file into an empty database, which adds every
/// topic in one transaction.
fn bench_reconcile_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_add");

    group.bench_function(format!("{TOPICS}_topics"), |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().unwrap();
                let db = CodeDb::open(&dir.path().join("bench.db")).unwrap();
                (dir, db, make_file_topics(FILE, TOPICS, 3))
            },
            |(_dir, db, mut topics)| {
                let mut accessor = db.accessor().unwrap();
                accessor.get_read_possible_write_lock().unwrap();
                let summary = accessor
                    .update_topics_in_file(FILE, &mut topics, &never_cancel)
                    .unwrap();
                assert_eq!(summary.added, TOPICS);
            },
            BatchSize::PerIteration,
        );
    });

    group.finish();
}

/// Benchmark reconciling an unchanged file. Nothing is written, so this is
/// the cost of loading and matching alone.
fn bench_reconcile_unchanged(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_unchanged");
    let (_dir, db) = populated_db();
    let mut accessor = db.accessor().unwrap();
    accessor.get_read_possible_write_lock().unwrap();

    group.bench_function(format!("{TOPICS}_topics"), |b| {
        b.iter_batched(
            || make_file_topics(FILE, TOPICS, 3),
            |mut topics| {
                let summary = accessor
                    .update_topics_in_file(FILE, &mut topics, &never_cancel)
                    .unwrap();
                assert!(!summary.committed);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark reconciling after a line was inserted at the top of the file,
/// which moves every topic down.
fn bench_reconcile_shifted(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_shifted");
    let (_dir, db) = populated_db();
    let mut accessor = db.accessor().unwrap();
    accessor.get_read_possible_write_lock().unwrap();
    let mut first_line = 3;

    group.bench_function(format!("{TOPICS}_topics"), |b| {
        b.iter_batched(
            || {
                first_line += 1;
                make_file_topics(FILE, TOPICS, first_line)
            },
            |mut topics| {
                let summary = accessor
                    .update_topics_in_file(FILE, &mut topics, &never_cancel)
                    .unwrap();
                assert_eq!(summary.updated, TOPICS);
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_reconcile_add,
    bench_reconcile_unchanged,
    bench_reconcile_shifted
);
criterion_main!(benches);
