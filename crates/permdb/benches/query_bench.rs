use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use permdb::{Database, Entry, APPS_TABLE, MAIN_TABLE};
use std::collections::BTreeMap;
use std::path::Path;
use table::TableBuilder;
use tempfile::tempdir;

const N: usize = 1_000;
const APPS: usize = 16;

fn app(i: usize) -> String {
    format!("org.example.App{:02}", i % APPS)
}

fn sample_entry(i: usize) -> Entry {
    (0..4).fold(Entry::new(vec![(i % 7) as u8; 32]), |e, k| {
        e.set_application_permissions(&app(i + k), ["read", "write"])
    })
}

fn write_base(path: &Path) {
    let mut b = TableBuilder::new();
    let mut apps: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for i in 0..N {
        let id = format!("id{:05}", i);
        let e = sample_entry(i);
        for a in e.list_applications() {
            apps.entry(a.to_owned()).or_default().push(id.clone());
        }
        b.insert(MAIN_TABLE, id, e.encode());
    }
    for (a, ids) in apps {
        b.insert(APPS_TABLE, a, entry::encode_id_list(&ids));
    }
    b.write(path).unwrap();
}

fn db_lookup(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.db");
    write_base(&path);
    let mut db = Database::open(&path).unwrap();
    for i in (0..N).step_by(10) {
        db.set_entry(&format!("id{:05}", i), Some(sample_entry(i + 1)));
    }

    c.bench_function("db_lookup_1k", |b| {
        b.iter(|| {
            for i in 0..N {
                let _ = db.lookup(&format!("id{:05}", i)).unwrap();
            }
        });
    });

    c.bench_function("db_list_ids_by_application", |b| {
        b.iter(|| db.list_ids_by_application(&app(3)).unwrap());
    });

    c.bench_function("db_list_ids_by_value", |b| {
        b.iter(|| db.list_ids_by_value(&[3u8; 32]).unwrap());
    });
}

fn entry_set_permissions(c: &mut Criterion) {
    c.bench_function("entry_set_application_permissions_64", |b| {
        b.iter_batched(
            || Entry::new(vec![1u8]),
            |mut e| {
                for i in 0..64 {
                    e = e.set_application_permissions(&format!("app{:03}", (i * 37) % 64), ["p"]);
                }
                e
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, db_lookup, entry_set_permissions);
criterion_main!(benches);
