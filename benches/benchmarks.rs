use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mimeinfo::test_support::{CacheWriter, MatchletSpec};
use mimeinfo::{glob_match, Cache, Engine};

fn fixture() -> CacheWriter {
    let mut w = CacheWriter::new();
    for (suffix, mime) in [
        (".txt", "text/plain"),
        (".html", "text/html"),
        (".png", "image/png"),
        (".jpg", "image/jpeg"),
        (".gz", "application/gzip"),
        (".tar.gz", "application/x-compressed-tar"),
        (".json", "application/json"),
        (".xml", "application/xml"),
        (".pdf", "application/pdf"),
        (".zip", "application/zip"),
    ] {
        w.add_suffix(suffix, mime, 50, false);
    }
    w.add_literal("Makefile", "text/x-makefile", 50, true);
    w.add_glob("README*", "text/x-readme", 10, true);
    w.add_magic("image/png", 50, vec![MatchletSpec::new(0, 1, b"\x89PNG\r\n\x1a\n")]);
    w.add_magic("image/jpeg", 50, vec![MatchletSpec::new(0, 1, b"\xff\xd8\xff")]);
    w.add_magic(
        "application/zip",
        45,
        vec![MatchletSpec::new(0, 1, b"PK\x03\x04")],
    );
    w.add_magic(
        "text/html",
        40,
        vec![MatchletSpec::new(0, 256, b"<html")],
    );
    w
}

fn engine() -> (Engine, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mime.cache");
    std::fs::write(&path, fixture().finish()).unwrap();
    (Engine::load([path]).unwrap(), dir)
}

// Benchmark raw glob pattern matching
fn bench_glob_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("glob_match");

    let test_cases = vec![
        ("suffix", "*.tar.gz", "backup-2024-01-01.tar.gz"),
        ("literal_miss", "Makefile", "configure.ac"),
        ("wildcards", "*.c??", "module.cpp"),
        ("class", "file[0-9][0-9].log", "file42.log"),
    ];

    for (name, pattern, filename) in test_cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), &(pattern, filename), |b, &(p, f)| {
            b.iter(|| glob_match(black_box(p), black_box(f), true));
        });
    }

    group.finish();
}

// Benchmark the full filename query path
fn bench_type_for_file_name(c: &mut Criterion) {
    let (engine, _dir) = engine();
    let mut group = c.benchmark_group("type_for_file_name");

    for name in ["photo.png", "archive.tar.gz", "Makefile", "unknown.qqq"] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &name, |b, &n| {
            b.iter(|| engine.type_for_file(black_box(n), None));
        });
    }

    group.finish();
}

// Benchmark magic sniffing over content prefixes
fn bench_type_for_data(c: &mut Criterion) {
    let (engine, _dir) = engine();
    let mut group = c.benchmark_group("type_for_data");

    let png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR".to_vec();
    let mut html = vec![b' '; 200];
    html.extend_from_slice(b"<html><body>hi</body></html>");
    let miss = vec![0u8; 512];

    for (name, data) in [("png_first_rule", &png), ("html_scanned", &html), ("no_match", &miss)] {
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), data, |b, d| {
            b.iter(|| engine.type_for_data(black_box(d)));
        });
    }

    group.finish();
}

// Benchmark cache decode from an in-memory image
fn bench_cache_load(c: &mut Criterion) {
    let image = fixture().finish();
    let mut group = c.benchmark_group("cache_load");
    group.throughput(Throughput::Bytes(image.len() as u64));
    group.bench_function("from_bytes", |b| {
        b.iter(|| Cache::from_bytes(black_box(&image), "bench.cache").unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_glob_match,
    bench_type_for_file_name,
    bench_type_for_data,
    bench_cache_load
);
criterion_main!(benches);
