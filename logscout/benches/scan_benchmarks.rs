use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use logscout::{scan, search::LineMatcher, EncodingMode, ScanConfig, ScanRequest};
use std::{fs, fs::File, io::Write, num::NonZeroUsize, path::Path};
use tempfile::tempdir;

fn create_test_files(root: &Path, file_count: usize, lines_per_file: usize) -> std::io::Result<()> {
    for i in 0..file_count {
        let dir = root.join(format!("service_{}", i % 8));
        fs::create_dir_all(&dir)?;
        let mut file = File::create(dir.join(format!("app_{}.log", i)))?;
        for j in 0..lines_per_file {
            if j % 50 == 0 {
                writeln!(file, "2024-01-01T00:00:{:02} ERROR request {} failed", j % 60, j)?;
            } else {
                writeln!(file, "2024-01-01T00:00:{:02} INFO request {} served", j % 60, j)?;
            }
        }
    }
    Ok(())
}

fn build_request(root: &Path, output: &Path, threads: usize, encoding: EncodingMode) -> ScanRequest {
    ScanConfig {
        thread_count: NonZeroUsize::new(threads).unwrap(),
        search_text: "error".to_string(),
        input_dir: root.to_path_buf(),
        output_path: output.to_path_buf(),
        encoding_mode: encoding,
        ..ScanConfig::default()
    }
    .validate()
    .unwrap()
}

fn bench_thread_scaling(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let root = dir.path().join("logs");
    create_test_files(&root, 200, 500).unwrap();
    let output = dir.path().join("out.txt");

    let mut group = c.benchmark_group("Thread Scaling");
    for threads in [1, 2, 4, 8] {
        let request = build_request(&root, &output, threads, EncodingMode::Latin1);
        group.bench_with_input(BenchmarkId::from_parameter(threads), &request, |b, request| {
            b.iter(|| {
                let _ = fs::remove_file(&output);
                black_box(scan(request).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_encoding(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let root = dir.path().join("logs");
    create_test_files(&root, 50, 2000).unwrap();
    let output = dir.path().join("out.txt");

    let mut group = c.benchmark_group("Encoding");
    for encoding in [EncodingMode::Latin1, EncodingMode::Utf8] {
        let request = build_request(&root, &output, 4, encoding);
        group.bench_function(encoding.to_string(), |b| {
            b.iter(|| {
                let _ = fs::remove_file(&output);
                black_box(scan(&request).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_line_matcher(c: &mut Criterion) {
    let ascii = LineMatcher::new("timeout");
    let unicode = LineMatcher::new("ÉCHEC");
    let line = "2024-01-01T00:00:00 WARN upstream call to billing-service took 2301ms before TIMEOUT";

    let mut group = c.benchmark_group("Line Matcher");
    group.bench_function("ascii", |b| b.iter(|| black_box(ascii.is_match(black_box(line)))));
    group.bench_function("unicode", |b| b.iter(|| black_box(unicode.is_match(black_box(line)))));
    group.finish();
}

criterion_group!(benches, bench_thread_scaling, bench_encoding, bench_line_matcher);
criterion_main!(benches);
