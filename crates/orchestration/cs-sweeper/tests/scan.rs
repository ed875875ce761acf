//! Scanner integration tests against a paginating stub backend.

mod common;

use std::sync::atomic::Ordering;

use chrono::Duration;
use common::{StubBackend, at, file, provider};
use cs_error::SweepError;
use cs_sweeper::{CompiledPatterns, Scanner};
use cs_types::{FileDescriptor, FileTypeSummary};
use futures::{StreamExt, TryStreamExt};

fn scanner(
    backend: StubBackend,
    bucket_pattern: &str,
    key_pattern: &str,
) -> Scanner<common::StubProvider> {
    let patterns = CompiledPatterns::new(bucket_pattern, key_pattern).unwrap();
    Scanner::new(provider(backend), patterns, at(2024, 1, 1))
}

fn keys(files: &[FileDescriptor]) -> Vec<String> {
    files.iter().map(|f| format!("{}/{}", f.bucket, f.key)).collect()
}

#[tokio::test]
async fn test_only_matching_old_log_in_test_bucket() {
    let old = at(2023, 6, 1);
    let backend = StubBackend::new()
        .with_bucket(
            "test-1",
            vec![
                file("test-1", "app.log", 10, old),
                file("test-1", "app.txt", 10, old),
                file("test-1", "new.log", 10, at(2024, 2, 1)),
            ],
        )
        .with_bucket("prod-1", vec![file("prod-1", "app.log", 10, old)]);

    let scanner = scanner(backend, "test-.*", "*.log");
    let files: Vec<FileDescriptor> = scanner.scan().try_collect().await.unwrap();

    assert_eq!(keys(&files), vec!["test-1/app.log"]);
}

#[tokio::test]
async fn test_cutoff_is_strict() {
    let cutoff = at(2024, 1, 1);
    let backend = StubBackend::new().with_bucket(
        "b",
        vec![
            file("b", "exactly.log", 1, cutoff),
            file("b", "just-before.log", 1, cutoff - Duration::milliseconds(1)),
            file("b", "after.log", 1, cutoff + Duration::seconds(1)),
        ],
    );

    let files: Vec<FileDescriptor> =
        scanner(backend, ".*", "*").scan().try_collect().await.unwrap();

    assert_eq!(keys(&files), vec!["b/just-before.log"]);
}

#[tokio::test]
async fn test_every_result_satisfies_all_filters() {
    let old = at(2022, 1, 1);
    let mut files_a = Vec::new();
    let mut files_b = Vec::new();
    for i in 0..20 {
        let modified = if i % 3 == 0 { at(2025, 1, 1) } else { old };
        let ext = if i % 2 == 0 { "log" } else { "tmp" };
        files_a.push(file("logs-a", &format!("dir/{i}/f.{ext}"), i, modified));
        files_b.push(file("other", &format!("dir/{i}/f.{ext}"), i, modified));
    }

    let backend = StubBackend::new()
        .with_bucket("logs-a", files_a)
        .with_bucket("other", files_b);

    let scanner = scanner(backend, "^logs-", "dir/*.log");
    let files: Vec<FileDescriptor> = scanner.scan().try_collect().await.unwrap();

    assert!(!files.is_empty());
    for f in &files {
        assert!(scanner.patterns().matches_bucket(&f.bucket));
        assert!(scanner.patterns().matches_key(&f.key));
        assert!(f.last_modified < scanner.cutoff());
    }
    // i in 0..20, even and not a multiple of 3: 2, 4, 8, 10, 14, 16
    assert_eq!(files.len(), 6);
}

#[tokio::test]
async fn test_provider_order_is_preserved() {
    let old = at(2023, 1, 1);
    let backend = StubBackend::new()
        .with_bucket("z", vec![file("z", "b", 1, old), file("z", "a", 1, old)])
        .with_bucket("a", vec![file("a", "c", 1, old)]);

    let files: Vec<FileDescriptor> =
        scanner(backend, ".*", "*").scan().try_collect().await.unwrap();

    assert_eq!(keys(&files), vec!["z/b", "z/a", "a/c"]);
}

#[tokio::test]
async fn test_scan_is_lazy() {
    let backend = StubBackend::new().with_synthetic_bucket("big", 10_500, at(2020, 1, 1));
    let scanner = scanner(backend, ".*", "*.log");

    let consumed: Vec<_> = scanner.scan().take(2_500).collect().await;
    assert_eq!(consumed.len(), 2_500);

    // 2500 items from 1000-entry pages: at most 2500 / 1000 + 1 pages
    let pages = scanner_pages(&scanner);
    assert!(pages <= 3, "requested {pages} pages");
}

#[tokio::test]
async fn test_full_synthetic_scan() {
    let backend = StubBackend::new().with_synthetic_bucket("big", 10_500, at(2020, 1, 1));
    let scanner = scanner(backend, ".*", "*");

    let count = scanner.scan().try_fold(0usize, |n, _| async move { Ok(n + 1) }).await.unwrap();

    assert_eq!(count, 10_500);
    assert_eq!(scanner_pages(&scanner), 11);
}

fn scanner_pages(scanner: &Scanner<common::StubProvider>) -> usize {
    scanner_backend(scanner).object_pages.load(Ordering::SeqCst)
}

fn scanner_backend(scanner: &Scanner<common::StubProvider>) -> &StubBackend {
    scanner.provider().backend()
}

#[tokio::test]
async fn test_rescan_reissues_calls() {
    let old = at(2023, 1, 1);
    let backend = StubBackend::new().with_bucket("b", vec![file("b", "x.log", 1, old)]);
    let scanner = scanner(backend, ".*", "*");

    let first: Vec<FileDescriptor> = scanner.scan().try_collect().await.unwrap();
    let second: Vec<FileDescriptor> = scanner.scan().try_collect().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(scanner_pages(&scanner), 2);
    assert_eq!(scanner_backend(&scanner).bucket_pages.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_bucket_is_skipped() {
    let old = at(2023, 1, 1);
    let backend = StubBackend::new()
        .with_bucket("a", vec![file("a", "1.log", 1, old)])
        .with_missing_bucket("gone")
        .with_bucket("c", vec![file("c", "2.log", 1, old)]);

    let files: Vec<FileDescriptor> =
        scanner(backend, ".*", "*").scan().try_collect().await.unwrap();

    assert_eq!(keys(&files), vec!["a/1.log", "c/2.log"]);
}

#[tokio::test]
async fn test_inaccessible_bucket_is_skipped() {
    let old = at(2023, 1, 1);
    let backend = StubBackend::new()
        .with_bucket("a", vec![file("a", "1.log", 1, old)])
        .with_inaccessible_bucket("locked")
        .with_bucket("c", vec![file("c", "2.log", 1, old)]);

    let scanner = scanner(backend, ".*", "*");
    let files: Vec<FileDescriptor> = scanner.scan().try_collect().await.unwrap();

    assert_eq!(keys(&files), vec!["a/1.log", "c/2.log"]);
    // Listing went on to the bucket after the locked one
    assert_eq!(scanner_pages(&scanner), 3);
}

#[tokio::test]
async fn test_authentication_error_ends_scan() {
    let old = at(2023, 1, 1);
    let backend = StubBackend::new()
        .with_bucket("a", vec![file("a", "1.log", 1, old)])
        .with_unauthenticated_bucket("locked")
        .with_bucket("c", vec![file("c", "2.log", 1, old)]);

    let results: Vec<_> = scanner(backend, ".*", "*").scan().collect().await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().key, "1.log");
    assert!(matches!(results[1], Err(SweepError::Authentication(_))));
}

#[tokio::test]
async fn test_prefix_is_passed_to_listing() {
    let old = at(2023, 1, 1);
    let backend = StubBackend::new().with_bucket(
        "b",
        vec![file("b", "logs/a.log", 1, old), file("b", "data/b.log", 1, old)],
    );

    let scanner = scanner(backend, ".*", "*").with_prefix("logs/");
    let files: Vec<FileDescriptor> = scanner.scan().try_collect().await.unwrap();

    assert_eq!(keys(&files), vec!["b/logs/a.log"]);
    let prefixes = scanner_backend(&scanner).prefixes.lock().clone();
    assert!(prefixes.iter().all(|p| p.as_deref() == Some("logs/")));
}

#[tokio::test]
async fn test_matching_buckets() {
    let backend = StubBackend::new()
        .with_bucket("test-1", vec![])
        .with_bucket("prod-1", vec![])
        .with_bucket("my-test-2", vec![]);

    let names: Vec<String> = scanner(backend, "test-", "*")
        .matching_buckets()
        .map_ok(|b| b.name)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(names, vec!["test-1", "my-test-2"]);
}

#[tokio::test]
async fn test_file_types_per_bucket() {
    let old = at(2023, 1, 1);
    let backend = StubBackend::new()
        .with_bucket(
            "a",
            vec![
                file("a", "x.log", 10, old),
                file("a", "README", 3, old),
                file("a", "y.log", 5, old),
                file("a", "z.gz", 7, old),
                file("a", "new.log", 100, at(2024, 6, 1)),
            ],
        )
        .with_bucket("b", vec![file("b", "c.csv", 1, old)]);

    let summaries: Vec<FileTypeSummary> = scanner(backend, ".*", "*")
        .file_types()
        .try_collect()
        .await
        .unwrap();

    let rows: Vec<(&str, &str, u64, u64)> = summaries
        .iter()
        .map(|s| (s.bucket.as_str(), s.extension.as_str(), s.file_count, s.total_size))
        .collect();

    assert_eq!(
        rows,
        vec![
            ("a", "(no ext)", 1, 3),
            ("a", ".gz", 1, 7),
            ("a", ".log", 2, 15),
            ("b", ".csv", 1, 1),
        ]
    );
}
