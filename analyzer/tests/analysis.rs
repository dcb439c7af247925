//! End-to-end trace analysis from files on disk

use std::path::Path;

use analyzer::{InputError, KernelStat, analyze_trace_file, try_analyze_trace_file};

mod common;
use common::TestFixtures;

fn matmul_row() -> KernelStat {
    KernelStat {
        kernel: "matmul".to_string(),
        total_duration_us: 45.0,
        count: 3,
        avg_duration_us: 15.0,
    }
}

#[test]
fn test_plain_trace_file() {
    let file = TestFixtures::write_plain(&TestFixtures::matmul_trace());

    let stats = analyze_trace_file(file.path(), "kernel");

    assert_eq!(stats, vec![matmul_row()]);
}

#[test]
fn test_gzip_trace_file() {
    let file = TestFixtures::write_gzip(&TestFixtures::matmul_trace());

    let stats = analyze_trace_file(file.path(), "kernel");

    assert_eq!(stats, vec![matmul_row()]);
}

#[test]
fn test_other_category_from_file() {
    let file = TestFixtures::write_plain(&TestFixtures::matmul_trace());

    let stats = analyze_trace_file(file.path(), "other");

    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].total_duration_us, 500.0);
}

#[test]
fn test_missing_file_yields_empty() {
    let path = Path::new("/definitely/not/a/trace.json");

    assert!(analyze_trace_file(path, "kernel").is_empty());
    assert!(matches!(
        try_analyze_trace_file(path, "kernel"),
        Err(InputError::NotFound { .. })
    ));
}

#[test]
fn test_invalid_json_yields_empty() {
    let file = TestFixtures::write_raw("{\"traceEvents\": [");

    assert!(analyze_trace_file(file.path(), "kernel").is_empty());
    assert!(matches!(
        try_analyze_trace_file(file.path(), "kernel"),
        Err(InputError::Json { .. })
    ));
}

#[test]
fn test_missing_events_field_yields_empty() {
    let file = TestFixtures::write_raw(r#"{"events": []}"#);

    assert!(analyze_trace_file(file.path(), "kernel").is_empty());
    assert!(matches!(
        try_analyze_trace_file(file.path(), "kernel"),
        Err(InputError::MissingEvents { .. })
    ));
}

#[test]
fn test_empty_file_yields_empty() {
    let file = TestFixtures::write_raw("");
    assert!(analyze_trace_file(file.path(), "kernel").is_empty());
}
