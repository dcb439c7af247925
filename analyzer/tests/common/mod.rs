//! Common test utilities for analyzer tests
#![allow(dead_code, unused_imports)]

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};
use tempfile::NamedTempFile;

/// Standard trace documents
pub struct TestFixtures;

impl TestFixtures {
    /// Three matmul kernels, one non-kernel matmul and assorted noise
    pub fn matmul_trace() -> Value {
        json!({
            "traceEvents": [
                {"ph": "X", "cat": "kernel", "name": "matmul", "dur": 10.0, "ts": 1},
                {"ph": "X", "cat": "kernel", "name": "matmul", "dur": 20.0, "ts": 2},
                {"ph": "X", "cat": "kernel", "name": "matmul", "dur": 15.0, "ts": 3},
                {"ph": "X", "cat": "other", "name": "matmul", "dur": 500.0, "ts": 4},
                {"ph": "M", "name": "process_name", "args": {"name": "python"}},
                {"ph": "X", "cat": "kernel", "name": "softmax", "ts": 5}
            ],
            "displayTimeUnit": "ms"
        })
    }

    pub fn write_plain(trace: &Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(trace.to_string().as_bytes()).unwrap();
        file
    }

    pub fn write_gzip(trace: &Value) -> NamedTempFile {
        let file = tempfile::Builder::new().suffix(".json.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
        encoder.write_all(trace.to_string().as_bytes()).unwrap();
        encoder.finish().unwrap();
        file
    }

    pub fn write_raw(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }
}
