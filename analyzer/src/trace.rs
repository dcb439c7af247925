//! Trace file loading
//!
//! Chrome trace-event documents, plain or gzip-compressed. Compression is
//! detected from the gzip magic bytes, not the file name.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use flate2::read::GzDecoder;
use serde_json::Value;
use tracing::debug;

use crate::error::{InputError, InputResult};

/// Top-level field holding the event records
pub const TRACE_EVENTS_FIELD: &str = "traceEvents";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read and parse a trace document
pub fn load_trace(path: &Path) -> InputResult<Value> {
    let shown = path.display().to_string();
    let io_error = |source: std::io::Error| InputError::Io {
        path: shown.clone(),
        source,
    };

    let file = File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => InputError::NotFound { path: shown.clone() },
        _ => io_error(source),
    })?;

    let mut reader = BufReader::new(file);
    let compressed = reader.fill_buf().map_err(io_error)?.starts_with(&GZIP_MAGIC);
    debug!("Loading trace {} (gzip: {})", shown, compressed);

    let parsed = if compressed {
        serde_json::from_reader(BufReader::new(GzDecoder::new(reader)))
    } else {
        serde_json::from_reader(reader)
    };

    parsed.map_err(|source| InputError::Json { path: shown, source })
}

/// The event records of a loaded trace
pub fn trace_events(trace: &Value) -> InputResult<&[Value]> {
    let events = trace.get(TRACE_EVENTS_FIELD).ok_or(InputError::MissingEvents {
        field: TRACE_EVENTS_FIELD,
    })?;

    events.as_array().map(Vec::as_slice).ok_or(InputError::EventsNotArray {
        field: TRACE_EVENTS_FIELD,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_field_required() {
        let err = trace_events(&json!({"otherEvents": []})).unwrap_err();
        assert!(matches!(err, InputError::MissingEvents { .. }));

        let err = trace_events(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, InputError::MissingEvents { .. }));
    }

    #[test]
    fn test_events_must_be_array() {
        let err = trace_events(&json!({"traceEvents": {"cat": "kernel"}})).unwrap_err();
        assert!(matches!(err, InputError::EventsNotArray { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = load_trace(Path::new("/no/such/trace.json")).unwrap_err();
        assert!(matches!(err, InputError::NotFound { .. }));
    }
}
