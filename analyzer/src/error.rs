//! Trace input errors
//!
//! Every variant is recovered locally: the analyzer logs it and reports an
//! empty result.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Trace file '{path}' does not exist")]
    NotFound { path: String },

    #[error("Failed to read trace file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Trace file '{path}' is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No '{field}' field found in trace")]
    MissingEvents { field: &'static str },

    #[error("'{field}' is not an array")]
    EventsNotArray { field: &'static str },
}

pub type InputResult<T> = Result<T, InputError>;
