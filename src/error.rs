use thiserror::Error;

/// Errors raised at the crate boundary (frame ingestion, configuration, wire protocol).
///
/// The per-frame pipeline itself never fails: missing or degenerate data
/// surfaces as `None` in the metrics instead.
#[derive(Error, Debug)]
pub enum GaitError {
    #[error("invalid frame length: expected {expected} values, got {actual}")]
    InvalidFrameLength { expected: usize, actual: usize },

    #[error("invalid config value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("protocol decode error: {0}")]
    Decode(#[from] bincode::Error),

    #[error("connection closed")]
    ConnectionClosed,
}
