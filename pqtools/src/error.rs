//! Error taxonomy for decoding, streaming and buffering

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("truncated record: read {read} of {expected} bytes")]
    Truncated { read: usize, expected: usize },

    #[error("record type not recognized: 0x{0:08x}")]
    UnknownRecordType(u32),

    #[error("unsupported mode: {0}")]
    Mode(String),

    #[error("invalid options: {0}")]
    Options(String),

    #[error("queue is full at capacity {capacity}; increase the queue size")]
    QueueOverflow { capacity: usize },

    #[error("queue is empty")]
    QueueEmpty,

    #[error("event at {value} is below the current window [{lower}, {upper}); input is not sorted")]
    OutOfOrder { value: u64, lower: u64, upper: u64 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not parse {field}: {value}")]
    Parse { field: &'static str, value: String },

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
