use thiserror::Error;

/// Failure to obtain the raw bytes of a source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to turn source bytes into an event table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("row {row}: {message}")]
    Row { row: usize, message: String },

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("term '{0}' contains ';', which is reserved as the export separator")]
    ReservedSeparator(String),
}

/// Errors raised while scoring descriptions against dictionary terms.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("text was never encoded: {0:?}")]
    NotEncoded(String),

    #[error("vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("encoder failed: {0}")]
    Encoder(String),

    #[error("encoder returned {got} vectors for {expected} inputs")]
    BatchSize { expected: usize, got: usize },

    #[error("threshold {value} outside [{min}, {max}]")]
    ThresholdRange { value: f32, min: f32, max: f32 },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Load(#[from] LoadError),
}
