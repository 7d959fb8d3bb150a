use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

/// Failure reported by a source adapter.
///
/// Adapters never return these as `Err`; they ride along with an empty page so
/// the caller can log them and move on to the next source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Transport failure for {endpoint}: {details}")]
    Transport { endpoint: String, details: String },

    #[error("Request timeout for {endpoint}")]
    RequestTimeout { endpoint: String },

    #[error("Unexpected status {status_code} from {endpoint}")]
    HttpStatus { endpoint: String, status_code: u16 },

    #[error("Rate limit exceeded for {endpoint}. Retry after {retry_after} seconds")]
    RateLimitExceeded { endpoint: String, retry_after: u64 },

    #[error("Invalid response from {endpoint}: {details}")]
    InvalidResponse { endpoint: String, details: String },

    #[error("Collection not found: {collection}")]
    CollectionNotFound { collection: String },
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Migration failed: {migration}")]
    MigrationFailed { migration: String },

    #[error("Invalid stored row {id}: {reason}")]
    InvalidRow { id: String, reason: String },

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Cannot create output directory {path}: {reason}")]
    OutputDirectory { path: String, reason: String },

    #[error("Cannot write report file {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Rendering failed: {reason}")]
    RenderFailed { reason: String },
}
