use crate::error::*;
use tracing::{error, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    /// Whether the pipeline must stop when this error reaches it.
    fn is_fatal(&self) -> bool;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Source(e) => {
                error!("Source error details: {:?}", e);
            }
            CoreError::Database(e) => {
                error!("Database error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            CoreError::Report(e) => {
                error!("Report error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        match self {
            CoreError::Source(e) => e.is_fatal(),
            CoreError::Database(e) => e.is_fatal(),
            CoreError::Config(_) => true,
            CoreError::Report(_) => true,
            CoreError::Io(_) => true,
            CoreError::Network(_) => false,
            CoreError::InvalidInput { .. } => true,
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Source(_) => "SOURCE".to_string(),
            CoreError::Database(_) => "DATABASE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Report(_) => "REPORT".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
        }
    }
}

impl ErrorExt for SourceError {
    fn log_error(&self) -> &Self {
        error!("SourceError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("SourceError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        false
    }

    fn error_code(&self) -> String {
        match self {
            SourceError::Transport { .. } => "SOURCE_TRANSPORT".to_string(),
            SourceError::RequestTimeout { .. } => "SOURCE_TIMEOUT".to_string(),
            SourceError::HttpStatus { .. } => "SOURCE_HTTP_STATUS".to_string(),
            SourceError::RateLimitExceeded { .. } => "SOURCE_RATE_LIMIT".to_string(),
            SourceError::InvalidResponse { .. } => "SOURCE_INVALID_RESPONSE".to_string(),
            SourceError::CollectionNotFound { .. } => "SOURCE_COLLECTION_NOT_FOUND".to_string(),
        }
    }
}

impl ErrorExt for DatabaseError {
    fn log_error(&self) -> &Self {
        error!("DatabaseError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("DatabaseError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        match self {
            DatabaseError::ConnectionFailed { .. } => true,
            DatabaseError::MigrationFailed { .. } => true,
            DatabaseError::InvalidRow { .. } => false,
            // Single-statement failures (constraints, busy) are handled per item.
            DatabaseError::Sql(e) => !matches!(e, sqlx::Error::Database(_)),
        }
    }

    fn error_code(&self) -> String {
        match self {
            DatabaseError::ConnectionFailed { .. } => "DB_CONNECTION_FAILED".to_string(),
            DatabaseError::MigrationFailed { .. } => "DB_MIGRATION_FAILED".to_string(),
            DatabaseError::InvalidRow { .. } => "DB_INVALID_ROW".to_string(),
            DatabaseError::Sql(_) => "DB_SQL_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ReportError {
    fn log_error(&self) -> &Self {
        error!("ReportError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ReportError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn error_code(&self) -> String {
        match self {
            ReportError::OutputDirectory { .. } => "REPORT_OUTPUT_DIRECTORY".to_string(),
            ReportError::WriteFailed { .. } => "REPORT_WRITE_FAILED".to_string(),
            ReportError::RenderFailed { .. } => "REPORT_RENDER_FAILED".to_string(),
        }
    }
}
