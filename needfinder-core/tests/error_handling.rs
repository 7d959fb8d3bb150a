use needfinder_core::{
    ConfigError, CoreError, DatabaseError, ErrorExt, ReportError, SourceError,
};

#[test]
fn test_error_codes() {
    let source_error = CoreError::Source(SourceError::RequestTimeout {
        endpoint: "/r/productivity/new.json".to_string(),
    });
    assert_eq!(source_error.error_code(), "SOURCE");

    let db_error = CoreError::Database(DatabaseError::ConnectionFailed {
        reason: "locked".to_string(),
    });
    assert_eq!(db_error.error_code(), "DATABASE");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "collections".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let report_error = CoreError::Report(ReportError::WriteFailed {
        path: "/nope/report.md".to_string(),
        reason: "read-only".to_string(),
    });
    assert_eq!(report_error.error_code(), "REPORT");
}

#[test]
fn test_source_error_codes() {
    let error = SourceError::HttpStatus {
        endpoint: "/r/fitness/new.json".to_string(),
        status_code: 503,
    };
    assert_eq!(error.error_code(), "SOURCE_HTTP_STATUS");

    let error = SourceError::RateLimitExceeded {
        endpoint: "/r/fitness/new.json".to_string(),
        retry_after: 60,
    };
    assert_eq!(error.error_code(), "SOURCE_RATE_LIMIT");
}

#[test]
fn test_fatal_errors() {
    let soft = CoreError::Source(SourceError::Transport {
        endpoint: "/reddit/search/submission/".to_string(),
        details: "connection refused".to_string(),
    });
    assert!(!soft.is_fatal());

    let report = CoreError::Report(ReportError::OutputDirectory {
        path: "/proc/reports".to_string(),
        reason: "permission denied".to_string(),
    });
    assert!(report.is_fatal());

    let config = CoreError::Config(ConfigError::ValidationFailed {
        reason: "duplicate collection".to_string(),
    });
    assert!(config.is_fatal());

    let row = CoreError::Database(DatabaseError::InvalidRow {
        id: "abc".to_string(),
        reason: "unknown source".to_string(),
    });
    assert!(!row.is_fatal());
}

#[test]
fn test_source_error_display_mentions_endpoint() {
    let error = SourceError::InvalidResponse {
        endpoint: "/r/running/new.json".to_string(),
        details: "expected value at line 1".to_string(),
    };
    let message = error.to_string();
    assert!(message.contains("/r/running/new.json"));
    assert!(message.contains("expected value"));
}

#[test]
fn test_logging_helpers_return_self() {
    let error = CoreError::InvalidInput {
        message: "--max-pages must be at least 1".to_string(),
    };

    // Only checks that logging does not panic and hands the error back.
    assert_eq!(error.log_error().error_code(), "INVALID_INPUT");
    assert_eq!(error.log_warn().error_code(), "INVALID_INPUT");
    assert!(error.is_fatal());
}
