use crate::error::*;

#[test]
fn test_error_context_invalid_version() {
    let error = RolloutError::InvalidVersionFormat("5.x".to_string());
    let context = ErrorContext::new(&error);

    assert!(context.suggestion.unwrap().contains("major.minor.service"));
    assert!(context.details.unwrap().contains("5.x"));
}

#[test]
fn test_error_context_invalid_document() {
    let error = RolloutError::InvalidDocument("missing id".to_string());
    let context = ErrorContext::new(&error);

    assert!(context.suggestion.unwrap().contains("--inflate"));
    assert_eq!(context.details.as_deref(), Some("Parse failure: missing id"));
}

#[test]
fn test_error_context_config_points_at_home() {
    let error = RolloutError::ConfigError("bad toml".to_string());
    let context = ErrorContext::new(&error);

    let suggestion = context.suggestion.unwrap();
    assert!(suggestion.contains("config.toml"));
    assert!(suggestion.contains("ROLLOUT_"));
}

#[test]
fn test_error_context_io_not_found() {
    let error = RolloutError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "version.xml",
    ));
    let context = ErrorContext::new(&error);

    assert!(context.suggestion.unwrap().contains("exists"));
}

#[test]
fn test_format_error_chain_includes_all_parts() {
    let error = RolloutError::HttpStatus(503);
    let formatted = format_error_chain(&error);

    assert!(formatted.starts_with("Error: Unexpected HTTP status 503"));
    assert!(formatted.contains("Details: Server answered with status 503"));
    assert!(formatted.contains("Solution:"));
}

#[test]
fn test_format_error_with_color_disabled() {
    let error = RolloutError::InvalidVersionFormat("abc".to_string());
    let formatted = format_error_with_color(&error, false);

    assert!(!formatted.contains("\x1b["));
    assert!(formatted.contains("Suggestions:"));
    assert!(formatted.contains("• Version format"));
}

#[test]
fn test_exit_codes() {
    assert_eq!(
        get_exit_code(&RolloutError::InvalidVersionFormat("x".to_string())),
        2
    );
    assert_eq!(
        get_exit_code(&RolloutError::InvalidDocument("x".to_string())),
        2
    );
    assert_eq!(
        get_exit_code(&RolloutError::VerificationFailed("x".to_string())),
        3
    );
    assert_eq!(get_exit_code(&RolloutError::HttpStatus(404)), 20);
    assert_eq!(get_exit_code(&RolloutError::CoordinatorStopped), 1);
}
