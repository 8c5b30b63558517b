//! Tests for `src/logging.rs`.

use eevee_irc_connector::logging::LoggingGuard;

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_production_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs");
    assert!(!logs_dir.exists());

    // The global subscriber can only be initialised once per process, and
    // another test may have won that race; only the directory side effect is
    // asserted here.
    let _result = eevee_irc_connector::logging::init_production(&logs_dir);
    assert!(logs_dir.exists(), "logs directory should be created");
}
