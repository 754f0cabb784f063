//! The global subscriber can only be installed once per process, so this
//! binary holds a single test.

use std::fs;
use supercsv_logging::{init_logging, LogConfig};
use tempfile::TempDir;

#[test]
fn test_init_logging_writes_library_events_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = LogConfig::new("scsv-test")
        .with_verbose(true)
        .with_log_dir(temp_dir.path());

    init_logging(config.clone()).unwrap();
    assert!(init_logging(config).is_err());

    let doc = supercsv::parse("a: int\n@@\na\n1\n").unwrap();
    assert_eq!(doc.len(), 1);

    let log = fs::read_to_string(temp_dir.path().join("scsv-test.log")).unwrap();
    assert!(log.contains("Parsed SCSV document"), "log was: {}", log);
}
