use loanee_core::{
    aggregate::LogAggregator,
    error::RiskError,
    log_source::LogSource,
    records::LogCategory,
};
use std::fs;
use std::path::Path;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Builds:
///   101/phone-a/call_log/a.json     2 valid calls + 1 missing phone_number
///   101/phone-a/sms_log/broken.json not JSON
///   101/phone-b/contact_list/c.json 2 contacts
///   101/phone-b/sms_log/s.json      1 loan SMS
///   102/phone-c/                    no category directories
fn fixture(root: &Path) {
    write(
        &root.join("101/phone-a/call_log/a.json"),
        r#"[
            {"datetime": 1000, "phone_number": "+254700000001"},
            {"datetime": "1500", "phone_number": "+254700000002"},
            {"datetime": 1200}
        ]"#,
    );
    write(&root.join("101/phone-a/sms_log/broken.json"), "this is not json");
    write(
        &root.join("101/phone-b/contact_list/c.json"),
        r#"[
            {"last_time_contacted": 900, "times_contacted": 4, "phone_numbers": ["+2547"]},
            {"last_time_contacted": 950, "times_contacted": 1, "phone_numbers": []}
        ]"#,
    );
    write(
        &root.join("101/phone-b/sms_log/s.json"),
        r#"[{"datetime": 800, "sms_address": "LENDER", "message_body": "Your loan of Ksh 3,000 is due"}]"#,
    );
    fs::create_dir_all(root.join("102/phone-c")).unwrap();
}

/// Users are listed in sorted order.
#[test]
fn lists_user_directories() {
    let dir = tempfile::tempdir().unwrap();
    fixture(dir.path());

    let users = LogSource::new(dir.path()).list_users().unwrap();
    assert_eq!(users, vec!["101".to_string(), "102".to_string()]);
}

/// Bad records and bad files are skipped with context; the rest still loads.
#[test]
fn malformed_records_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fixture(dir.path());

    let logs = LogSource::new(dir.path()).load_user("101").unwrap();
    assert_eq!(logs.devices.len(), 2);
    assert_eq!(logs.devices[0].calls.len(), 2);
    assert_eq!(logs.skipped.len(), 2, "{:?}", logs.skipped);

    for err in &logs.skipped {
        match err {
            RiskError::MalformedRecord { user_id, device, .. } => {
                assert_eq!(user_id, "101");
                assert_eq!(device, "phone-a");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    let agg = LogAggregator::default().aggregate(&logs);
    assert_eq!(agg.skipped, 2);
    assert_eq!(agg.category_features(LogCategory::Calls)["latest_call"], 1500);
    assert_eq!(agg.category_features(LogCategory::Contacts)["unique_contacts_with_phone"], 1);
    assert_eq!(agg.category_features(LogCategory::Sms)["probable_max_loan"], 3000);
}

/// A device without category directories is empty, not an error.
#[test]
fn missing_categories_are_empty() {
    let dir = tempfile::tempdir().unwrap();
    fixture(dir.path());

    let logs = LogSource::new(dir.path()).load_user("102").unwrap();
    assert!(logs.is_empty());
    assert!(logs.skipped.is_empty());
    assert!(!LogAggregator::default().aggregate(&logs).has_data());
}

/// A user directory that does not exist is an I/O error.
#[test]
fn unknown_user_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let res = LogSource::new(dir.path()).load_user("999");
    assert!(matches!(res, Err(RiskError::Io { .. })));
}

/// A category entry that exists but cannot be listed is skipped. The device's
/// other categories still load, and the error names the unreadable path.
#[test]
fn unlistable_category_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("103/phone-e/call_log"), "a file where a directory belongs");
    write(
        &dir.path().join("103/phone-e/sms_log/s.json"),
        r#"[{"datetime": 5, "sms_address": "BANK", "message_body": "balance ksh 70"}]"#,
    );

    let logs = LogSource::new(dir.path()).load_user("103").unwrap();
    assert_eq!(logs.devices.len(), 1);
    assert!(logs.devices[0].calls.is_empty());
    assert_eq!(logs.devices[0].sms.len(), 1);
    assert_eq!(logs.skipped.len(), 1, "{:?}", logs.skipped);
    match &logs.skipped[0] {
        RiskError::Io { path, .. } => assert!(path.ends_with("103/phone-e/call_log"), "{}", path.display()),
        other => panic!("unexpected error {other}"),
    }
}

/// A user entry whose devices cannot be listed yields empty logs with the
/// error recorded, so one bad user never aborts a whole run.
#[test]
fn unlistable_user_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("104"), "a file where a directory belongs");

    let logs = LogSource::new(dir.path()).load_user("104").unwrap();
    assert!(logs.devices.is_empty());
    assert!(matches!(logs.skipped.as_slice(), [RiskError::Io { .. }]));
    assert_eq!(LogAggregator::default().aggregate(&logs).skipped, 1);
}
