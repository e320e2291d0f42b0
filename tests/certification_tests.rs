use rhoslog::db::log::load_log;
use rhoslog::errors::AppError;
use rhoslog::models::duty_status::DutyStatus;

mod common;
use common::{Harness, date, ts};

#[test]
fn certify_is_one_way_and_keeps_first_signature() {
    let mut h = Harness::new(ts(2025, 3, 3, 6, 0));
    h.shift(ts(2025, 3, 3, 6, 0), 8, DutyStatus::Driving);

    let log = h
        .engine
        .certify(h.driver, date(2025, 3, 3), "A. Driver")
        .unwrap();
    assert!(log.certified);
    assert_eq!(log.signature, "A. Driver");
    assert_eq!(log.certified_at, Some(ts(2025, 3, 3, 14, 0)));

    let err = h
        .engine
        .certify(h.driver, date(2025, 3, 3), "Someone Else")
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyCertified { .. }));

    let summary = h.engine.daily_summary(h.driver, date(2025, 3, 3)).unwrap();
    assert_eq!(summary.log.signature, "A. Driver");

    let certs = load_log(&h.engine.pool().conn)
        .unwrap()
        .into_iter()
        .filter(|r| r.operation == "certify")
        .count();
    assert_eq!(certs, 1);
}

#[test]
fn certify_missing_day_fails() {
    let mut h = Harness::new(ts(2025, 3, 3, 6, 0));
    let err = h
        .engine
        .certify(h.driver, date(2025, 3, 2), "A. Driver")
        .unwrap_err();
    assert!(matches!(err, AppError::DailyLogNotFound { driver, .. } if driver == h.driver));
}
