use chrono::TimeDelta;
use rhoslog::core::clock::FixedClock;
use rhoslog::core::engine::HosEngine;
use rhoslog::core::ledger::StatusChange;
use rhoslog::db::pool::DbPool;
use rhoslog::errors::AppError;
use rhoslog::models::duty_status::DutyStatus;
use rhoslog::models::schedule::CycleSchedule;
use std::thread;
use std::time::Duration;

mod common;
use common::ts;

#[test]
fn concurrent_writers_keep_a_single_active_segment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hos.sqlite");
    let t0 = ts(2025, 3, 3, 6, 0);

    let driver = {
        let mut engine = HosEngine::new(DbPool::open(&path, Duration::from_secs(10)).unwrap())
            .with_clock(FixedClock::new(t0));
        engine
            .add_driver("Shared Driver", CycleSchedule::EightDay, None)
            .unwrap()
            .id
    };

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let path = path.clone();
            thread::spawn(move || {
                let pool = DbPool::open(&path, Duration::from_secs(10)).unwrap();
                let clock = std::sync::Arc::new(FixedClock::new(t0));
                let mut engine = HosEngine::new(pool).with_clock(clock.clone());
                let mut failures = Vec::new();

                for step in 0..10i64 {
                    clock.set(t0 + TimeDelta::minutes(step * 40 + worker * 7));
                    let status = DutyStatus::ALL[((step + worker) % 4) as usize];
                    if let Err(e) = engine.change_status(driver, &StatusChange::new(status, "Yard")) {
                        failures.push(e);
                    }
                }
                failures
            })
        })
        .collect();

    for handle in handles {
        for failure in handle.join().unwrap() {
            assert!(
                matches!(failure, AppError::InvalidTimestamp(_)),
                "unexpected failure: {failure:?}"
            );
        }
    }

    let mut engine = HosEngine::new(DbPool::open(&path, Duration::from_secs(10)).unwrap())
        .with_clock(FixedClock::new(t0 + TimeDelta::hours(8)));
    assert!(engine.audit_ledger().unwrap().is_empty());

    let active: i64 = engine
        .pool()
        .conn
        .query_row(
            "SELECT COUNT(*) FROM duty_segments WHERE end_time IS NULL AND driver_id = ?1",
            [driver],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(active, 1);
}
