use chrono::{FixedOffset, TimeDelta, Utc};
use rhoslog::core::calculator::DailyTotals;
use rhoslog::core::clock::FixedClock;
use rhoslog::core::engine::HosEngine;
use rhoslog::core::ledger::{SegmentAmendment, StatusChange};
use rhoslog::core::trips::FixedTrip;
use rhoslog::db::pool::DbPool;
use rhoslog::errors::AppError;
use rhoslog::models::duty_status::DutyStatus;
use rhoslog::models::hours::Hours;
use rhoslog::models::schedule::CycleSchedule;

mod common;
use common::{Harness, date, ts};

#[test]
fn two_hours_driving_then_off_duty_totals_two_hours() {
    let t0 = ts(2025, 3, 3, 8, 0);
    let mut h = Harness::new(t0);

    h.change_at(t0, DutyStatus::Driving, "Hwy 1");
    // the clock is still at t0, so a change two hours ahead is rejected
    let err = h
        .engine
        .change_status(
            h.driver,
            &StatusChange::new(DutyStatus::OffDuty, "Rest Area").at(t0 + TimeDelta::hours(2)),
        )
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTimestamp(_)));

    h.change_at(t0 + TimeDelta::hours(2), DutyStatus::OffDuty, "Rest Area");

    let totals = h.engine.daily_totals(h.driver, date(2025, 3, 3)).unwrap();
    assert_eq!(totals.driving, Hours::from_hours(2));
    assert_eq!(totals.off_duty, Hours::ZERO);
    assert_eq!(totals.driving.to_string(), "2.00");

    let summary = h.engine.daily_summary(h.driver, date(2025, 3, 3)).unwrap();
    assert!(summary.violations.is_empty());
    assert!(!summary.log.has_violations);
}

#[test]
fn change_closes_previous_segment_at_change_time() {
    let t0 = ts(2025, 3, 3, 6, 0);
    let mut h = Harness::new(t0);

    h.change_at(t0, DutyStatus::OnDutyNotDriving, "Yard");
    h.clock.set(t0 + TimeDelta::minutes(45));
    let report = h
        .engine
        .change_status(h.driver, &StatusChange::new(DutyStatus::Driving, "Yard"))
        .unwrap();

    let closed = report.closed.expect("previous segment closed");
    assert_eq!(closed.status, DutyStatus::OnDutyNotDriving);
    assert_eq!(closed.end, Some(t0 + TimeDelta::minutes(45)));
    assert!(report.segment.is_active());
    assert_eq!(report.log.on_duty_not_driving, Hours::from_minutes(45));
}

#[test]
fn only_one_active_segment_after_many_changes() {
    let t0 = ts(2025, 3, 3, 0, 30);
    let mut h = Harness::new(t0);

    let statuses = [
        DutyStatus::OnDutyNotDriving,
        DutyStatus::Driving,
        DutyStatus::OffDuty,
        DutyStatus::Driving,
        DutyStatus::SleeperBerth,
    ];
    for (i, status) in statuses.iter().enumerate() {
        h.change_at(t0 + TimeDelta::minutes(90 * i as i64), *status, "Somewhere");
    }

    let summary = h.engine.daily_summary(h.driver, date(2025, 3, 3)).unwrap();
    assert_eq!(summary.segments.iter().filter(|s| s.is_active()).count(), 1);
    assert!(h.engine.audit_ledger().unwrap().is_empty());

    let current = h.engine.current_status(h.driver).unwrap();
    assert_eq!(current.status, DutyStatus::SleeperBerth);
}

#[test]
fn change_before_active_start_is_invalid_timestamp() {
    let t0 = ts(2025, 3, 3, 9, 0);
    let mut h = Harness::new(t0);
    h.change_at(t0, DutyStatus::Driving, "Hwy 1");

    for at in [t0, t0 - TimeDelta::minutes(5)] {
        let err = h
            .engine
            .change_status(h.driver, &StatusChange::new(DutyStatus::OffDuty, "x").at(at))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTimestamp(_)), "{err:?}");
    }

    // nothing was written by the rejected calls
    let summary = h.engine.daily_summary(h.driver, date(2025, 3, 3)).unwrap();
    assert_eq!(summary.segments.len(), 1);
}

#[test]
fn unknown_status_is_rejected() {
    let err = StatusChange::parse("NAPPING", "Hwy 1").unwrap_err();
    assert!(matches!(err, AppError::InvalidStatus(_)));

    let ok = StatusChange::parse("sb", "Hwy 1").unwrap();
    assert_eq!(ok.status, DutyStatus::SleeperBerth);
}

#[test]
fn midnight_rollover_splits_segment_into_each_day() {
    let t0 = ts(2025, 3, 3, 22, 0);
    let mut h = Harness::new(t0);

    h.change_at(t0, DutyStatus::Driving, "I-80");
    // two days later, at 02:00
    h.change_at(ts(2025, 3, 5, 2, 0), DutyStatus::OffDuty, "Truck stop");

    let d3 = h.engine.daily_totals(h.driver, date(2025, 3, 3)).unwrap();
    let d4 = h.engine.daily_totals(h.driver, date(2025, 3, 4)).unwrap();
    let d5 = h.engine.daily_totals(h.driver, date(2025, 3, 5)).unwrap();
    assert_eq!(d3.driving, Hours::from_hours(2));
    assert_eq!(d4.driving, Hours::from_hours(24));
    assert_eq!(d5.driving, Hours::from_hours(2));

    assert!(h.engine.audit_ledger().unwrap().is_empty());

    // the full day of driving breaches the daily limits of the 4th
    let s4 = h.engine.daily_summary(h.driver, date(2025, 3, 4)).unwrap();
    assert!(s4.log.has_violations);
}

#[test]
fn days_follow_the_terminal_offset() {
    let offset = FixedOffset::west_opt(5 * 3600).unwrap();
    let t0 = ts(2025, 3, 4, 3, 0); // 22:00 on the 3rd at the terminal
    let clock = std::sync::Arc::new(FixedClock::new(t0));
    let mut engine = HosEngine::new(DbPool::in_memory().unwrap())
        .with_clock(clock.clone())
        .with_offset(offset);
    let driver = engine
        .add_driver("Night Owl", CycleSchedule::SevenDay, None)
        .unwrap()
        .id;

    let report = engine
        .change_status(driver, &StatusChange::new(DutyStatus::Driving, "Depot"))
        .unwrap();
    assert_eq!(report.log.date, date(2025, 3, 3));
    assert_eq!(report.log.vehicle_number, "N/A");
    assert_eq!(report.log.cycle_ceiling, Hours::from_hours(60));

    clock.set(t0 + TimeDelta::hours(3));
    engine
        .change_status(driver, &StatusChange::new(DutyStatus::OffDuty, "Depot"))
        .unwrap();

    assert_eq!(
        engine.daily_totals(driver, date(2025, 3, 3)).unwrap().driving,
        Hours::from_hours(2)
    );
    assert_eq!(
        engine.daily_totals(driver, date(2025, 3, 4)).unwrap().driving,
        Hours::from_hours(1)
    );
}

#[test]
fn amend_records_edit_and_recomputes() {
    let t0 = ts(2025, 3, 3, 6, 0);
    let mut h = Harness::new(t0);
    h.change_at(t0, DutyStatus::Driving, "Hwy 1");
    h.change_at(t0 + TimeDelta::hours(3), DutyStatus::OnDutyNotDriving, "Dock");
    h.change_at(t0 + TimeDelta::hours(4), DutyStatus::OffDuty, "Dock");

    let summary = h.engine.daily_summary(h.driver, date(2025, 3, 3)).unwrap();
    let first = summary.segments[0].id;

    let amended = h
        .engine
        .amend_segment(
            first,
            &SegmentAmendment {
                start: Some(t0 + TimeDelta::hours(1)),
                remarks: Some("pre-trip inspection logged late".into()),
                ..SegmentAmendment::default()
            },
            "dispatcher-7",
            "start time entered late",
        )
        .unwrap();

    let edit = amended.edit.expect("edit info stored");
    assert_eq!(edit.edited_by, "dispatcher-7");
    assert_eq!(edit.reason, "start time entered late");

    let totals = h.engine.daily_totals(h.driver, date(2025, 3, 3)).unwrap();
    assert_eq!(totals.driving, Hours::from_hours(2));

    let log = h.engine.logs_between(h.driver, date(2025, 3, 3), date(2025, 3, 3)).unwrap();
    assert_eq!(log[0].driving, Hours::from_hours(2));
}

#[test]
fn amend_rejects_overlap_and_unknown_segment() {
    let t0 = ts(2025, 3, 3, 6, 0);
    let mut h = Harness::new(t0);
    h.change_at(t0, DutyStatus::Driving, "Hwy 1");
    h.change_at(t0 + TimeDelta::hours(3), DutyStatus::OnDutyNotDriving, "Dock");
    h.change_at(t0 + TimeDelta::hours(4), DutyStatus::OffDuty, "Dock");

    let summary = h.engine.daily_summary(h.driver, date(2025, 3, 3)).unwrap();
    let (first, second) = (summary.segments[0].id, summary.segments[1].id);

    let err = h
        .engine
        .amend_segment(
            first,
            &SegmentAmendment {
                end: Some(t0 + TimeDelta::hours(3) + TimeDelta::minutes(30)),
                ..SegmentAmendment::default()
            },
            "ops",
            "typo",
        )
        .unwrap_err();
    assert!(
        matches!(err, AppError::OverlappingInterval { segment, sibling } if segment == first && sibling == second)
    );

    let err = h
        .engine
        .amend_segment(9_999, &SegmentAmendment::default(), "ops", "typo")
        .unwrap_err();
    assert!(matches!(err, AppError::SegmentNotFound(9_999)));

    let err = h
        .engine
        .amend_segment(
            first,
            &SegmentAmendment {
                end: Some(t0 - TimeDelta::minutes(1)),
                ..SegmentAmendment::default()
            },
            "ops",
            "typo",
        )
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTimestamp(_)));

    // unchanged after the failures
    let again = h.engine.daily_summary(h.driver, date(2025, 3, 3)).unwrap();
    assert_eq!(again.segments, summary.segments);
}

#[test]
fn unknown_driver_is_reported() {
    let mut h = Harness::new(ts(2025, 3, 3, 6, 0));
    let err = h
        .engine
        .change_status(42, &StatusChange::new(DutyStatus::Driving, "x"))
        .unwrap_err();
    assert!(matches!(err, AppError::DriverNotFound(42)));
    assert!(!err.is_infrastructure());
}

#[test]
fn current_status_without_segments_is_off_duty_unknown() {
    let mut h = Harness::new(ts(2025, 3, 3, 6, 0));
    let current = h.engine.current_status(h.driver).unwrap();
    assert_eq!(current.status, DutyStatus::OffDuty);
    assert_eq!(current.since, None);
    assert_eq!(current.location.text, "Unknown");
}

#[test]
fn odometer_readings_give_daily_miles() {
    let t0 = ts(2025, 3, 3, 6, 0);
    let mut h = Harness::new(t0);

    h.clock.set(t0);
    h.engine
        .change_status(
            h.driver,
            &StatusChange::new(DutyStatus::Driving, "Yard").with_odometer(120_000),
        )
        .unwrap();
    h.clock.set(t0 + TimeDelta::hours(4));
    let report = h
        .engine
        .change_status(
            h.driver,
            &StatusChange::new(DutyStatus::OffDuty, "Customer")
                .with_odometer(120_240)
                .with_coordinates(41.8781, -87.6298),
        )
        .unwrap();

    assert_eq!(report.log.odometer_start, Some(120_000));
    assert_eq!(report.log.odometer_end, Some(120_240));
    assert_eq!(report.log.total_miles, 240);
    assert!(report.segment.location.coordinates.is_some());
}

#[test]
fn trip_reference_is_stored_on_new_segments() {
    let t0 = ts(2025, 3, 3, 6, 0);
    let clock = std::sync::Arc::new(FixedClock::new(t0));
    let mut engine = HosEngine::new(DbPool::in_memory().unwrap())
        .with_clock(clock.clone())
        .with_trips(FixedTrip(Some(42)));
    let driver = engine
        .add_driver("Linehaul", CycleSchedule::EightDay, Some("TRK-9"))
        .unwrap()
        .id;

    let report = engine
        .change_status(driver, &StatusChange::new(DutyStatus::Driving, "Dock 4"))
        .unwrap();
    assert_eq!(report.segment.trip_id, Some(42));
    assert_eq!(report.log.vehicle_number, "TRK-9");
}

#[test]
fn open_segment_counts_toward_later_days_before_the_next_change() {
    let t0 = ts(2025, 3, 1, 22, 0);
    let mut h = Harness::new(t0);
    h.change_at(t0, DutyStatus::SleeperBerth, "Truck Stop");
    h.clock.set(ts(2025, 3, 3, 1, 0));

    let sleeper = |h: &mut Harness, d| h.engine.daily_totals(h.driver, d).unwrap().sleeper_berth;
    assert_eq!(sleeper(&mut h, date(2025, 3, 1)), Hours::from_hours(2));
    assert_eq!(sleeper(&mut h, date(2025, 3, 2)), Hours::from_hours(24));
    assert_eq!(sleeper(&mut h, date(2025, 3, 3)), Hours::from_hours(1));
    assert_eq!(
        h.engine.daily_totals(h.driver, date(2025, 3, 4)).unwrap(),
        DailyTotals::default()
    );

    // reads do not write continuation logs
    let carried = h.engine.logs_between(h.driver, date(2025, 3, 2), date(2025, 3, 3)).unwrap();
    assert!(carried.is_empty());

    h.change_at(ts(2025, 3, 3, 1, 0), DutyStatus::OffDuty, "Truck Stop");
    assert_eq!(sleeper(&mut h, date(2025, 3, 2)), Hours::from_hours(24));
    assert_eq!(sleeper(&mut h, date(2025, 3, 3)), Hours::from_hours(1));
}

#[test]
fn sub_second_change_times_are_truncated() {
    let t0 = ts(2025, 3, 3, 6, 0);
    let mut h = Harness::new(t0);
    h.clock.set(t0 + TimeDelta::milliseconds(500));

    let report = h
        .engine
        .change_status(
            h.driver,
            &StatusChange::new(DutyStatus::OnDutyNotDriving, "Yard")
                .at(t0 + TimeDelta::milliseconds(100)),
        )
        .unwrap();
    assert_eq!(report.segment.start, t0);

    // same second as the active start
    let err = h
        .engine
        .change_status(
            h.driver,
            &StatusChange::new(DutyStatus::Driving, "Yard").at(t0 + TimeDelta::milliseconds(600)),
        )
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTimestamp(_)), "{err}");

    let now = t0 + TimeDelta::milliseconds(1_800);
    h.clock.set(now);
    let report = h
        .engine
        .change_status(
            h.driver,
            &StatusChange::new(DutyStatus::Driving, "Yard").at(now - TimeDelta::milliseconds(1)),
        )
        .unwrap();
    assert_eq!(report.segment.start, t0 + TimeDelta::seconds(1));
    assert_eq!(report.closed.unwrap().end, Some(t0 + TimeDelta::seconds(1)));
}

#[test]
fn wall_clock_change_a_moment_ago_is_accepted() {
    let mut engine = HosEngine::new(DbPool::in_memory().unwrap());
    let driver = engine
        .add_driver("Local", CycleSchedule::SevenDay, None)
        .unwrap()
        .id;

    let report = engine
        .change_status(
            driver,
            &StatusChange::new(DutyStatus::OffDuty, "Home")
                .at(Utc::now() - TimeDelta::milliseconds(1)),
        )
        .unwrap();
    assert!(report.segment.is_active());
}
