use predicates::str::contains;

mod common;
use common::{init_db_with_driver, rhl, setup_test_db};

fn change(db: &str, now: &str, status: &str, location: &str) {
    rhl()
        .args([
            "--db", db, "--driver", "1", "--now", now, "change", status, "--location", location,
        ])
        .assert()
        .success()
        .stdout(contains("recorded at"));
}

#[test]
fn test_init_and_driver_list() {
    let db_path = setup_test_db("init_and_driver_list");
    init_db_with_driver(&db_path);

    rhl()
        .args(["--db", &db_path, "driver", "list"])
        .assert()
        .success()
        .stdout(contains("Ada Driver"))
        .stdout(contains("70h/8-day"))
        .stdout(contains("N/A"));
}

#[test]
fn test_driver_add_rejects_unknown_schedule() {
    let db_path = setup_test_db("driver_bad_schedule");
    init_db_with_driver(&db_path);

    rhl()
        .args(["--db", &db_path, "driver", "add", "Bob", "--schedule", "9_DAY"])
        .assert()
        .failure()
        .stderr(contains("Invalid cycle schedule"));
}

#[test]
fn test_change_and_current() {
    let db_path = setup_test_db("change_and_current");
    init_db_with_driver(&db_path);

    change(&db_path, "2025-03-03T06:00:00Z", "DRIVING", "Hwy 1");

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T08:30:00Z", "current",
        ])
        .assert()
        .success()
        .stdout(contains("Driving"))
        .stdout(contains("2.50h"))
        .stdout(contains("Hwy 1"));
}

#[test]
fn test_change_rejects_unknown_status() {
    let db_path = setup_test_db("change_bad_status");
    init_db_with_driver(&db_path);

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T06:00:00Z", "change", "NAPPING",
        ])
        .assert()
        .failure()
        .stderr(contains("Invalid duty status"));
}

#[test]
fn test_gated_driving_is_refused() {
    let db_path = setup_test_db("gated_refusal");
    init_db_with_driver(&db_path);

    change(&db_path, "2025-03-03T06:00:00Z", "DRIVING", "Hwy 1");
    change(&db_path, "2025-03-03T14:30:00Z", "OFF_DUTY", "Rest Area");

    let refused = rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T14:40:00Z", "can-drive",
        ])
        .assert()
        .failure()
        .stderr(contains("break"))
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8_lossy(&refused);
    assert_eq!(stderr.matches("30-minute break required").count(), 1);

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T14:40:00Z", "change", "DRIVING",
        ])
        .assert()
        .failure()
        .stderr(contains("Driving not permitted"));

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T14:41:00Z", "change", "d",
            "--advisory",
        ])
        .assert()
        .success()
        .stdout(contains("Driving not permitted: 30-minute break required"));
}

#[test]
fn test_available_and_predict() {
    let db_path = setup_test_db("available_predict");
    init_db_with_driver(&db_path);

    change(&db_path, "2025-03-03T06:00:00Z", "DRIVING", "Hwy 1");
    change(&db_path, "2025-03-03T13:00:00Z", "OFF_DUTY", "Depot");

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T13:00:00Z", "available",
        ])
        .assert()
        .success()
        .stdout(contains("4.00h"))
        .stdout(contains("daily driving limit"));

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T13:00:00Z", "predict",
            "--hours", "5",
        ])
        .assert()
        .success()
        .stdout(contains("DRIVING_LIMIT"))
        .stdout(contains("over by 1.00h"));

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T13:00:00Z", "predict",
            "--hours", "abc",
        ])
        .assert()
        .failure();
}

#[test]
fn test_daily_json_and_certify_once() {
    let db_path = setup_test_db("daily_json_certify");
    init_db_with_driver(&db_path);

    change(&db_path, "2025-03-03T06:00:00Z", "ON_DUTY_NOT_DRIVING", "Yard");
    change(&db_path, "2025-03-03T06:30:00Z", "DRIVING", "Yard");
    change(&db_path, "2025-03-03T10:30:00Z", "OFF_DUTY", "Customer");

    let out = rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T12:00:00Z", "daily", "--date",
            "2025-03-03", "--json",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    let json: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&out.stdout).trim()).unwrap();
    assert_eq!(json["log"]["driving"], 4.0);
    assert_eq!(json["log"]["on_duty_not_driving"], 0.5);
    assert_eq!(json["segments"].as_array().unwrap().len(), 3);
    assert_eq!(json["log"]["certified"], false);

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T21:00:00Z", "certify",
            "--date", "2025-03-03", "--signature", "A. Driver",
        ])
        .assert()
        .success()
        .stdout(contains("certified"));

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T21:05:00Z", "certify",
            "--date", "2025-03-03", "--signature", "Someone Else",
        ])
        .assert()
        .failure()
        .stderr(contains("already certified"));

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T21:05:00Z", "certify",
            "--date", "2025-03-01", "--signature", "A. Driver",
        ])
        .assert()
        .failure()
        .stderr(contains("No daily log"));
}

#[test]
fn test_cycle_and_violations() {
    let db_path = setup_test_db("cycle_violations");
    init_db_with_driver(&db_path);

    change(&db_path, "2025-03-03T04:00:00Z", "DRIVING", "Hwy 1");
    change(&db_path, "2025-03-03T16:00:00Z", "OFF_DUTY", "Motel");

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T17:00:00Z", "violations",
        ])
        .assert()
        .success()
        .stdout(contains("DRIVING_LIMIT"))
        .stdout(contains("[HIGH]"));

    rhl()
        .args([
            "--db", &db_path, "--driver", "1", "--now", "2025-03-03T17:00:00Z", "cycle",
        ])
        .assert()
        .success()
        .stdout(contains("12.00h"));
}

#[test]
fn test_amend_and_db_check() {
    let db_path = setup_test_db("amend_db_check");
    init_db_with_driver(&db_path);

    change(&db_path, "2025-03-03T06:00:00Z", "DRIVING", "Hwy 1");
    change(&db_path, "2025-03-03T09:00:00Z", "OFF_DUTY", "Depot");

    rhl()
        .args([
            "--db", &db_path, "--now", "2025-03-03T12:00:00Z", "amend", "1", "--start",
            "2025-03-03T06:30:00Z", "--editor", "ops", "--reason", "late entry",
        ])
        .assert()
        .success()
        .stdout(contains("Segment 1 amended"));

    rhl()
        .args([
            "--db", &db_path, "--now", "2025-03-03T12:00:00Z", "amend", "1", "--end",
            "2025-03-03T10:00:00Z", "--editor", "ops", "--reason", "typo",
        ])
        .assert()
        .failure()
        .stderr(contains("overlap"));

    rhl()
        .args(["--db", &db_path, "db", "--check"])
        .assert()
        .success()
        .stdout(contains("Integrity check passed"))
        .stdout(contains("Ledger invariants hold"));

    rhl()
        .args(["--db", &db_path, "log", "--print"])
        .assert()
        .success()
        .stdout(contains("driver_add"))
        .stdout(contains("status"))
        .stdout(contains("edit"));
}
