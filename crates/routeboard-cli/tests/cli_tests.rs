use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ── Fixture helpers ────────────────────────────────────────────────────────

const HEADER: &str = "LeadTechnician,SessionID,StartedTravel,ArrivalTimeReal,\
                      DepartureTimeReal,Latitude,Longitude,CompanyName,ServiceCode";

/// Visit rows shared by the CSV and SQLite fixtures.
///
///   Ana  2025-10-01  travel 08:50-09:00, service 09:00-09:40 (Madrid)
///   Ben  2025-10-02  travel 10:00-10:30, service 10:30-12:00 (Valencia)
const ROWS: [[&str; 9]; 2] = [
    [
        "Ana",
        "101",
        "2025-10-01 08:50:00",
        "2025-10-01 09:00:00",
        "2025-10-01 09:40:00",
        "40.41",
        "-3.7",
        "Acme",
        "INST",
    ],
    [
        "Ben",
        "102",
        "2025-10-02 10:00:00",
        "2025-10-02 10:30:00",
        "2025-10-02 12:00:00",
        "39.47",
        "-0.38",
        "Globex",
        "REP",
    ],
];

const TIMELINE_QUERY: &str = "SELECT * FROM visits \
     WHERE date(StartedTravel) >= :start_date AND date(StartedTravel) < :end_date";

fn create_csv_fixture(dir: &Path) -> PathBuf {
    let mut content = String::from(HEADER);
    content.push('\n');
    for row in ROWS {
        content.push_str(&row.join(","));
        content.push('\n');
    }
    let path = dir.join("visits.csv");
    fs::write(&path, content).unwrap();
    path
}

fn create_sqlite_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("routes.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE visits (
            LeadTechnician TEXT, SessionID INTEGER, StartedTravel TEXT,
            ArrivalTimeReal TEXT, DepartureTimeReal TEXT,
            Latitude REAL, Longitude REAL, CompanyName TEXT, ServiceCode TEXT
        );",
    )
    .unwrap();
    for row in ROWS {
        conn.execute(
            "INSERT INTO visits VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                row[0],
                row[1].parse::<i64>().unwrap(),
                row[2],
                row[3],
                row[4],
                row[5].parse::<f64>().unwrap(),
                row[6].parse::<f64>().unwrap(),
                row[7],
                row[8],
            ],
        )
        .unwrap();
    }
    path
}

/// Command isolated from the caller's config, cache and environment.
fn cmd_in(tmp: &Path) -> Command {
    let mut cmd = Command::cargo_bin("routeboard").unwrap();
    cmd.current_dir(tmp)
        .env("HOME", tmp)
        .env("XDG_CONFIG_HOME", tmp.join(".config"))
        .env("ROUTEBOARD_CONFIG", tmp.join("missing.toml"))
        .env("ROUTEBOARD_CACHE_DIR", tmp.join("cache"))
        .env("NO_COLOR", "1")
        .env_remove("ROUTEBOARD_TITLE")
        .env_remove("ROUTEBOARD_DATABASE")
        .env_remove("ROUTEBOARD_TIMELINE_QUERY")
        .env_remove("ROUTEBOARD_TEST_QUERY")
        .env_remove("RUST_LOG");
    cmd
}

fn csv_cmd(tmp: &TempDir) -> Command {
    let input = create_csv_fixture(tmp.path());
    let mut cmd = cmd_in(tmp.path());
    cmd.arg("--input").arg(input).arg("--no-spinner");
    cmd
}

// ── Help ───────────────────────────────────────────────────────────────────

#[test]
fn test_help_command() {
    let mut cmd = Command::cargo_bin("routeboard").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Field technician route efficiency dashboard"));
}

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("routeboard").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("routeboard"));
}

#[test]
fn test_daily_command_help() {
    let mut cmd = Command::cargo_bin("routeboard").unwrap();
    cmd.arg("daily")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Show efficiency per technician for one day"));
}

// ── Reports from a CSV export ──────────────────────────────────────────────

#[test]
fn test_daily_json() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["daily", "--json", "--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"technician\": \"Ana\""))
        .stdout(predicate::str::contains("\"idlePct\": 90.7"))
        .stdout(predicate::str::contains("\"travelPct\": 1.9"))
        .stdout(predicate::str::contains("\"optPct\": 92.6"))
        .stdout(predicate::str::contains("\"servicePct\": 7.4"))
        .stdout(predicate::str::contains("Ben").not());
}

#[test]
fn test_daily_table() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["daily", "--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Daily Summary - 2025-10-01"))
        .stdout(predicate::str::contains("Ana"))
        .stdout(predicate::str::contains("490 min"))
        .stdout(predicate::str::contains("90.7%"));
}

#[test]
fn test_daily_without_visits() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["daily", "--date", "2025-10-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No data for 2025-10-05..2025-10-06"));
}

#[test]
fn test_daily_json_without_visits_has_zero_percentages() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["daily", "--json", "--date", "2025-10-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"technicians\": []"))
        .stdout(predicate::str::contains("\"idlePct\": 0.0"));
}

#[test]
fn test_daily_raw_json_lists_fetched_rows() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["daily", "--raw", "--json", "--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sessionId\": \"101\""))
        .stdout(predicate::str::contains("\"startedTravel\": \"2025-10-01T08:50:00\""))
        .stdout(predicate::str::contains("\"companyName\": \"Acme\""))
        .stdout(predicate::str::contains("idlePct").not())
        .stdout(predicate::str::contains("Ben").not());
}

#[test]
fn test_monthly_raw_table() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["monthly", "--raw", "--date", "2025-10-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Raw Data - 2025-10-01..2025-11-01"))
        .stdout(predicate::str::contains("2025-10-02 10:30:00"))
        .stdout(predicate::str::contains("Globex"))
        .stdout(predicate::str::contains("2 rows"));
}

#[test]
fn test_monthly_json_covers_both_technicians() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["monthly", "--json", "--date", "2025-10-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"start\": \"2025-10-01\""))
        .stdout(predicate::str::contains("\"end\": \"2025-11-01\""))
        .stdout(predicate::str::contains("\"technician\": \"Ana\""))
        .stdout(predicate::str::contains("\"technician\": \"Ben\""));
}

#[test]
fn test_monthly_benchmark() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["monthly", "--benchmark", "--date", "2025-10-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Performance Summary - October 2025"))
        .stdout(predicate::str::contains("Processing time:"));
}

#[test]
fn test_timeline_text_and_json() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["timeline", "--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Timeline - 2025-10-01"))
        .stdout(predicate::str::contains("Ana"));

    csv_cmd(&tmp)
        .args(["timeline", "--json", "--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"start\": \"2025-10-01T06:00:00\""))
        .stdout(predicate::str::contains("\"kind\": \"Travel\""))
        .stdout(predicate::str::contains("\"kind\": \"Service\""));
}

#[test]
fn test_timeline_no_clip_follows_data() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["timeline", "--json", "--no-clip", "--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"start\": \"2025-10-01T08:50:00\""))
        .stdout(predicate::str::contains("\"end\": \"2025-10-01T09:40:00\""));
}

#[test]
fn test_timeline_rejects_tiny_width() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["timeline", "--width", "3", "--date", "2025-10-01"])
        .assert()
        .failure();
}

#[test]
fn test_route_json() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["route", "--json", "--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"latitude\": 40.41"))
        .stdout(predicate::str::contains("\"companyName\": \"Acme\""))
        .stdout(predicate::str::contains("Globex").not());
}

#[test]
fn test_dashboard_sections() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Route Timeline Viewer"))
        .stdout(predicate::str::contains("Performance Summary - October 2025"))
        .stdout(predicate::str::contains("Daily Summary - 2025-10-01"))
        .stdout(predicate::str::contains("Optimizable Time by Technician"))
        .stdout(predicate::str::contains("Routes"));
}

#[test]
fn test_dashboard_empty_month() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["--date", "2025-09-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No monthly data available for this period."))
        .stdout(predicate::str::contains("No daily data for 2025-09-10"));
}

#[test]
fn test_dashboard_title_from_env() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .env("ROUTEBOARD_TITLE", "Night Shift Routes")
        .args(["--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Night Shift Routes"));
}

// ── Configuration errors ───────────────────────────────────────────────────

#[test]
fn test_invalid_date_is_rejected() {
    let tmp = TempDir::new().unwrap();
    csv_cmd(&tmp)
        .args(["daily", "--date", "2025-13-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid date"));
}

#[test]
fn test_invalid_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.toml");
    fs::write(&config, "[efficiency]\ntotal_work_minutes_per_day = 0\n").unwrap();

    csv_cmd(&tmp)
        .env("ROUTEBOARD_CONFIG", &config)
        .args(["daily", "--date", "2025-10-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("total work minutes per day must be positive"));
}

#[test]
fn test_config_window_changes_percentages() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.toml");
    fs::write(
        &config,
        "[efficiency]\n\
         window_start = \"08:50\"\n\
         window_end = \"09:40\"\n\
         total_work_minutes_per_day = 50\n",
    )
    .unwrap();

    csv_cmd(&tmp)
        .env("ROUTEBOARD_CONFIG", &config)
        .args(["daily", "--json", "--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"idlePct\": 0.0"))
        .stdout(predicate::str::contains("\"travelPct\": 20.0"))
        .stdout(predicate::str::contains("\"servicePct\": 80.0"));
}

#[test]
fn test_missing_database_is_reported() {
    let tmp = TempDir::new().unwrap();
    cmd_in(tmp.path())
        .args(["daily", "--no-spinner", "--date", "2025-10-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No database configured"));
}

#[test]
fn test_check_without_database_fails() {
    let tmp = TempDir::new().unwrap();
    cmd_in(tmp.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No database configured"));
}

#[test]
fn test_missing_timeline_query_is_reported() {
    let tmp = TempDir::new().unwrap();
    let db = create_sqlite_fixture(tmp.path());
    cmd_in(tmp.path())
        .arg("--db")
        .arg(&db)
        .args(["daily", "--no-spinner", "--date", "2025-10-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ROUTEBOARD_TIMELINE_QUERY"));
}

// ── SQLite source ──────────────────────────────────────────────────────────

#[test]
fn test_sqlite_daily_json() {
    let tmp = TempDir::new().unwrap();
    let db = create_sqlite_fixture(tmp.path());
    cmd_in(tmp.path())
        .env("ROUTEBOARD_TIMELINE_QUERY", TIMELINE_QUERY)
        .arg("--db")
        .arg(&db)
        .args(["daily", "--json", "--no-cache", "--no-spinner", "--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"idlePct\": 90.7"))
        .stdout(predicate::str::contains("Ben").not());
}

#[test]
fn test_sqlite_database_from_env() {
    let tmp = TempDir::new().unwrap();
    let db = create_sqlite_fixture(tmp.path());
    cmd_in(tmp.path())
        .env("ROUTEBOARD_DATABASE", &db)
        .env("ROUTEBOARD_TIMELINE_QUERY", TIMELINE_QUERY)
        .args(["monthly", "--json", "--no-cache", "--no-spinner", "--date", "2025-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"technician\": \"Ben\""));
}

#[test]
fn test_sqlite_fetch_is_served_from_cache() {
    let tmp = TempDir::new().unwrap();
    let db = create_sqlite_fixture(tmp.path());

    let run = || {
        let mut cmd = cmd_in(tmp.path());
        cmd.env("ROUTEBOARD_TIMELINE_QUERY", TIMELINE_QUERY)
            .arg("--db")
            .arg(&db)
            .args(["daily", "--json", "--no-spinner", "--date", "2025-10-01"]);
        cmd
    };

    run()
        .assert()
        .success()
        .stdout(predicate::str::contains("\"idlePct\": 90.7"));
    assert!(tmp.path().join("cache").is_dir());

    fs::remove_file(&db).unwrap();
    run()
        .assert()
        .success()
        .stdout(predicate::str::contains("\"idlePct\": 90.7"));
}

#[test]
fn test_sqlite_changed_query_bypasses_cached_rows() {
    let tmp = TempDir::new().unwrap();
    let db = create_sqlite_fixture(tmp.path());

    let run = |query: String| {
        let mut cmd = cmd_in(tmp.path());
        cmd.env("ROUTEBOARD_TIMELINE_QUERY", query)
            .arg("--db")
            .arg(&db)
            .args(["daily", "--json", "--no-spinner", "--date", "2025-10-01"]);
        cmd
    };

    run(TIMELINE_QUERY.to_string())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"technician\": \"Ana\""));

    run(format!("{TIMELINE_QUERY} AND LeadTechnician = 'Ben'"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"technicians\": []"));
}

#[test]
fn test_check_with_database() {
    let tmp = TempDir::new().unwrap();
    let db = create_sqlite_fixture(tmp.path());
    cmd_in(tmp.path())
        .arg("--db")
        .arg(&db)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Testing database connection..."))
        .stdout(predicate::str::contains("Connected"));
}

#[test]
fn test_check_with_bad_query_fails() {
    let tmp = TempDir::new().unwrap();
    let db = create_sqlite_fixture(tmp.path());
    cmd_in(tmp.path())
        .env("ROUTEBOARD_TEST_QUERY", "SELECT * FROM no_such_table")
        .arg("--db")
        .arg(&db)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Database connection failed"));
}
