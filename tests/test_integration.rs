use backup_retention::time::parse_reference_time;
use backup_retention::{
    resolve, scan_directory, Classification, FormatTemplate, RetentionPolicy, SelectionMode,
};
use chrono::{Duration, NaiveDateTime};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

// A nightly backup at 02:30 for every day in [first, last]
fn create_nightly_backups(dir: &Path, first: NaiveDateTime, last: NaiveDateTime) -> usize {
    let mut count = 0;
    let mut ts = first;
    while ts <= last {
        let name = ts.format("backup-%Y%m%d-%H%M.tar").to_string();
        fs::write(dir.join(name), b"archive").unwrap();
        ts += Duration::days(1);
        count += 1;
    }
    count
}

fn kept_names(policy: &str, mode: SelectionMode, dir: &Path, now: NaiveDateTime) -> Vec<String> {
    let template = FormatTemplate::parse("backup-{YYYY}{MM}{DD}-{hh}{mm}.tar").unwrap();
    let artifacts = scan_directory(dir, &template, now).unwrap();
    let policy: RetentionPolicy = policy.parse().unwrap();
    let reasons = resolve(&artifacts, &policy, mode);
    assert_eq!(reasons.len(), artifacts.len());
    reasons
        .kept()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_nightly_backups_progressive() {
    let dir = tempdir().unwrap();
    let first = parse_reference_time("2023-01-01T02:30").unwrap();
    let last = parse_reference_time("2024-03-20T02:30").unwrap();
    let total = create_nightly_backups(dir.path(), first, last);
    assert!(total > 400);

    let now = parse_reference_time("2024-03-20T12:00").unwrap();
    let kept = kept_names(
        "last=2 days=7 weeks=4 months=3 years=5",
        SelectionMode::Progressive,
        dir.path(),
        now,
    );

    // days: 03-14..03-20
    // weeks: W12 and W11 fall inside the days window, W10 -> 03-10, W09 -> 03-03
    // months: March is already covered, Feb 29th, Jan 31st
    // years: 2024 is covered, Dec 31st 2023
    let mut expected: Vec<String> = (14..=20)
        .map(|d| format!("backup-202403{d:02}-0230.tar"))
        .collect();
    expected.extend(
        [
            "backup-20240310-0230.tar",
            "backup-20240303-0230.tar",
            "backup-20240229-0230.tar",
            "backup-20240131-0230.tar",
            "backup-20231231-0230.tar",
        ]
        .map(String::from),
    );
    expected.sort();
    assert_eq!(kept, expected);
}

#[test]
fn test_nightly_backups_cumulative() {
    let dir = tempdir().unwrap();
    let first = parse_reference_time("2023-01-01T02:30").unwrap();
    let last = parse_reference_time("2024-03-20T02:30").unwrap();
    create_nightly_backups(dir.path(), first, last);

    let now = parse_reference_time("2024-03-20T12:00").unwrap();
    let kept = kept_names(
        "days=7 weeks=2 months=2 years=5",
        SelectionMode::Cumulative,
        dir.path(),
        now,
    );

    // days: 03-14..03-20, last credited 03-14 (W11)
    // weeks: W10 -> 03-10, W09 -> 03-03
    // months: after March -> Feb 29th, Jan 31st
    // years: after 2024 -> Dec 31st 2023; nothing older
    let mut expected: Vec<String> = (14..=20)
        .map(|d| format!("backup-202403{d:02}-0230.tar"))
        .collect();
    expected.extend(
        [
            "backup-20240310-0230.tar",
            "backup-20240303-0230.tar",
            "backup-20240229-0230.tar",
            "backup-20240131-0230.tar",
            "backup-20231231-0230.tar",
        ]
        .map(String::from),
    );
    expected.sort();
    assert_eq!(kept, expected);
}

#[test]
fn test_future_backups_do_not_count_towards_generations() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("backup-20240101-0000.tar"), b"a").unwrap();
    fs::write(dir.path().join("backup-20240102-0000.tar"), b"b").unwrap();
    fs::write(dir.path().join("backup-20240301-0000.tar"), b"future").unwrap();

    let now = parse_reference_time("2024-02-01").unwrap();
    let template = FormatTemplate::parse("backup-{YYYY}{MM}{DD}-{hh}{mm}.tar").unwrap();
    let artifacts = scan_directory(dir.path(), &template, now).unwrap();
    assert!(artifacts
        .iter()
        .any(|a| matches!(a.classification, Classification::Future(_))));

    let kept = kept_names("last=1", SelectionMode::Progressive, dir.path(), now);
    assert_eq!(
        kept,
        vec![
            "backup-20240102-0000.tar".to_string(),
            "backup-20240301-0000.tar".to_string()
        ]
    );
}

#[test]
fn test_directory_backups_are_bucketed_like_files() {
    let dir = tempdir().unwrap();
    for name in ["backup-20240101-0000.tar", "backup-20240201-0000.tar"] {
        fs::create_dir(dir.path().join(name)).unwrap();
        fs::write(dir.path().join(name).join("manifest"), b"m").unwrap();
    }

    let now = parse_reference_time("2024-06-01").unwrap();
    let kept = kept_names("months=1", SelectionMode::Progressive, dir.path(), now);
    assert_eq!(kept, vec!["backup-20240201-0000.tar".to_string()]);
}
