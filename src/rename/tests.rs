use super::*;
use crate::progress::NullReporter;
use proptest::prelude::*;
use std::fs::{self, File};
use tempfile::tempdir;

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap();
}

fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().unwrap().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_parse_instrument_name() {
    let name = CanonicalName::parse("2024-01-15_0930_MS_A1-01.msv").unwrap();
    assert_eq!(name.year, "2024");
    assert_eq!(name.month, "01");
    assert_eq!(name.day, "15");
    assert_eq!(name.time, "0930");
    assert_eq!(name.acquisition_type, "MS");
    assert_eq!(name.code1, "A1");
    assert_eq!(name.code2, "01");
    assert_eq!(name.file_name(7), "00007_2024_01_15__0930_MS_A1_01.msv");
}

#[test]
fn test_double_dash_is_one_delimiter() {
    let tokens = name::tokenize("2024--01-15_0930_MS_x_A1--01.msv");
    assert_eq!(tokens, vec!["2024", "01", "15", "0930", "MS", "x", "A1", "01.msv"]);
}

#[test]
fn test_trailing_codes_skip_middle_tokens() {
    let name = CanonicalName::parse("2023_12_31_2359_GC_extra_stuff_C7_B2.MSV").unwrap();
    assert_eq!(name.acquisition_type, "GC");
    assert_eq!(name.code1, "C7");
    assert_eq!(name.code2, "B2");
}

#[test]
fn test_malformed_name_is_typed_error() {
    let err = CanonicalName::parse("badname-1.msv").unwrap_err();
    match err {
        RenameError::MalformedName { file, expected, found } => {
            assert_eq!(file, "badname-1.msv");
            assert_eq!(expected, 5);
            assert_eq!(found, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_is_canonical() {
    assert!(is_canonical("00001_2024_01_15__0930_MS_A1_01.msv"));
    assert!(is_canonical("12345_x.msv"));
    assert!(!is_canonical("1234_x.msv"));
    assert!(!is_canonical("2024-01-15_0930_MS_A1-01.msv"));
    assert!(!is_canonical("00001"));
}

#[test]
fn test_parse_canonical_roundtrip() {
    let name = CanonicalName::parse("2024-01-15_0930_MS_A1-01.msv").unwrap();
    let (sequence, parsed) = CanonicalName::parse_canonical(&name.file_name(42)).unwrap();
    assert_eq!(sequence, 42);
    assert_eq!(parsed, name);
}

#[test]
fn test_acquisition_time() {
    let name = CanonicalName::parse("2024-01-15_0930_MS_A1-01.msv").unwrap();
    let time = name.acquisition_time().unwrap();
    assert_eq!(time.to_string(), "2024-01-15 09:30:00");

    let odd = CanonicalName::parse("2024-13-15_0930_MS_A1-01.msv").unwrap();
    assert!(odd.acquisition_time().is_none());
}

#[test]
fn test_rename_assigns_increasing_sequence() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("2024-01-15_0930_MS_A1-01.msv"));
    touch(&dir.path().join("2024-01-15_1030_MS_A1-02.msv"));
    touch(&dir.path().join("notes.txt"));

    let reporter = NullReporter;
    let mut progress = ProgressTracker::new(2, &reporter);
    let summary = rename_run_files(dir.path(), 7, &mut progress).unwrap();

    assert_eq!(summary.renamed.len(), 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.next_sequence, 9);
    assert_eq!(
        names_in(dir.path()),
        vec![
            "00007_2024_01_15__0930_MS_A1_01.msv",
            "00008_2024_01_15__1030_MS_A1_02.msv",
            "notes.txt",
        ]
    );
}

#[test]
fn test_rename_is_idempotent() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("2024-01-15_0930_MS_A1-01.msv"));

    let reporter = NullReporter;
    let mut progress = ProgressTracker::new(2, &reporter);
    rename_run_files(dir.path(), 1, &mut progress).unwrap();
    let first = names_in(dir.path());

    let second = rename_run_files(dir.path(), 1, &mut progress).unwrap();
    assert!(second.renamed.is_empty());
    assert_eq!(second.skipped, 1);
    assert_eq!(second.next_sequence, 1);
    assert_eq!(names_in(dir.path()), first);
}

#[test]
fn test_backup_dir_is_skipped() {
    let dir = tempdir().unwrap();
    let backup = dir.path().join(DEFAULT_BACKUP_DIR).join("inner");
    touch(&backup.join("2024-01-15_0930_MS_A1-01.msv"));
    touch(&dir.path().join("sub/2024-01-16_0800_MS_B2-03.msv"));

    let reporter = NullReporter;
    let mut progress = ProgressTracker::new(2, &reporter);
    let summary = rename_run_files(dir.path(), 3, &mut progress).unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.renamed.len(), 1);
    assert_eq!(names_in(&backup), vec!["2024-01-15_0930_MS_A1-01.msv"]);
    assert_eq!(
        names_in(&dir.path().join("sub")),
        vec!["00003_2024_01_16__0800_MS_B2_03.msv"]
    );
}

#[test]
fn test_malformed_name_aborts_without_rollback() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("2024-01-15_0930_MS_A1-01.msv"));
    touch(&dir.path().join("zz-bad.msv"));

    let reporter = NullReporter;
    let mut progress = ProgressTracker::new(2, &reporter);
    let result = rename_run_files(dir.path(), 1, &mut progress);

    assert!(matches!(result, Err(RenameError::MalformedName { .. })));
    assert_eq!(
        names_in(dir.path()),
        vec!["00001_2024_01_15__0930_MS_A1_01.msv", "zz-bad.msv"]
    );
}

#[test]
fn test_sequence_overflow_stops_before_renaming() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("2024-01-15_0930_MS_A1-01.msv"));
    touch(&dir.path().join("2024-01-15_1000_MS_A2-01.msv"));

    let reporter = NullReporter;
    let mut progress = ProgressTracker::new(2, &reporter);
    let err = rename_run_files(dir.path(), MAX_SEQUENCE, &mut progress).unwrap_err();

    match err {
        RenameError::SequenceOverflow { file, sequence } => {
            assert_eq!(sequence, MAX_SEQUENCE + 1);
            assert!(file.ends_with("2024-01-15_1000_MS_A2-01.msv"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        names_in(dir.path()),
        vec!["2024-01-15_1000_MS_A2-01.msv", "99999_2024_01_15__0930_MS_A1_01.msv"]
    );

    // The renamed file stays canonical; resuming past the limit renames nothing
    assert!(is_canonical("99999_2024_01_15__0930_MS_A1_01.msv"));
    let second = rename_run_files(dir.path(), MAX_SEQUENCE + 1, &mut progress);
    assert!(matches!(second, Err(RenameError::SequenceOverflow { .. })));
    assert_eq!(
        names_in(dir.path()),
        vec!["2024-01-15_1000_MS_A2-01.msv", "99999_2024_01_15__0930_MS_A1_01.msv"]
    );
}

#[test]
fn test_custom_backup_dir() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("keep/2024-01-15_0930_MS_A1-01.msv"));

    let reporter = NullReporter;
    let mut progress = ProgressTracker::new(1, &reporter);
    let summary = Renamer::with_backup_dir("keep")
        .rename_all(dir.path(), 1, &mut progress)
        .unwrap();
    assert_eq!(summary.skipped, 1);
    assert!(summary.renamed.is_empty());
}

proptest! {
    #[test]
    fn prop_sequence_is_contiguous(count in 1usize..12, start in 1u32..90_000) {
        let dir = tempdir().unwrap();
        for i in 0..count {
            touch(&dir.path().join(format!("2024-02-{:02}_0900_MS_C{}-01.msv", i + 1, i)));
        }

        let reporter = NullReporter;
        let mut progress = ProgressTracker::new(count, &reporter);
        let summary = rename_run_files(dir.path(), start, &mut progress).unwrap();

        prop_assert_eq!(summary.renamed.len(), count);
        for (offset, renamed) in summary.renamed.iter().enumerate() {
            let expected = start + offset as u32;
            prop_assert_eq!(renamed.sequence, expected);
            let file_name = renamed.to.file_name().unwrap().to_string_lossy().into_owned();
            let prefix = format!("{:05}_", expected);
            prop_assert!(file_name.starts_with(&prefix));
            prop_assert!(is_canonical(&file_name));
        }
    }

    #[test]
    fn prop_sequence_prefixed_names_are_canonical(seq in 0u32..100_000, tail in "[A-Za-z0-9_-]{0,20}") {
        let file_name = format!("{:05}_{}.msv", seq, tail);
        prop_assert!(is_canonical(&file_name));
    }
}
