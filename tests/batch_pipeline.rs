//! End-to-end tests for the batch driver.

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use msv_convert::mzml::{verify_file, DocumentSummary};
use msv_convert::pipeline::{
    spawn_batch, BatchConverter, BatchEvent, BatchRequest, PipelineConfig, PipelineError, Stage,
};
use msv_convert::progress::NullReporter;
use msv_convert::staging::{LEGACY_DIR, LONG_FORM_DIR, MZML_DIR, RAW_DIR};
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

const HEADER: &str = "RT(minutes) - NOT USED BY IMPORT;RI;RT(milliseconds);50;51;52";

fn run_file(rows: &[&str]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<MSV>\n  <DATA>\n{}\n{}\n  </DATA>\n</MSV>\n",
        HEADER,
        rows.join("\n")
    )
}

fn good_run() -> String {
    run_file(&[
        "0.025;0;1500;1e-12;2e-12;0",
        "0.050;0;3000;3e-12;-1e-12;4e-12",
        "0.075;0;4500;0;5e-12;6e-12",
    ])
}

fn write_archive(path: &Path, entries: &[(String, String)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(name.as_str(), SimpleFileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(unix)]
fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
fn fake_converter(dir: &Path) -> PathBuf {
    let script = dir.join("fake-msconvert.sh");
    write_script(
        &script,
        "#!/bin/sh\n[ \"$2\" = \"--outfile\" ] || exit 9\n[ \"$4\" = \"--mzXML\" ] || exit 8\necho \"<mzXML/>\" > \"$3\"\n",
    );
    script
}

/// Converter that exits non-zero for any input whose name starts with `prefix`.
#[cfg(unix)]
fn failing_converter(dir: &Path, prefix: &str) -> PathBuf {
    let script = dir.join("flaky-msconvert.sh");
    write_script(
        &script,
        &format!(
            "#!/bin/sh\ncase \"$(basename \"$1\")\" in\n  {}*) echo \"cannot read $1\" >&2; exit 3 ;;\nesac\necho \"<mzXML/>\" > \"$3\"\n",
            prefix
        ),
    );
    script
}

#[cfg(unix)]
#[test]
fn test_full_batch() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("runs.zip");
    write_archive(
        &archive,
        &[
            ("2024-01-16_0800_MS_B1-02.msv".to_string(), good_run()),
            ("2024-01-15_0930_MS_A1-01.msv".to_string(), good_run()),
            ("2024-01-15_1000_MS_A2-01.msv".to_string(), good_run()),
            ("notes.txt".to_string(), "operator log".to_string()),
        ],
    );
    let root = dir.path().join("batch");
    let converter = fake_converter(dir.path());

    let seen = RefCell::new(Vec::new());
    let reporter = |percent: u8, _message: &str| seen.borrow_mut().push(percent);
    let report = BatchConverter::new(PipelineConfig::default())
        .run(&BatchRequest::new(&archive, &root, &converter), &reporter)
        .unwrap();

    assert!(!report.has_failures(), "{}", report);
    assert!(!report.has_warnings(), "{}", report);
    assert_eq!(report.extracted, 4);
    assert_eq!(report.rename.succeeded, 3);
    assert_eq!(report.reshape.succeeded, 3);
    assert_eq!(report.mzml.succeeded, 3);
    assert_eq!(report.bridge.succeeded, 3);

    let percents = seen.into_inner();
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(percents.last(), Some(&100));

    assert_eq!(
        sorted_names(&root.join(RAW_DIR)),
        vec![
            "00001_2024_01_15__0930_MS_A1_01.msv",
            "00002_2024_01_15__1000_MS_A2_01.msv",
            "00003_2024_01_16__0800_MS_B1_02.msv",
            "notes.txt",
        ]
    );
    assert_eq!(
        sorted_names(&root.join(LONG_FORM_DIR)),
        vec![
            "00001_2024_01_15__0930_MS_A1_01.csv",
            "00002_2024_01_15__1000_MS_A2_01.csv",
            "00003_2024_01_16__0800_MS_B1_02.csv",
        ]
    );
    assert_eq!(
        sorted_names(&root.join(LEGACY_DIR)),
        vec![
            "00001_2024_01_15__0930_MS_A1_01.mzXML",
            "00002_2024_01_15__1000_MS_A2_01.mzXML",
            "00003_2024_01_16__0800_MS_B1_02.mzXML",
        ]
    );

    let long_form =
        fs::read_to_string(root.join(LONG_FORM_DIR).join("00001_2024_01_15__0930_MS_A1_01.csv"))
            .unwrap();
    let mut lines = long_form.lines();
    assert_eq!(lines.next(), Some("Retention Time,m/z,intensity"));
    assert_eq!(lines.count(), 9);

    let mzml = root.join(MZML_DIR).join("00001_2024_01_15__0930_MS_A1_01.mzML");
    assert!(!verify_file(&mzml, Some(3)).unwrap().has_failures());

    let summary = DocumentSummary::open(&mzml).unwrap();
    let times: Vec<_> = summary.spectra.iter().map(|s| s.scan_start_time).collect();
    assert_eq!(times, vec![Some(1.5), Some(3.0), Some(4.5)]);
    assert_eq!(summary.spectra[0].intensity, vec![10000.0, 20000.0, 0.0]);
    // Negative readings are clipped to zero
    assert_eq!(summary.spectra[1].intensity, vec![30000.0, 0.0, 40000.0]);
    assert_eq!(summary.chromatograms[0].intensity, vec![30000.0, 70000.0, 110000.0]);

    let xml = fs::read_to_string(&mzml).unwrap();
    assert!(xml.contains(r#"startTimeStamp="2024-01-15T09:30:00""#));
}

#[test]
fn test_failures_are_collected() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("runs.zip");
    let mut entries: Vec<(String, String)> = (1..=9)
        .map(|i| (format!("2024-02-01_{:04}_MS_A{}-01.msv", 900 + i, i), good_run()))
        .collect();
    entries.push((
        "2024-02-01_0999_MS_Z9-01.msv".to_string(),
        run_file(&["0.025;0;1500;1;not-a-number;3"]),
    ));
    write_archive(&archive, &entries);

    let root = dir.path().join("batch");
    let request = BatchRequest::new(&archive, &root, dir.path().join("no-such-converter"));
    let report = BatchConverter::default()
        .run(&request, &NullReporter)
        .unwrap();

    assert_eq!(report.rename.succeeded, 10);
    assert_eq!(report.reshape.succeeded, 9);
    assert_eq!(report.reshape.failures.len(), 1);
    assert!(report.reshape.failures[0]
        .file
        .ends_with("00010_2024_02_01__0999_MS_Z9_01.msv"));
    assert!(report.reshape.failures[0].reason.contains("not-a-number"));
    assert_eq!(report.mzml.succeeded, 9);
    assert_eq!(report.mzml.skipped, 1);

    // The converter cannot start, so every document fails the bridge stage
    assert_eq!(report.bridge.succeeded, 0);
    assert_eq!(report.bridge.failures.len(), 9);
    assert!(report.bridge.failures.iter().all(|f| f.stage == Stage::Bridge));
    assert_eq!(report.failure_count(), 10);
    assert_eq!(sorted_names(&root.join(MZML_DIR)).len(), 9);
}

#[cfg(unix)]
#[test]
fn test_one_converter_failure_among_ten() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("runs.zip");
    let entries: Vec<(String, String)> = (1..=10)
        .map(|i| (format!("2024-03-01_{:04}_MS_A{}-01.msv", 900 + i, i), good_run()))
        .collect();
    write_archive(&archive, &entries);

    let root = dir.path().join("batch");
    let converter = failing_converter(dir.path(), "00010_");
    let report = BatchConverter::default()
        .run(&BatchRequest::new(&archive, &root, &converter), &NullReporter)
        .unwrap();

    assert_eq!(report.mzml.succeeded, 10);
    assert_eq!(report.bridge.succeeded, 9);
    assert_eq!(report.bridge.failures.len(), 1);
    assert_eq!(report.failure_count(), 1);

    let failure = &report.bridge.failures[0];
    assert_eq!(failure.stage, Stage::Bridge);
    assert!(failure.file.ends_with("00010_2024_03_01__0910_MS_A10_01.mzML"));
    assert!(failure.reason.contains("cannot read"), "{}", failure.reason);

    let converted = sorted_names(&root.join(LEGACY_DIR));
    assert_eq!(converted.len(), 9);
    assert!(converted.iter().all(|name| !name.starts_with("00010_")));
}

#[test]
fn test_malformed_name_aborts_batch() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("runs.zip");
    write_archive(
        &archive,
        &[
            ("2024-01-15_0930_MS_A1-01.msv".to_string(), good_run()),
            ("badname-1.msv".to_string(), good_run()),
        ],
    );

    let request = BatchRequest::new(&archive, dir.path().join("batch"), "msconvert");
    let err = BatchConverter::default()
        .run(&request, &NullReporter)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Rename(_)), "{err}");
    assert!(!dir.path().join("batch").join(MZML_DIR).read_dir().unwrap().any(|_| true));
}

#[test]
fn test_start_index_and_canonical_names() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("runs.zip");
    write_archive(
        &archive,
        &[
            ("00003_2024_01_14__0800_MS_A1_01.msv".to_string(), good_run()),
            ("2024-01-15_0930_MS_A1-01.msv".to_string(), good_run()),
            (
                "original_named_files/2024-01-15_0930_MS_A1-01.msv".to_string(),
                good_run(),
            ),
        ],
    );

    let root = dir.path().join("batch");
    let request = BatchRequest::new(&archive, &root, "no-such-converter-on-path")
        .with_start_index(42);
    let report = BatchConverter::default()
        .run(&request, &NullReporter)
        .unwrap();

    assert_eq!(report.rename.succeeded, 1);
    assert_eq!(report.rename.skipped, 2);
    assert!(root
        .join(RAW_DIR)
        .join("00042_2024_01_15__0930_MS_A1_01.msv")
        .is_file());
    assert!(root
        .join(RAW_DIR)
        .join("original_named_files/2024-01-15_0930_MS_A1-01.msv")
        .is_file());
    assert_eq!(report.mzml.succeeded, 3);
}

#[test]
fn test_spawned_batch_streams_events() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("runs.zip");
    write_archive(
        &archive,
        &[("2024-01-15_0930_MS_A1-01.msv".to_string(), good_run())],
    );

    let request = BatchRequest::new(&archive, dir.path().join("batch"), "no-such-converter");
    let handle = spawn_batch(BatchConverter::default(), request).unwrap();

    let mut percents = Vec::new();
    let mut finished = None;
    for event in handle.events().iter() {
        match event {
            BatchEvent::Progress { percent, .. } => percents.push(percent),
            BatchEvent::Finished(result) => {
                finished = Some(result);
                break;
            }
        }
    }

    let report = finished.unwrap().unwrap();
    assert_eq!(report.mzml.succeeded, 1);
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(percents.last(), Some(&100));
}
