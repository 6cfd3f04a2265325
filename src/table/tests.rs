use super::*;
use proptest::prelude::*;
use std::io::Cursor;

const HEADER: &str = "RT(minutes) - NOT USED BY IMPORT;RI;RT(milliseconds);50;51";

fn run_file(table: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<MSV>
  <HEADER><NAME>test</NAME></HEADER>
  <DATA>
{}
  </DATA>
</MSV>"#,
        table
    )
}

fn source() -> &'static Path {
    Path::new("test.msv")
}

#[test]
fn test_extract_from_run_file() {
    let xml = run_file(&format!("{}\n0.025;0;1500;-5;0.0002\n0.050;1;3000;1;2", HEADER));
    let raw = RawTable::from_reader(Cursor::new(xml), source()).unwrap();

    assert_eq!(raw.len(), 2);
    assert_eq!(raw.channels.len(), 2);
    assert_eq!(raw.channels[0].label, "50");
    assert_eq!(raw.channels[1].mz, 51.0);
    assert_eq!(raw.retention_times_ms, vec![1500.0, 3000.0]);
    assert_eq!(raw.rows[0], vec![-5.0, 0.0002]);
}

#[test]
fn test_clean_scenario_row() {
    let text = format!("{}\n0.025;7;1500;-5;0.0002", HEADER);
    let raw = RawTable::from_delimited(&text, source()).unwrap();
    let cleaned = CleaningConfig::default().apply(raw);

    assert_eq!(cleaned.retention_times, vec![1.5]);
    assert_eq!(cleaned.rows[0][0], 0.0);
    assert!((cleaned.rows[0][1] - 2_000_000_000_000.0).abs() < 1e-3);
}

#[test]
fn test_rounding_is_half_even() {
    let config = CleaningConfig {
        intensity_multiplier: 1.0,
        decimal_places: 0,
    };
    assert_eq!(config.clean_intensity(2.5), 2.0);
    assert_eq!(config.clean_intensity(3.5), 4.0);
    assert_eq!(config.clean_intensity(-0.4), 0.0);
}

#[test]
fn test_cdata_table() {
    let xml = format!(
        "<MSV><DATA><![CDATA[{}\n0;0;2000;1;2]]></DATA></MSV>",
        HEADER
    );
    let raw = RawTable::from_reader(Cursor::new(xml), source()).unwrap();
    assert_eq!(raw.retention_times_ms, vec![2000.0]);
}

#[test]
fn test_trailing_delimiter_column_is_ignored() {
    let text = format!("{};\n0;0;1000;1;2;", HEADER);
    let raw = RawTable::from_delimited(&text, source()).unwrap();
    assert_eq!(raw.channels.len(), 2);
    assert_eq!(raw.rows[0], vec![1.0, 2.0]);
}

#[test]
fn test_missing_data_element() {
    let err = RawTable::from_reader(Cursor::new("<MSV><HEADER/></MSV>"), source()).unwrap_err();
    assert!(matches!(err, ExtractError::MissingData { .. }));
    assert!(err.to_string().contains("test.msv"));
}

#[test]
fn test_missing_column() {
    let text = "RI;RT(milliseconds);50\n0;1000;1";
    let err = RawTable::from_delimited(text, source()).unwrap_err();
    match err {
        ExtractError::MissingColumn { column, .. } => assert_eq!(column, RT_MINUTES_COLUMN),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_ragged_row_is_malformed() {
    let text = format!("{}\n0;0;1000;1", HEADER);
    let err = RawTable::from_delimited(&text, source()).unwrap_err();
    assert!(matches!(err, ExtractError::Csv { .. }));
}

#[test]
fn test_non_numeric_cell() {
    let text = format!("{}\n0;0;1000;abc;1", HEADER);
    let err = RawTable::from_delimited(&text, source()).unwrap_err();
    match err {
        ExtractError::InvalidNumber { row, column, value, .. } => {
            assert_eq!(row, 1);
            assert_eq!(column, "50");
            assert_eq!(value, "abc");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_non_numeric_channel_header() {
    let text = "RT(minutes) - NOT USED BY IMPORT;RI;RT(milliseconds);TIC\n0;0;1000;1";
    let err = RawTable::from_delimited(text, source()).unwrap_err();
    assert!(matches!(err, ExtractError::InvalidChannel { .. }));
}

#[test]
fn test_header_only_table() {
    let err = RawTable::from_delimited(HEADER, source()).unwrap_err();
    assert!(matches!(err, ExtractError::EmptyTable { .. }));
}

#[test]
fn test_melt_order_and_grouping() {
    let text = format!("{}\n0;0;3000;1;2\n0;0;1000;3;4", HEADER);
    let cleaned = CleaningConfig {
        intensity_multiplier: 1.0,
        decimal_places: 3,
    }
    .apply(RawTable::from_delimited(&text, source()).unwrap());

    let records = cleaned.melt();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].mz, 50.0);
    assert_eq!(records[1].mz, 50.0);
    assert_eq!(records[2].mz, 51.0);

    let scans = cleaned.scans();
    assert_eq!(scans.len(), 2);
    assert_eq!(scans[0].retention_time, 1.0);
    assert_eq!(scans[0].intensity, vec![3.0, 4.0]);
    assert_eq!(scans[0].mz, vec![50.0, 51.0]);
    assert_eq!(scans[1].retention_time, 3.0);
    assert_eq!(scans[1].total_ion_current(), 3.0);

    // Chromatogram keeps the table's row order
    assert_eq!(cleaned.total_ion_current(), vec![3.0, 7.0]);
}

#[test]
fn test_write_long_form_csv() {
    let text = format!("{}\n0;0;1500;1;2", HEADER);
    let cleaned = CleaningConfig {
        intensity_multiplier: 1.0,
        decimal_places: 3,
    }
    .apply(RawTable::from_delimited(&text, source()).unwrap());

    let mut out = Vec::new();
    cleaned.write_long_form(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["Retention Time,m/z,intensity", "1.5,50.0,1.0", "1.5,51.0,2.0"]);
}

fn table_strategy() -> impl Strategy<Value = (Vec<f64>, Vec<Vec<f64>>)> {
    (1usize..8, 1usize..20).prop_flat_map(|(channels, rows)| {
        (
            proptest::collection::btree_set(0u32..1_000_000, rows),
            proptest::collection::vec(
                proptest::collection::vec(-1.0e-9f64..1.0e-9, channels),
                rows,
            ),
        )
            .prop_map(|(times, values)| {
                let times: Vec<f64> = times.into_iter().rev().map(f64::from).collect();
                let n = times.len();
                (times, values.into_iter().take(n).collect())
            })
    })
}

proptest! {
    #[test]
    fn prop_cleaned_intensities_are_non_negative((times, values) in table_strategy()) {
        let channels = values[0].len();
        let raw = RawTable {
            source: source().to_path_buf(),
            channels: (0..channels).map(|i| Channel { label: i.to_string(), mz: i as f64 }).collect(),
            retention_times_ms: times.clone(),
            rows: values.clone(),
        };
        let config = CleaningConfig::default();
        let cleaned = config.apply(raw);

        for (row, raw_row) in cleaned.rows.iter().zip(&values) {
            for (&x, &raw_x) in row.iter().zip(raw_row) {
                prop_assert!(x >= 0.0);
                prop_assert_eq!(x, round_to(raw_x.max(0.0) * 1e16, 3));
            }
        }
        for (&seconds, &ms) in cleaned.retention_times.iter().zip(&times) {
            prop_assert_eq!(seconds, ms / 1000.0);
        }
    }

    #[test]
    fn prop_grouping_reconstructs_rows((times, values) in table_strategy()) {
        let channels = values[0].len();
        let cleaned = CleanedTable {
            source: source().to_path_buf(),
            channels: (0..channels).map(|i| Channel { label: i.to_string(), mz: 100.0 + i as f64 }).collect(),
            retention_times: times.clone(),
            rows: values.clone(),
        };

        let scans = cleaned.scans();
        prop_assert_eq!(scans.len(), times.len());
        for pair in scans.windows(2) {
            prop_assert!(pair[0].retention_time < pair[1].retention_time);
        }
        for scan in &scans {
            let row = times.iter().position(|&t| t == scan.retention_time).unwrap();
            prop_assert_eq!(&scan.intensity, &values[row]);
            prop_assert_eq!(scan.mz.len(), channels);
        }
    }
}
