#![no_main]

use libfuzzer_sys::fuzz_target;
use msv_convert::table::{CleaningConfig, RawTable};
use std::io::Cursor;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    // Extraction must fail with an error, never panic
    if let Ok(raw) = RawTable::from_reader(Cursor::new(data), Path::new("fuzz.msv")) {
        let table = CleaningConfig::default().apply(raw);
        let _ = table.scans();
        let _ = table.write_long_form(Vec::new());
    }
});
