#![no_main]

use libfuzzer_sys::fuzz_target;
use msv_convert::mzml::DocumentSummary;

fuzz_target!(|data: &[u8]| {
    if let Ok(summary) = DocumentSummary::from_bytes(data) {
        let _ = summary.verify("fuzz", None);
    }
});
