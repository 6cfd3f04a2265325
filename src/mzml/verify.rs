use super::reader::DocumentSummary;
use super::report::{VerificationCheck, VerificationReport};

/// Default namespace of mzML documents
pub const MZML_NAMESPACE: &str = "http://psi.hupo.org/ms/mzml";
/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// Schema location of the `<indexedmzML>` wrapper
pub const INDEXED_SCHEMA_LOCATION: &str =
    "http://psi.hupo.org/ms/mzml http://psidev.info/files/ms/mzML/xsd/mzML1.1.3_idx.xsd";
/// Schema location of the `<mzML>` element
pub const MZML_SCHEMA_LOCATION: &str =
    "http://psi.hupo.org/ms/mzml http://psidev.info/files/ms/mzML/xsd/mzML1.1.1.xsd";
/// mzML version written on `<mzML>`
pub const MZML_VERSION: &str = "1.1.0";

impl DocumentSummary {
    /// Run every check against this summary.
    ///
    /// `expected_spectra` is the number of spectra the writer emitted; pass
    /// `None` for documents of unknown origin.
    pub fn verify(
        &self,
        file_path: impl Into<String>,
        expected_spectra: Option<usize>,
    ) -> VerificationReport {
        let mut report = VerificationReport::new(file_path);
        report.add_check(self.check_indexed_root());
        report.add_check(self.check_mzml_root());
        report.add_check(self.check_spectrum_count(expected_spectra));
        report.add_check(self.check_scan_time_placement());
        report.add_check(self.check_scan_ids());
        report.add_check(self.check_retention_order());
        report.add_check(self.check_arrays());
        report.add_check(self.check_chromatogram());
        report.add_check(self.check_index());
        report.add_check(self.check_checksum());
        report
    }

    fn check_indexed_root(&self) -> VerificationCheck {
        const NAME: &str = "indexedmzML namespaces";
        match &self.indexed_root {
            None => VerificationCheck::failed(NAME, "document has no <indexedmzML> wrapper"),
            Some(root) => match missing_attributes(
                root.attribute("xmlns"),
                root.attribute("xmlns:xsi"),
                root.attribute("xsi:schemaLocation"),
                INDEXED_SCHEMA_LOCATION,
            ) {
                Some(msg) => VerificationCheck::failed(NAME, msg),
                None => VerificationCheck::ok(NAME),
            },
        }
    }

    fn check_mzml_root(&self) -> VerificationCheck {
        const NAME: &str = "mzML namespaces";
        let Some(root) = &self.mzml_root else {
            return VerificationCheck::failed(NAME, "document has no <mzML> element");
        };
        if let Some(msg) = missing_attributes(
            root.attribute("xmlns"),
            root.attribute("xmlns:xsi"),
            root.attribute("xsi:schemaLocation"),
            MZML_SCHEMA_LOCATION,
        ) {
            return VerificationCheck::failed(NAME, msg);
        }
        match root.attribute("version") {
            Some(MZML_VERSION) => VerificationCheck::ok(NAME),
            Some(other) => VerificationCheck::warning(NAME, format!("version is {:?}", other)),
            None => VerificationCheck::failed(NAME, "version attribute is missing"),
        }
    }

    fn check_spectrum_count(&self, expected: Option<usize>) -> VerificationCheck {
        const NAME: &str = "Spectrum count";
        let found = self.spectra.len();
        match expected {
            Some(expected) if expected != found => VerificationCheck::failed(
                NAME,
                format!("expected {} spectra, found {}", expected, found),
            ),
            _ if found == 0 => VerificationCheck::warning(NAME, "document has no spectra"),
            _ => VerificationCheck::ok(NAME),
        }
    }

    fn check_scan_time_placement(&self) -> VerificationCheck {
        const NAME: &str = "Scan start time placement";
        if self.spectrum_level_scan_times > 0 {
            return VerificationCheck::failed(
                NAME,
                format!(
                    "{} scan start times attached to <spectrum> instead of <scan>",
                    self.spectrum_level_scan_times
                ),
            );
        }
        if self.scan_level_scan_times != self.spectra.len() {
            return VerificationCheck::failed(
                NAME,
                format!(
                    "{} scan-level scan start times for {} spectra",
                    self.scan_level_scan_times,
                    self.spectra.len()
                ),
            );
        }
        VerificationCheck::ok(NAME)
    }

    fn check_scan_ids(&self) -> VerificationCheck {
        const NAME: &str = "Scan ids";
        for (i, spectrum) in self.spectra.iter().enumerate() {
            let expected = format!("scan={}", i + 1);
            if spectrum.id != expected {
                return VerificationCheck::failed(
                    NAME,
                    format!("spectrum {} has id {:?}, expected {:?}", i, spectrum.id, expected),
                );
            }
            if spectrum.index != Some(i) {
                return VerificationCheck::failed(
                    NAME,
                    format!("spectrum {:?} has index {:?}", spectrum.id, spectrum.index),
                );
            }
        }
        VerificationCheck::ok(NAME)
    }

    fn check_retention_order(&self) -> VerificationCheck {
        const NAME: &str = "Retention time order";
        let times: Vec<f64> = self
            .spectra
            .iter()
            .filter_map(|s| s.scan_start_time)
            .collect();
        if times.len() != self.spectra.len() {
            return VerificationCheck::failed(NAME, "some spectra have no scan start time");
        }
        match times.windows(2).position(|pair| pair[0] >= pair[1]) {
            Some(i) => VerificationCheck::failed(
                NAME,
                format!(
                    "{} at scan={} is not after {} at scan={}",
                    times[i + 1],
                    i + 2,
                    times[i],
                    i + 1
                ),
            ),
            None => VerificationCheck::ok(NAME),
        }
    }

    fn check_arrays(&self) -> VerificationCheck {
        const NAME: &str = "Binary data arrays";
        for spectrum in &self.spectra {
            if spectrum.mz.len() != spectrum.default_array_length
                || spectrum.intensity.len() != spectrum.default_array_length
            {
                return VerificationCheck::failed(
                    NAME,
                    format!(
                        "{}: {} m/z and {} intensity values for defaultArrayLength {}",
                        spectrum.id,
                        spectrum.mz.len(),
                        spectrum.intensity.len(),
                        spectrum.default_array_length
                    ),
                );
            }
        }
        VerificationCheck::ok(NAME)
    }

    fn check_chromatogram(&self) -> VerificationCheck {
        const NAME: &str = "TIC chromatogram";
        let [chromatogram] = self.chromatograms.as_slice() else {
            return VerificationCheck::failed(
                NAME,
                format!("expected 1 chromatogram, found {}", self.chromatograms.len()),
            );
        };
        if chromatogram.time.len() != chromatogram.intensity.len() {
            return VerificationCheck::failed(
                NAME,
                format!(
                    "{} time points but {} intensities",
                    chromatogram.time.len(),
                    chromatogram.intensity.len()
                ),
            );
        }
        if !chromatogram.is_total_ion_current {
            return VerificationCheck::warning(
                NAME,
                format!("chromatogram {:?} is not typed as a TIC chromatogram", chromatogram.id),
            );
        }
        VerificationCheck::ok(NAME)
    }

    fn check_index(&self) -> VerificationCheck {
        const NAME: &str = "Offset index";
        if !self.is_indexed() {
            return VerificationCheck::warning(NAME, "document is not indexed");
        }
        if !self.index_list_offset_valid {
            return VerificationCheck::failed(NAME, "indexListOffset does not point at <indexList>");
        }
        if self.spectrum_index.len() != self.spectra.len()
            || self.chromatogram_index.len() != self.chromatograms.len()
        {
            return VerificationCheck::failed(
                NAME,
                format!(
                    "index lists {} spectra and {} chromatograms",
                    self.spectrum_index.len(),
                    self.chromatogram_index.len()
                ),
            );
        }
        if !self.misplaced_offsets.is_empty() {
            return VerificationCheck::failed(
                NAME,
                format!("offsets do not match elements: {}", self.misplaced_offsets.join(", ")),
            );
        }
        VerificationCheck::ok(NAME)
    }

    fn check_checksum(&self) -> VerificationCheck {
        const NAME: &str = "File checksum";
        match (&self.file_checksum, &self.computed_checksum) {
            (None, _) => VerificationCheck::warning(NAME, "document has no fileChecksum"),
            (Some(stored), Some(computed)) if stored.eq_ignore_ascii_case(computed) => {
                VerificationCheck::ok(NAME)
            }
            (Some(stored), computed) => VerificationCheck::failed(
                NAME,
                format!(
                    "stored SHA-1 {} does not match computed {}",
                    stored,
                    computed.as_deref().unwrap_or("<none>")
                ),
            ),
        }
    }
}

fn missing_attributes(
    xmlns: Option<&str>,
    xsi: Option<&str>,
    schema_location: Option<&str>,
    expected_location: &str,
) -> Option<String> {
    if xmlns != Some(MZML_NAMESPACE) {
        return Some(format!("xmlns is {:?}", xmlns));
    }
    if xsi != Some(XSI_NAMESPACE) {
        return Some(format!("xmlns:xsi is {:?}", xsi));
    }
    if schema_location != Some(expected_location) {
        return Some(format!("xsi:schemaLocation is {:?}", schema_location));
    }
    None
}
