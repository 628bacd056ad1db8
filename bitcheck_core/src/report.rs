//! Report destinations and annotation
//!
//! Reports live in one flat directory, named by a zero-based sequence number
//! so that no two assets in a run share a file. After the validator has
//! written a report, the asset's display name is prepended to it.

use crate::error::WriteError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Prefix of the line prepended to every report
pub const ANNOTATION_PREFIX: &str = "File Name: ";

/// Monotonic output counter, owned by the orchestrator for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSequence {
    next: u64,
}

impl OutputSequence {
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    /// Take the current number and move past it
    pub fn advance(&mut self) -> u64 {
        let current = self.next;
        self.next += 1;
        current
    }

    /// The number the next call to [`advance`](Self::advance) returns
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for OutputSequence {
    fn default() -> Self {
        Self::starting_at(0)
    }
}

/// Writes and annotates validator reports under one output directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory if it does not exist yet
    pub fn prepare(&self) -> Result<(), WriteError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| WriteError::output_dir(&self.output_dir, e))
    }

    /// Destination for the report with the given sequence number
    pub fn allocate_output_path(&self, sequence: u64) -> PathBuf {
        self.output_dir.join(sequence.to_string())
    }

    /// Prepend `File Name: <display_name>` to the report at `path`
    ///
    /// The new content is written to a temporary file beside the report and
    /// renamed over it, so a failure leaves the original untouched. The
    /// report keeps the permissions the validator gave it.
    pub fn annotate(&self, path: &Path, display_name: &str) -> Result<(), WriteError> {
        let original = std::fs::read(path).map_err(|e| WriteError::annotate(path, e))?;
        let permissions = std::fs::metadata(path)
            .map_err(|e| WriteError::annotate(path, e))?
            .permissions();

        let dir = path.parent().unwrap_or(&self.output_dir);
        let mut staged = NamedTempFile::new_in(dir).map_err(|e| WriteError::annotate(path, e))?;

        staged
            .write_all(annotation_line(display_name).as_bytes())
            .and_then(|()| staged.write_all(&original))
            .and_then(|()| staged.as_file().set_permissions(permissions))
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|e| WriteError::annotate(path, e))?;

        staged
            .persist(path)
            .map_err(|e| WriteError::annotate(path, e.error))?;
        Ok(())
    }
}

/// The line prepended to a report, including its line break
///
/// Trailing line breaks in the name are dropped so the header stays on
/// one line.
pub fn annotation_line(display_name: &str) -> String {
    format!(
        "{ANNOTATION_PREFIX}{}\n",
        display_name.trim_end_matches(['\r', '\n'])
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn writer() -> (ReportWriter, TempDir) {
        let temp = TempDir::new().unwrap();
        (ReportWriter::new(temp.path().join("reports")), temp)
    }

    #[test]
    fn test_prepare_creates_directory() {
        let (writer, _temp) = writer();
        writer.prepare().unwrap();
        assert!(writer.output_dir().is_dir());
        // Idempotent
        writer.prepare().unwrap();
    }

    #[test]
    fn test_output_paths_are_sequence_numbers() {
        let writer = ReportWriter::new("/reports");
        assert_eq!(writer.allocate_output_path(0), PathBuf::from("/reports/0"));
        assert_eq!(writer.allocate_output_path(17), PathBuf::from("/reports/17"));
    }

    #[test]
    fn test_annotate_prepends_name() {
        let (writer, _temp) = writer();
        writer.prepare().unwrap();
        let report = writer.allocate_output_path(0);
        std::fs::write(&report, "Status: Well-Formed\n").unwrap();

        writer.annotate(&report, "figure1.tif").unwrap();

        assert_eq!(
            std::fs::read_to_string(&report).unwrap(),
            "File Name: figure1.tif\nStatus: Well-Formed\n"
        );
    }

    #[test]
    fn test_annotate_twice_stacks_newest_first() {
        let (writer, _temp) = writer();
        writer.prepare().unwrap();
        let report = writer.allocate_output_path(0);
        std::fs::write(&report, "body").unwrap();

        writer.annotate(&report, "first").unwrap();
        writer.annotate(&report, "second").unwrap();

        assert_eq!(
            std::fs::read_to_string(&report).unwrap(),
            "File Name: second\nFile Name: first\nbody"
        );
    }

    #[test]
    fn test_annotate_missing_report() {
        let (writer, _temp) = writer();
        writer.prepare().unwrap();
        let report = writer.allocate_output_path(4);

        let err = writer.annotate(&report, "data.csv").unwrap_err();
        assert!(matches!(err, WriteError::MissingReport { .. }));
        assert!(!report.exists());
    }

    #[test]
    fn test_annotate_leaves_no_temp_files() {
        let (writer, _temp) = writer();
        writer.prepare().unwrap();
        let report = writer.allocate_output_path(0);
        std::fs::write(&report, "x").unwrap();

        writer.annotate(&report, "a").unwrap();

        let entries: Vec<_> = std::fs::read_dir(writer.output_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("0")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_annotate_keeps_report_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (writer, _temp) = writer();
        writer.prepare().unwrap();
        let report = writer.allocate_output_path(0);
        std::fs::write(&report, "Status: Well-Formed\n").unwrap();
        std::fs::set_permissions(&report, std::fs::Permissions::from_mode(0o644)).unwrap();

        writer.annotate(&report, "thesis.pdf").unwrap();

        let mode = std::fs::metadata(&report).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn test_annotation_line_strips_trailing_breaks() {
        assert_eq!(annotation_line("name.pdf\r\n"), "File Name: name.pdf\n");
        assert_eq!(annotation_line(""), "File Name: \n");
    }

    #[test]
    fn test_output_sequence() {
        let mut sequence = OutputSequence::starting_at(5);
        assert_eq!(sequence.advance(), 5);
        assert_eq!(sequence.advance(), 6);
        assert_eq!(sequence.peek(), 7);
        assert_eq!(OutputSequence::default().peek(), 0);
    }

    proptest! {
        #[test]
        fn prop_output_paths_strictly_increase(start in 0u64..1_000_000, count in 1usize..64) {
            let writer = ReportWriter::new("/reports");
            let mut sequence = OutputSequence::starting_at(start);
            let numbers: Vec<u64> = (0..count).map(|_| sequence.advance()).collect();

            for pair in numbers.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            let mut paths: Vec<PathBuf> = numbers
                .iter()
                .map(|n| writer.allocate_output_path(*n))
                .collect();
            paths.sort();
            paths.dedup();
            prop_assert_eq!(paths.len(), count);
        }

        #[test]
        fn prop_annotate_preserves_original(name in "[a-zA-Z0-9 ._-]{0,40}", body in ".{0,200}") {
            let (writer, _temp) = writer();
            writer.prepare().unwrap();
            let report = writer.allocate_output_path(0);
            std::fs::write(&report, &body).unwrap();

            writer.annotate(&report, &name).unwrap();

            let annotated = std::fs::read_to_string(&report).unwrap();
            prop_assert_eq!(annotated, format!("File Name: {name}\n{body}"));
        }
    }
}
