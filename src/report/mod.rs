//! Result aggregation and report serialization.
//!
//! JSON and YAML reports hold the whole result tree in one document
//! (`test_results.json` / `test_results.yml`). XML reports are JUnit style,
//! one document per suite (`test_results_<index>_<name>.xml`). Without an
//! output directory everything is written to the given writer instead.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::OutputFormat;
use crate::core::error::{Error, Result};
use crate::suite::Tests;
use crate::util::{sanitize_file_name, write_file};

mod aggregate;
mod formatter;
pub mod xml;

pub use aggregate::Aggregator;
pub use formatter::SummaryFormatter;

/// Base name of report files.
pub const REPORT_BASENAME: &str = "test_results";

/// Serialize `tests` in `format` to `out`.
pub fn render(tests: &Tests, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, tests)?;
            writeln!(out)?;
        }
        OutputFormat::Yaml => serde_yaml::to_writer(&mut *out, tests)?,
        OutputFormat::Xml => {
            for suite in &tests.test_suites {
                xml::write_suite(&mut *out, suite)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Write the report into `dir`, returning the files written.
pub fn write_to_dir(tests: &Tests, format: OutputFormat, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    match format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let mut buf = Vec::new();
            render(tests, format, &mut buf)?;
            let path = dir.join(format!("{REPORT_BASENAME}.{}", format.extension()));
            write_file(&path, &buf).map_err(|e| Error::report(e.to_string()))?;
            written.push(path);
        }
        OutputFormat::Xml => {
            for (index, suite) in tests.test_suites.iter().enumerate() {
                let xml = xml::suite_to_string(suite)?;
                let path = dir.join(format!(
                    "{REPORT_BASENAME}_{index}_{}.xml",
                    sanitize_file_name(&suite.name)
                ));
                write_file(&path, xml.as_bytes()).map_err(|e| Error::report(e.to_string()))?;
                written.push(path);
            }
        }
    }
    for path in &written {
        log::info!("report written to {}", path.display());
    }
    Ok(written)
}

/// Write the report to `dir` when given, else to standard output.
pub fn write_report(
    tests: &Tests,
    format: OutputFormat,
    dir: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    match dir {
        Some(dir) => write_to_dir(tests, format, dir),
        None => {
            render(tests, format, &mut std::io::stdout().lock())?;
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::{TestCase, TestSuite};

    fn sample() -> Tests {
        let suite = |name: &str| TestSuite {
            name: name.to_string(),
            package: format!("{name}.yml"),
            tests: 1,
            testcases: vec![TestCase {
                name: "case".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        Tests {
            total: 2,
            total_ok: 2,
            total_ko: 0,
            total_skipped: 0,
            test_suites: vec![suite("first [a.yml]"), suite("second [b.yml]")],
        }
    }

    #[test]
    fn test_render_json_round_trips() {
        let mut buf = Vec::new();
        render(&sample(), OutputFormat::Json, &mut buf).unwrap();
        let parsed: Tests = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed.total_ok, 2);
        assert_eq!(parsed.test_suites.len(), 2);
    }

    #[test]
    fn test_render_yaml_keys() {
        let mut buf = Vec::new();
        render(&sample(), OutputFormat::Yaml, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("ok: 2"));
        assert!(text.contains("test_suites:"));
    }

    #[test]
    fn test_render_xml_concatenates_suites() {
        let mut buf = Vec::new();
        render(&sample(), OutputFormat::Xml, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.matches("<?xml").count(), 2);
    }

    #[test]
    fn test_write_to_dir_json() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_to_dir(&sample(), OutputFormat::Json, dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("test_results.json")]);
        assert!(files[0].is_file());
    }

    #[test]
    fn test_write_to_dir_yaml_extension() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_to_dir(&sample(), OutputFormat::Yaml, dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("test_results.yml")]);
    }

    #[test]
    fn test_write_to_dir_xml_one_file_per_suite() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_to_dir(&sample(), OutputFormat::Xml, dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("test_results_0_first_a.yml.xml"),
                dir.path().join("test_results_1_second_b.yml.xml"),
            ]
        );
        for file in files {
            let content = std::fs::read_to_string(file).unwrap();
            assert!(content.contains("<testsuite "));
        }
    }
}
