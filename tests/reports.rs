use std::fs;
use std::path::PathBuf;

use venom::config::OutputFormat;
use venom::report::{SummaryFormatter, write_report};
use venom::suite::{Failure, TestCase, TestSuite, Tests};

fn finished_run() -> Tests {
    let passed = TestSuite {
        name: "api [api.yml]".to_string(),
        package: "api.yml".to_string(),
        tests: 2,
        skipped: 1,
        time: 0.25,
        testcases: vec![
            TestCase {
                name: "health".to_string(),
                classname: "api [api.yml]".to_string(),
                systemout: "up\n".to_string(),
                ..Default::default()
            },
            TestCase {
                name: "later".to_string(),
                classname: "api [api.yml]".to_string(),
                skipped: 1,
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    let failed = TestSuite {
        name: "cli/tool [cli.yml]".to_string(),
        package: "cli.yml".to_string(),
        tests: 1,
        failures: 1,
        time: 1.5,
        testcases: vec![TestCase {
            name: "version".to_string(),
            classname: "cli/tool [cli.yml]".to_string(),
            failures: vec![Failure::new(
                "TestCase:version\n tool --version give Expected: '0'\nActual:   '1'\n(Should be equal)!",
            )],
            systemerr: "boom\n".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    };
    Tests {
        total: 3,
        total_ok: 1,
        total_ko: 1,
        total_skipped: 1,
        test_suites: vec![passed, failed],
    }
}

fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_json_report_round_trips_totals() {
    let dir = tempfile::tempdir().unwrap();
    let tests = finished_run();

    let written = write_report(&tests, OutputFormat::Json, Some(dir.path())).unwrap();
    assert_eq!(names(&written), vec!["test_results.json"]);

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
    assert_eq!(value["total"], 3);
    assert_eq!(value["ok"], 1);
    assert_eq!(value["ko"], 1);
    assert_eq!(value["skipped"], 1);
    assert_eq!(value["test_suites"].as_array().unwrap().len(), 2);

    let parsed: Tests = serde_json::from_value(value).unwrap();
    assert_eq!(parsed.total_ko, tests.total_ko);
    assert_eq!(parsed.test_suites[1].testcases[0].failures, tests.test_suites[1].testcases[0].failures);
}

#[test]
fn test_yaml_report() {
    let dir = tempfile::tempdir().unwrap();
    let written = write_report(&finished_run(), OutputFormat::Yaml, Some(dir.path())).unwrap();
    assert_eq!(names(&written), vec!["test_results.yml"]);

    let parsed: Tests = serde_yaml::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
    assert_eq!((parsed.total, parsed.total_ok, parsed.total_ko, parsed.total_skipped), (3, 1, 1, 1));
    assert_eq!(parsed.test_suites[0].testcases[0].systemout, "up\n");
}

#[test]
fn test_xml_report_one_file_per_suite() {
    let dir = tempfile::tempdir().unwrap();
    let written = write_report(&finished_run(), OutputFormat::Xml, Some(dir.path())).unwrap();
    assert_eq!(
        names(&written),
        vec!["test_results_0_api_api.yml.xml", "test_results_1_cli_tool_cli.yml.xml"]
    );

    let api = fs::read_to_string(&written[0]).unwrap();
    assert!(api.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(api.contains("<testsuite name=\"api [api.yml]\""));
    assert!(api.contains("tests=\"2\""));
    assert!(api.contains("skipped=\"1\""));
    assert!(api.contains("<skipped/>"));
    assert!(api.contains("<system-out>up\n</system-out>"));
    assert!(!api.contains("<failure"));

    let cli = fs::read_to_string(&written[1]).unwrap();
    assert!(cli.contains("failures=\"1\""));
    assert!(cli.contains("<failure message=\"TestCase:version\">"));
    assert!(cli.contains("Expected: &apos;0&apos;") || cli.contains("Expected: '0'"));
    assert!(cli.contains("<system-err>boom\n</system-err>"));
}

#[test]
fn test_xml_report_without_suites_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let written = write_report(&Tests::default(), OutputFormat::Xml, Some(dir.path())).unwrap();
    assert!(written.is_empty());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_summary_line() {
    let tests = finished_run();
    let mut out = Vec::new();
    SummaryFormatter::new(venom::config::DetailsLevel::Low)
        .report(&tests, &mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("result: FAILED. 1 passed, 1 failed, 1 skipped (total 3)"));
}

#[cfg(unix)]
#[test]
fn test_xml_report_of_coloured_output_is_well_formed() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("colour.yml"),
        "name: colour\ntestcases:\n  - name: ansi\n    teststeps:\n      - script: printf '\\033[31mred\\033[0m\\n'\n        assertions:\n          - stdout ShouldContainSubstring nothing-like-this\n",
    )
    .unwrap();

    let tests = venom::RunnerBuilder::new().path(dir.path()).run().unwrap();
    assert_eq!(tests.total_ko, 1);

    let mut out = Vec::new();
    venom::report::render(&tests, OutputFormat::Xml, &mut out).unwrap();
    assert!(!out.contains(&0x1b));

    let xml = String::from_utf8(out).unwrap();
    assert!(xml.contains("<system-out>\u{FFFD}[31mred\u{FFFD}[0m\n</system-out>"));
}
