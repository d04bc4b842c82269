//! Document model: suites, cases, steps and their results.
//!
//! Suites are deserialized from YAML documents by the [`loader`], mutated in
//! place by the scheduler while they run, and read by the reporters once the
//! run is over.
//!
//! ```yaml
//! name: api
//! testcases:
//!   - name: health
//!     teststeps:
//!       - type: http
//!         url: http://localhost:8080
//!         path: /health
//!         assertions:
//!           - statuscode ShouldEqual 200
//!   - name: cli
//!     skipped: 1
//!     teststeps:
//!       - script: cdsctl version
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::assertion::{Assertion, AssertionError};

pub mod loader;

pub use loader::SuiteLoader;

/// Top-level report: running totals plus every completed suite.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tests {
    /// `ok + ko + skipped`.
    pub total: usize,
    /// Cases counted as passed.
    #[serde(rename = "ok")]
    pub total_ok: usize,
    /// Failures and errors counted against the run.
    #[serde(rename = "ko")]
    pub total_ko: usize,
    /// Skipped cases.
    #[serde(rename = "skipped")]
    pub total_skipped: usize,
    /// Suites in completion order.
    #[serde(default)]
    pub test_suites: Vec<TestSuite>,
}

impl Tests {
    /// Whether nothing failed or errored.
    pub fn is_success(&self) -> bool {
        self.total_ko == 0
    }
}

/// A named collection of test cases loaded from one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestSuite {
    #[serde(default)]
    pub name: String,
    /// Source document path.
    #[serde(default)]
    pub package: String,
    /// Number of cases.
    #[serde(default)]
    pub tests: usize,
    #[serde(default)]
    pub failures: usize,
    #[serde(default)]
    pub errors: usize,
    #[serde(default)]
    pub skipped: usize,
    /// Elapsed wall-clock seconds.
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub testcases: Vec<TestCase>,
    /// Steps across non-skipped cases, computed once at load time.
    #[serde(skip)]
    pub total_steps: usize,
}

impl TestSuite {
    /// Compute the load-time counters: case count, skipped count and step total.
    pub fn prepare(&mut self) {
        self.tests = self.testcases.len();
        self.skipped = self.testcases.iter().filter(|c| c.is_skipped()).count();
        self.total_steps = self
            .testcases
            .iter()
            .filter(|c| !c.is_skipped())
            .map(|c| c.teststeps.len())
            .sum();
    }

    /// Recompute failure, error and skip counters from the cases.
    pub fn recount(&mut self) {
        self.tests = self.testcases.len();
        self.failures = self.testcases.iter().map(|c| c.failures.len()).sum();
        self.errors = self.testcases.iter().map(|c| c.errors.len()).sum();
        self.skipped = self.testcases.iter().filter(|c| c.is_skipped()).count();
    }

    /// Whether any case failed or errored.
    pub fn has_problems(&self) -> bool {
        self.failures > 0 || self.errors > 0
    }
}

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub classname: String,
    /// `1` when the case must not run. Accepts `0`/`1` or a boolean.
    #[serde(default, deserialize_with = "skip_flag")]
    pub skipped: u8,
    /// Assertion mismatches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<Failure>,
    /// Structural problems: unknown step type, unknown function, malformed DSL.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Failure>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub systemout: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub systemerr: String,
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub teststeps: Vec<TestStep>,
}

/// Terminal outcome of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Passed,
    Failed,
    Errored,
    Skipped,
}

impl TestCase {
    /// Whether the case is flagged as skipped.
    pub fn is_skipped(&self) -> bool {
        self.skipped > 0
    }

    /// Outcome derived from the skip flag and recorded failures/errors.
    pub fn status(&self) -> CaseStatus {
        if self.is_skipped() {
            CaseStatus::Skipped
        } else if !self.failures.is_empty() {
            CaseStatus::Failed
        } else if !self.errors.is_empty() {
            CaseStatus::Errored
        } else {
            CaseStatus::Passed
        }
    }

    /// Whether a failure or error has been recorded.
    pub fn has_problems(&self) -> bool {
        !self.failures.is_empty() || !self.errors.is_empty()
    }
}

fn skip_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Int(u8),
        Bool(bool),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Int(n) => n.min(1),
        Flag::Bool(b) => u8::from(b),
    })
}

/// A failure or error message attached to a case.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Failure {
    pub value: String,
}

impl Failure {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// One executable unit inside a case.
///
/// Everything but `type`, `assertions` and `result` is kept as free-form
/// parameters, decoded by the executor that runs the step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestStep {
    /// Executor name. Inferred from the parameters when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Assertion DSL lines. Empty means the executor default.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StepResult>,
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_yaml::Value>,
    /// Assertions compiled at load time, one per `assertions` line.
    #[serde(skip)]
    pub compiled: Vec<std::result::Result<Assertion, AssertionError>>,
}

impl PartialEq for TestStep {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.assertions == other.assertions
            && self.result == other.result
            && self.params == other.params
    }
}

impl TestStep {
    /// Resolve the executor name: explicit `type`, else inferred from known keys.
    pub fn step_type(&self) -> Option<&str> {
        if let Some(ref kind) = self.kind {
            return Some(kind.as_str());
        }
        if self.params.contains_key("script") {
            Some("exec")
        } else if self.params.contains_key("url") {
            Some("http")
        } else {
            None
        }
    }

    /// String value of a parameter, if present and scalar.
    pub fn param_str(&self, key: &str) -> Option<String> {
        match self.params.get(key)? {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            serde_yaml::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Decode the free-form parameters into an executor-specific type.
    pub fn decode_params<T: DeserializeOwned>(&self) -> Result<T, serde_yaml::Error> {
        let mut mapping = serde_yaml::Mapping::new();
        for (key, value) in &self.params {
            mapping.insert(serde_yaml::Value::String(key.clone()), value.clone());
        }
        serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))
    }

    /// Compile the assertion lines. Called once by the loader.
    pub fn compile_assertions(&mut self) {
        self.compiled = self.assertions.iter().map(|a| Assertion::parse(a)).collect();
    }

    /// Compilation problems, if any.
    pub fn compile_errors(&self) -> impl Iterator<Item = &AssertionError> {
        self.compiled.iter().filter_map(|c| c.as_ref().err())
    }
}

/// Executor-specific outcome of one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "executor", rename_all = "lowercase")]
pub enum StepResult {
    Exec(ExecResult),
    Http(HttpResult),
}

impl StepResult {
    /// Execution error, when the step could not be carried out at all.
    pub fn err(&self) -> Option<&str> {
        match self {
            StepResult::Exec(r) => r.err.as_deref(),
            StepResult::Http(r) => r.err.as_deref(),
        }
    }

    /// Text appended to the case's captured standard output.
    pub fn stdout(&self) -> &str {
        match self {
            StepResult::Exec(r) => &r.stdout,
            StepResult::Http(r) => &r.body,
        }
    }

    /// Text appended to the case's captured standard error.
    pub fn stderr(&self) -> &str {
        match self {
            StepResult::Exec(r) => &r.stderr,
            StepResult::Http(_) => "",
        }
    }

    /// Elapsed seconds.
    pub fn time(&self) -> f64 {
        match self {
            StepResult::Exec(r) => r.time,
            StepResult::Http(r) => r.time,
        }
    }
}

/// Outcome of a shell-command step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecResult {
    /// Exit code as a string; `"127"` when the process could not start.
    pub code: String,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(default)]
    pub time: f64,
}

/// Outcome of an HTTP step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HttpResult {
    /// Response status; `0` when no response was received.
    pub statuscode: u16,
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}
