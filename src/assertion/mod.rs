//! Assertion DSL: `<field> <Function> <arg> [<arg>...]`.
//!
//! Lines are parsed once when a suite is loaded into an [`Assertion`], so a
//! malformed line or an unknown function is known before any step runs.
//! Evaluation looks up the field through the owning executor and applies the
//! named comparison function.

use std::fmt;
use std::str::FromStr;

mod functions;

pub use functions::{Arity, AssertionKind};

/// Maximum number of characters of step description kept in a failure message.
const DESCRIPTION_LIMIT: usize = 200;

/// Errors raised while parsing or resolving an assertion line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssertionError {
    /// Fewer than three whitespace-separated tokens.
    #[error("invalid assertion '{line}' len:'{len}'")]
    Malformed { line: String, len: usize },

    /// The function name is not a known comparison function.
    #[error("method not found \"{0}\"")]
    MethodNotFound(String),

    /// The function was given the wrong number of arguments.
    #[error("{function} expects {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: String,
        got: usize,
    },

    /// The executor exposes no field with this name.
    #[error("unknown field \"{field}\" for executor {executor}")]
    UnknownField { field: String, executor: String },
}

/// A parsed assertion line.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    /// Result field the assertion reads.
    pub field: String,
    /// Comparison function.
    pub kind: AssertionKind,
    /// Expected values, as written.
    pub args: Vec<String>,
    line: String,
}

impl Assertion {
    /// Parse one DSL line.
    pub fn parse(line: &str) -> Result<Self, AssertionError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(AssertionError::Malformed {
                line: line.to_string(),
                len: tokens.len(),
            });
        }

        let kind: AssertionKind = tokens[1].parse()?;
        let args: Vec<String> = tokens[2..].iter().map(|s| s.to_string()).collect();
        kind.check_arity(args.len())?;

        Ok(Self {
            field: tokens[0].to_string(),
            kind,
            args,
            line: line.trim().to_string(),
        })
    }

    /// The source line.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Compare a field value against this assertion.
    pub fn check(&self, actual: &str) -> Option<String> {
        self.kind.apply(actual, &self.args)
    }

    /// Resolve the field through `fields` and compare it.
    pub fn evaluate<F>(&self, executor: &str, fields: F) -> Evaluation
    where
        F: Fn(&str) -> Option<String>,
    {
        match fields(&self.field) {
            None => Evaluation::Error(
                AssertionError::UnknownField {
                    field: self.field.clone(),
                    executor: executor.to_string(),
                }
                .to_string(),
            ),
            Some(actual) => match self.check(&actual) {
                None => Evaluation::Passed,
                Some(diagnostic) => Evaluation::Failure(diagnostic),
            },
        }
    }
}

impl FromStr for Assertion {
    type Err = AssertionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Outcome of evaluating one assertion against a step result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Passed,
    /// The comparison did not hold.
    Failure(String),
    /// The assertion could not be evaluated at all.
    Error(String),
}

impl Evaluation {
    /// Convert the outcome of [`Executor::check`](crate::executor::Executor::check).
    pub fn from_check(outcome: Result<Option<String>, AssertionError>) -> Self {
        match outcome {
            Ok(None) => Evaluation::Passed,
            Ok(Some(diagnostic)) => Evaluation::Failure(diagnostic),
            Err(e) => Evaluation::Error(e.to_string()),
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Evaluation::Passed)
    }

    /// Diagnostic text, empty when the assertion passed.
    pub fn diagnostic(&self) -> &str {
        match self {
            Evaluation::Passed => "",
            Evaluation::Failure(msg) | Evaluation::Error(msg) => msg,
        }
    }
}

/// Evaluate a raw DSL line in one go.
///
/// Parse problems come back as [`Evaluation::Error`].
pub fn evaluate<F>(line: &str, executor: &str, fields: F) -> Evaluation
where
    F: Fn(&str) -> Option<String>,
{
    match Assertion::parse(line) {
        Ok(assertion) => assertion.evaluate(executor, fields),
        Err(e) => Evaluation::Error(e.to_string()),
    }
}

/// Build the failure message recorded on a test case.
///
/// The step description is cut to a fixed length; captured output is
/// appended so the report shows what the step printed.
pub fn failure_message(
    case: &str,
    description: &str,
    diagnostic: &str,
    stdout: &str,
    stderr: &str,
) -> String {
    let description = truncate(description, DESCRIPTION_LIMIT);
    let mut msg = format!("TestCase:{case}\n {description} give {diagnostic}");
    if !stdout.is_empty() {
        msg.push_str("\nstdout: ");
        msg.push_str(stdout.trim_end());
    }
    if !stderr.is_empty() {
        msg.push_str("\nstderr: ");
        msg.push_str(stderr.trim_end());
    }
    msg
}

fn truncate(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
