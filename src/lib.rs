//! venom: a declarative integration-test runner.
//!
//! Test suites are YAML documents made of test cases, each an ordered list of
//! steps. A step is run by an [`Executor`](executor::Executor) (a shell
//! command, an HTTP request, or anything registered by the caller) and its
//! result is checked with one-line assertions such as
//! `code ShouldEqual 0` or `body ShouldContainSubstring ready`.
//!
//! # Quick Start
//!
//! ```no_run
//! use venom::builder;
//!
//! # fn main() -> venom::Result<()> {
//! let tests = builder()
//!     .from_working_dir(".")?
//!     .path("tests/")
//!     .parallel(4)
//!     .run()?;
//!
//! venom::report::write_report(&tests, venom::config::OutputFormat::Xml, None)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Suite document
//!
//! ```yaml
//! name: api
//! testcases:
//!   - name: server answers
//!     teststeps:
//!       - type: http
//!         url: http://localhost:8080
//!         path: /health
//!         assertions:
//!           - statuscode ShouldEqual 200
//!           - body ShouldContainSubstring ok
//!   - name: cli prints its version
//!     teststeps:
//!       - script: mytool --version
//!         assertions:
//!           - stdout ShouldStartWith mytool
//! ```
//!
//! ## Configuration in venom.toml
//!
//! ```toml
//! [run]
//! parallel = 4
//! details = "low"
//! alias = ["mytool:./target/debug/mytool --config ci.toml"]
//!
//! [output]
//! format = "json"
//! dir = "results"
//!
//! [http]
//! timeout-secs = 30
//! ```
//!
//! # Architecture
//!
//! - [`suite`]: the document model and the [`SuiteLoader`](suite::SuiteLoader)
//! - [`executor`]: the [`Executor`](executor::Executor) trait, built-in `exec`
//!   and `http` executors and the [`ExecutorRegistry`](executor::ExecutorRegistry)
//! - [`assertion`]: the assertion DSL and its comparison functions
//! - [`core`]: the [`RunnerBuilder`], the scheduler and the run context
//! - [`progress`]: live progress display
//! - [`report`]: aggregation, JSON/YAML/JUnit XML reports and the terminal summary
//!
//! # Features
//!
//! - `default` - Enables `cli`, `http` and `progress`
//! - `cli` - The `venom` binary
//! - `http` - The `http` executor
//! - `progress` - Progress bars

pub mod assertion;
pub mod config;
pub mod core;
pub mod executor;
pub mod progress;
pub mod report;
pub mod suite;
pub mod util;

// Re-export commonly used types
pub use crate::core::{Error, Result, Runner, RunnerBuilder};
pub use config::Config;
pub use suite::{TestSuite, Tests};

/// Create a new runner builder.
///
/// This is the main entry point for the fluent API.
pub fn builder() -> RunnerBuilder {
    RunnerBuilder::new()
}
