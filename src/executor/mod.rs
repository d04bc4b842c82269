//! Executor trait, built-in executors and the registry mapping step types to them.
//!
//! An executor runs one [`TestStep`] and produces a [`StepResult`]. It also
//! owns the field names assertions may read from that result and the
//! assertion applied when a step declares none.
//!
//! # Custom executor
//!
//! ```no_run
//! use venom::core::RunContext;
//! use venom::executor::{Executor, ExecutorRegistry};
//! use venom::suite::{ExecResult, StepResult, TestStep};
//!
//! struct Noop;
//!
//! impl Executor for Noop {
//!     fn name(&self) -> &str {
//!         "noop"
//!     }
//!
//!     fn run(&self, _step: &TestStep, _ctx: &RunContext) -> StepResult {
//!         StepResult::Exec(ExecResult { code: "0".into(), ..Default::default() })
//!     }
//!
//!     fn field(&self, result: &StepResult, name: &str) -> Option<String> {
//!         venom::executor::exec::ExecExecutor.field(result, name)
//!     }
//!
//!     fn default_assertion(&self) -> &str {
//!         "code ShouldEqual 0"
//!     }
//! }
//!
//! let mut registry = ExecutorRegistry::new();
//! registry.register("noop", || Box::new(Noop));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::assertion::{Assertion, AssertionError};
use crate::config::HttpConfig;
use crate::core::context::RunContext;
use crate::core::error::Result;
use crate::suite::{StepResult, TestStep};

mod capture;
pub mod exec;
#[cfg(feature = "http")]
pub mod http;

/// A pluggable step executor.
pub trait Executor: Send + Sync {
    /// Step type handled by this executor.
    fn name(&self) -> &str;

    /// Run one step. Failures to carry the step out are recorded in the
    /// result's `err` field, never returned.
    fn run(&self, step: &TestStep, ctx: &RunContext) -> StepResult;

    /// Textual value of a named field of `result`, or `None` if the field
    /// does not exist for this executor.
    fn field(&self, result: &StepResult, name: &str) -> Option<String>;

    /// Assertion applied when a step declares none.
    fn default_assertion(&self) -> &str;

    /// Short human-readable description of a step, used in failure messages.
    fn describe(&self, step: &TestStep) -> String {
        serde_yaml::to_string(&step.params)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default()
    }

    /// Evaluate a parsed assertion against a result.
    ///
    /// `Ok(None)` means it held, `Ok(Some(diagnostic))` means it did not.
    fn check(
        &self,
        assertion: &Assertion,
        result: &StepResult,
    ) -> std::result::Result<Option<String>, AssertionError> {
        match self.field(result, &assertion.field) {
            Some(actual) => Ok(assertion.check(&actual)),
            None => Err(AssertionError::UnknownField {
                field: assertion.field.clone(),
                executor: self.name().to_string(),
            }),
        }
    }
}

/// Constructor stored in the registry.
pub type ExecutorFactory = Arc<dyn Fn() -> Box<dyn Executor> + Send + Sync>;

/// Name to executor factory table.
///
/// Built once before a run and shared read-only between suite tasks.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    factories: BTreeMap<String, ExecutorFactory>,
}

impl ExecutorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `exec` and (feature `http`) `http` executors.
    pub fn with_builtins(http: &HttpConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register("exec", || Box::new(exec::ExecExecutor));

        #[cfg(feature = "http")]
        {
            let client = http::build_client(http)?;
            registry.register("http", move || {
                Box::new(http::HttpExecutor::new(client.clone()))
            });
        }
        #[cfg(not(feature = "http"))]
        let _ = http;

        Ok(registry)
    }

    /// Register (or replace) the factory for a step type.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Executor> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Instantiate the executor for a step type.
    pub fn create(&self, name: &str) -> Option<Box<dyn Executor>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered step types, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("executors", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::ExecResult;

    struct Fixed;

    impl Executor for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn run(&self, _step: &TestStep, _ctx: &RunContext) -> StepResult {
            StepResult::Exec(ExecResult {
                code: "3".to_string(),
                ..Default::default()
            })
        }

        fn field(&self, result: &StepResult, name: &str) -> Option<String> {
            match (result, name) {
                (StepResult::Exec(r), "code") => Some(r.code.clone()),
                _ => None,
            }
        }

        fn default_assertion(&self) -> &str {
            "code ShouldEqual 3"
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = ExecutorRegistry::with_builtins(&HttpConfig::default()).unwrap();
        assert!(registry.contains("exec"));
        #[cfg(feature = "http")]
        assert!(registry.contains("http"));
        assert!(!registry.contains("ssh"));
        assert!(registry.create("ssh").is_none());
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = ExecutorRegistry::new();
        registry.register("fixed", || Box::new(Fixed));
        assert_eq!(registry.names(), vec!["fixed"]);

        let executor = registry.create("fixed").unwrap();
        assert_eq!(executor.name(), "fixed");
        let result = executor.run(&TestStep::default(), &RunContext::default());
        assert_eq!(executor.field(&result, "code").as_deref(), Some("3"));
    }

    #[test]
    fn test_default_check_uses_field() {
        let result = Fixed.run(&TestStep::default(), &RunContext::default());

        let ok = Assertion::parse("code ShouldEqual 3").unwrap();
        assert_eq!(Fixed.check(&ok, &result), Ok(None));

        let bad = Assertion::parse("code ShouldEqual 0").unwrap();
        assert!(Fixed.check(&bad, &result).unwrap().is_some());

        let unknown = Assertion::parse("body ShouldEqual 0").unwrap();
        assert_eq!(
            Fixed.check(&unknown, &result),
            Err(AssertionError::UnknownField {
                field: "body".to_string(),
                executor: "fixed".to_string(),
            })
        );
    }

    #[test]
    fn test_registry_debug_lists_names() {
        let mut registry = ExecutorRegistry::new();
        registry.register("fixed", || Box::new(Fixed));
        assert_eq!(
            format!("{registry:?}"),
            "ExecutorRegistry { executors: [\"fixed\"] }"
        );
    }
}
