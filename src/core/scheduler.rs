//! Suite, case and step execution.
//!
//! Cases run in declared order, steps within a case strictly one after the
//! other. After each step every assertion of that step is evaluated; the
//! first step that leaves a failure or error on its case ends the case.

use std::time::Instant;

use crate::assertion::{Assertion, AssertionError, Evaluation, failure_message};
use crate::core::context::RunContext;
use crate::executor::{Executor, ExecutorRegistry};
use crate::progress::{Indicator, finished_label};
use crate::suite::{Failure, StepResult, TestCase, TestStep, TestSuite};

/// What one step left behind.
#[derive(Debug, Default)]
pub struct StepOutcome {
    pub result: Option<StepResult>,
    pub failures: Vec<String>,
    pub errors: Vec<String>,
}

impl StepOutcome {
    fn error(message: String) -> Self {
        Self {
            errors: vec![message],
            ..Default::default()
        }
    }
}

/// Run every case of `suite` and recompute its counters.
pub fn run_suite(
    suite: &mut TestSuite,
    registry: &ExecutorRegistry,
    ctx: &RunContext,
    indicator: &mut dyn Indicator,
) {
    let start = Instant::now();
    let ctx = ctx.for_suite(&suite.name);
    log::info!("[{}] starting {} case(s)", suite.name, suite.testcases.len());

    for case in &mut suite.testcases {
        case.classname = ctx.suite.clone();
        run_case(case, registry, &ctx, indicator);
    }

    let elapsed = start.elapsed();
    suite.recount();
    suite.time = elapsed.as_secs_f64();
    indicator.finish(&finished_label(&suite.package, !suite.has_problems()), elapsed);
}

/// Run the steps of one case until one of them fails.
pub fn run_case(
    case: &mut TestCase,
    registry: &ExecutorRegistry,
    ctx: &RunContext,
    indicator: &mut dyn Indicator,
) {
    if case.is_skipped() {
        log::debug!("[{}] [{}] skipped", ctx.suite, case.name);
        return;
    }

    let start = Instant::now();
    for index in 0..case.teststeps.len() {
        let outcome = run_step(&case.teststeps[index], &case.name, registry, ctx);

        if let Some(ref result) = outcome.result {
            case.systemout.push_str(result.stdout());
            case.systemerr.push_str(result.stderr());
            if let Some(err) = result.err() {
                case.systemerr.push_str(err);
                case.systemerr.push('\n');
            }
        }
        case.teststeps[index].result = outcome.result;
        case.failures
            .extend(outcome.failures.into_iter().map(Failure::new));
        case.errors.extend(outcome.errors.into_iter().map(Failure::new));
        indicator.increment();

        if case.has_problems() {
            let remaining = case.teststeps.len() - index - 1;
            if remaining > 0 {
                log::debug!(
                    "[{}] [{}] step {} failed, {} step(s) not run",
                    ctx.suite,
                    case.name,
                    index + 1,
                    remaining
                );
            }
            break;
        }
    }
    case.time = start.elapsed().as_secs_f64();
    log::debug!("[{}] [{}] {:?}", ctx.suite, case.name, case.status());
}

/// Execute one step and evaluate its assertions.
pub fn run_step(
    step: &TestStep,
    case_name: &str,
    registry: &ExecutorRegistry,
    ctx: &RunContext,
) -> StepOutcome {
    let Some(step_type) = step.step_type() else {
        return StepOutcome::error("step has no type and none can be inferred".to_string());
    };
    let Some(executor) = registry.create(step_type) else {
        return StepOutcome::error(format!("unsupported step type \"{step_type}\""));
    };

    log::debug!("[{}] [{case_name}] running {step_type} step", ctx.suite);
    let result = executor.run(step, ctx);

    let uses_default = step.assertions.is_empty();
    let assertions = assertions_for(step, executor.as_ref());

    let mut outcome = StepOutcome::default();
    for assertion in &assertions {
        let evaluation = match assertion {
            Ok(assertion) => Evaluation::from_check(executor.check(assertion, &result)),
            Err(e) => Evaluation::Error(e.to_string()),
        };
        match evaluation {
            Evaluation::Passed => {}
            Evaluation::Failure(diagnostic) => outcome.failures.push(failure_message(
                case_name,
                &executor.describe(step),
                &diagnostic,
                result.stdout(),
                result.stderr(),
            )),
            Evaluation::Error(message) => outcome.errors.push(message),
        }
    }

    // The default assertion may not look at the field an execution error
    // shows up in, so surface the error itself.
    if uses_default && outcome.failures.is_empty() {
        if let Some(err) = result.err() {
            outcome.failures.push(failure_message(
                case_name,
                &executor.describe(step),
                &format!("execution error: {err}"),
                result.stdout(),
                result.stderr(),
            ));
        }
    }

    outcome.result = Some(result);
    outcome
}

/// Compiled assertions of a step, or the executor default when it declares none.
fn assertions_for(
    step: &TestStep,
    executor: &dyn Executor,
) -> Vec<Result<Assertion, AssertionError>> {
    if step.assertions.is_empty() {
        vec![Assertion::parse(executor.default_assertion())]
    } else if step.compiled.len() == step.assertions.len() {
        step.compiled.clone()
    } else {
        // Steps built in code rather than by the loader.
        step.assertions.iter().map(|a| Assertion::parse(a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::exec::ExecExecutor;
    use crate::progress::NoProgress;
    use crate::progress::Progress;
    use crate::suite::{CaseStatus, ExecResult};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the step's `code` parameter back as exit code and counts calls.
    struct Stub {
        calls: Arc<AtomicUsize>,
    }

    impl Executor for Stub {
        fn name(&self) -> &str {
            "stub"
        }

        fn run(&self, step: &TestStep, _ctx: &RunContext) -> StepResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            StepResult::Exec(ExecResult {
                code: step.param_str("code").unwrap_or_else(|| "0".to_string()),
                stdout: "out\n".to_string(),
                err: step.param_str("err"),
                ..Default::default()
            })
        }

        fn field(&self, result: &StepResult, name: &str) -> Option<String> {
            ExecExecutor.field(result, name)
        }

        fn default_assertion(&self) -> &str {
            "code ShouldEqual 0"
        }
    }

    fn registry(calls: &Arc<AtomicUsize>) -> ExecutorRegistry {
        let mut registry = ExecutorRegistry::new();
        let calls = Arc::clone(calls);
        registry.register("stub", move || {
            Box::new(Stub {
                calls: Arc::clone(&calls),
            })
        });
        registry
    }

    fn case(yaml: &str) -> TestCase {
        let mut case: TestCase = serde_yaml::from_str(yaml).unwrap();
        for step in &mut case.teststeps {
            step.compile_assertions();
        }
        case
    }

    fn run(case: &mut TestCase, calls: &Arc<AtomicUsize>) {
        let mut indicator = NoProgress.indicator("x", 0);
        run_case(case, &registry(calls), &RunContext::default(), indicator.as_mut());
    }

    #[test]
    fn test_all_steps_run_when_passing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut c = case(
            "name: c\nteststeps:\n  - type: stub\n  - type: stub\n  - type: stub\n",
        );
        run(&mut c, &calls);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(c.status(), CaseStatus::Passed);
        assert_eq!(c.systemout, "out\nout\nout\n");
        assert!(c.teststeps.iter().all(|s| s.result.is_some()));
    }

    #[test]
    fn test_short_circuit_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut c = case(
            "name: c\nteststeps:\n  - type: stub\n  - type: stub\n    code: 1\n  - type: stub\n",
        );
        run(&mut c, &calls);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(c.status(), CaseStatus::Failed);
        assert_eq!(c.failures.len(), 1);
        assert!(c.teststeps[2].result.is_none());
    }

    #[test]
    fn test_short_circuit_on_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut c = case(
            "name: c\nteststeps:\n  - type: stub\n    assertions:\n      - code NotAFunction 0\n  - type: stub\n",
        );
        run(&mut c, &calls);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.status(), CaseStatus::Errored);
        assert_eq!(c.errors[0].value, "method not found \"NotAFunction\"");
        assert!(c.failures.is_empty());
    }

    #[test]
    fn test_unsupported_step_type_is_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut c = case("name: c\nteststeps:\n  - type: ssh\n  - type: stub\n");
        run(&mut c, &calls);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(c.errors[0].value, "unsupported step type \"ssh\"");
    }

    #[test]
    fn test_untyped_step_is_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut c = case("name: c\nteststeps:\n  - foo: bar\n");
        run(&mut c, &calls);
        assert_eq!(c.status(), CaseStatus::Errored);
    }

    #[test]
    fn test_all_assertions_of_failing_step_evaluated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut c = case(
            "name: c\nteststeps:\n  - type: stub\n    code: 2\n    assertions:\n      - code ShouldEqual 0\n      - stdout ShouldContainSubstring nope\n      - stdout ShouldContainSubstring out\n",
        );
        run(&mut c, &calls);
        assert_eq!(c.failures.len(), 2);
    }

    #[test]
    fn test_failure_message_is_augmented() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut c = case("name: broken\nteststeps:\n  - type: stub\n    code: 1\n");
        run(&mut c, &calls);
        let msg = &c.failures[0].value;
        assert!(msg.starts_with("TestCase:broken\n "));
        assert!(msg.contains("give Expected: '0'"));
        assert!(msg.contains("stdout: out"));
    }

    #[test]
    fn test_execution_error_with_default_assertion_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut c = case("name: c\nteststeps:\n  - type: stub\n    err: connection refused\n");
        run(&mut c, &calls);
        assert_eq!(c.status(), CaseStatus::Failed);
        assert!(c.failures[0].value.contains("execution error: connection refused"));
        assert!(c.systemerr.contains("connection refused"));
    }

    #[test]
    fn test_execution_error_with_explicit_assertions_left_to_them() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut c = case(
            "name: c\nteststeps:\n  - type: stub\n    err: boom\n    assertions:\n      - err ShouldEqual boom\n",
        );
        run(&mut c, &calls);
        assert_eq!(c.status(), CaseStatus::Passed);
    }

    #[test]
    fn test_skipped_case_runs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut c = case("name: c\nskipped: 1\nteststeps:\n  - type: stub\n");
        run(&mut c, &calls);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(c.status(), CaseStatus::Skipped);
    }

    #[test]
    fn test_run_suite_recounts_and_sets_classname() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut suite: TestSuite = serde_yaml::from_str(
            "name: s\npackage: s.yml\ntestcases:\n  - name: a\n    teststeps:\n      - type: stub\n        code: 1\n  - name: b\n    teststeps:\n      - type: stub\n  - name: c\n    skipped: 1\n",
        )
        .unwrap();
        suite.prepare();

        let mut indicator = NoProgress.indicator("s", suite.total_steps as u64);
        run_suite(&mut suite, &registry(&calls), &RunContext::default(), indicator.as_mut());

        assert_eq!((suite.tests, suite.failures, suite.errors, suite.skipped), (3, 1, 0, 1));
        assert!(suite.testcases.iter().all(|c| c.classname == "s"));
        assert!(suite.time >= 0.0);
    }
}
