use crate::config::{Config, ConfigLoader};
use crate::core::context::RunContext;
use crate::core::error::Result;
use crate::core::scheduler::run_suite;
use crate::executor::{Executor, ExecutorRegistry};
use crate::progress::{Indicator, NoProgress, Progress, running_label};
use crate::report::Aggregator;
use crate::suite::loader::compile_problems;
use crate::suite::{SuiteLoader, TestSuite, Tests};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

type ExtraExecutor = (String, Arc<dyn Fn() -> Box<dyn Executor> + Send + Sync>);

/// Builder for configuring and running suites.
pub struct RunnerBuilder {
    config: Config,
    paths: Vec<PathBuf>,
    registry: Option<ExecutorRegistry>,
    extra_executors: Vec<ExtraExecutor>,
    progress: Option<Arc<dyn Progress>>,
}

impl RunnerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            paths: Vec::new(),
            registry: None,
            extra_executors: Vec::new(),
            progress: None,
        }
    }

    /// Set the configuration directly.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a standalone TOML file plus `VENOM_*` overrides.
    pub fn from_config_file(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        self.config = ConfigLoader::new().config_file(path).load()?;
        Ok(self)
    }

    /// Load configuration from `venom.toml` in `dir` (if any) plus `VENOM_*` overrides.
    pub fn from_working_dir(mut self, dir: impl Into<PathBuf>) -> Result<Self> {
        self.config = ConfigLoader::new().working_dir(dir).load()?;
        Ok(self)
    }

    /// Add a file, directory or glob pattern to run.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Add several files, directories or glob patterns.
    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Number of suites run at the same time.
    pub fn parallel(mut self, parallel: usize) -> Self {
        self.config.run.parallel = parallel;
        self
    }

    // --- Executors ---

    /// Replace the executor registry entirely.
    pub fn registry(mut self, registry: ExecutorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register an extra executor on top of the built-in ones.
    pub fn executor<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Executor> + Send + Sync + 'static,
    {
        self.extra_executors.push((name.into(), Arc::new(factory)));
        self
    }

    // --- Progress ---

    /// Set a custom progress display.
    pub fn progress<P: Progress + 'static>(mut self, progress: P) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Use the display matching the configured detail level.
    pub fn progress_from_config(mut self) -> Self {
        self.progress = Some(crate::progress::for_details(self.config.run.details));
        self
    }

    /// Draw nothing (the default).
    pub fn no_progress(mut self) -> Self {
        self.progress = Some(Arc::new(NoProgress));
        self
    }

    // --- Build and Execute ---

    /// Validate the configuration and build the runner.
    pub fn build(self) -> Result<Runner> {
        self.config.validate()?;

        let mut registry = match self.registry {
            Some(registry) => registry,
            None => ExecutorRegistry::with_builtins(&self.config.http)?,
        };
        for (name, factory) in self.extra_executors {
            registry.register(name, move || factory());
        }

        Ok(Runner {
            config: self.config,
            paths: self.paths,
            registry: Arc::new(registry),
            progress: self.progress.unwrap_or_else(|| Arc::new(NoProgress)),
        })
    }

    /// Build and immediately run.
    pub fn run(self) -> Result<Tests> {
        self.build()?.run()
    }
}

impl Default for RunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs suites with bounded parallelism and aggregates their results.
pub struct Runner {
    config: Config,
    paths: Vec<PathBuf>,
    registry: Arc<ExecutorRegistry>,
    progress: Arc<dyn Progress>,
}

impl Runner {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    fn loader(&self) -> SuiteLoader {
        SuiteLoader::new().glob(self.config.run.glob.clone())
    }

    /// Discover and parse every suite. Broken documents are logged and dropped.
    pub fn load(&self) -> Result<Vec<TestSuite>> {
        let loader = self.loader();
        let files = loader.discover(&self.paths)?;
        log::info!("{} suite document(s) found", files.len());
        Ok(loader.load_all(&files))
    }

    /// Load every suite without running anything and list the problems found:
    /// unparsable documents, assertion lines that do not compile and step
    /// types no executor handles.
    pub fn check(&self) -> Result<Vec<String>> {
        let loader = self.loader();
        let files = loader.discover(&self.paths)?;

        let mut problems = Vec::new();
        for (path, outcome) in loader.load_each(&files) {
            let suite = match outcome {
                Ok(suite) => suite,
                Err(e) => {
                    problems.push(format!("{}: {}", path.display(), e));
                    continue;
                }
            };
            problems.extend(compile_problems(&suite));
            for case in &suite.testcases {
                for (index, step) in case.teststeps.iter().enumerate() {
                    let known = step
                        .step_type()
                        .is_some_and(|ty| self.registry.contains(ty));
                    if !known {
                        problems.push(format!(
                            "{}: case {:?} step {}: unsupported step type \"{}\"",
                            suite.package,
                            case.name,
                            index + 1,
                            step.step_type().unwrap_or_default()
                        ));
                    }
                }
            }
        }
        Ok(problems)
    }

    /// Load and run every suite.
    pub fn run(&self) -> Result<Tests> {
        let suites = self.load()?;
        Ok(self.run_suites(suites))
    }

    /// Run already-loaded suites.
    ///
    /// At most `parallel` suites run at once. Each finished suite is sent to
    /// a single aggregating thread, so `Tests::test_suites` is in completion
    /// order.
    pub fn run_suites(&self, suites: Vec<TestSuite>) -> Tests {
        let parallel = self.config.parallelism();
        let ctx = RunContext::new(&self.config);

        // Every indicator exists before drawing starts.
        let jobs: Vec<(TestSuite, Box<dyn Indicator>)> = suites
            .into_iter()
            .map(|suite| {
                let indicator = self
                    .progress
                    .indicator(&running_label(&suite.package), suite.total_steps as u64);
                (suite, indicator)
            })
            .collect();

        log::info!("running {} suite(s), {} at a time", jobs.len(), parallel);
        self.progress.start();

        // Holding a slot means having an item queued in `slots`.
        let (slot_tx, slot_rx) = mpsc::sync_channel::<()>(parallel);
        let slot_rx = Mutex::new(slot_rx);
        let (done_tx, done_rx) = mpsc::channel::<TestSuite>();
        let registry = self.registry.as_ref();

        let tests = std::thread::scope(|scope| {
            let aggregator = scope.spawn(move || {
                let mut aggregator = Aggregator::new();
                for suite in done_rx {
                    aggregator.push(suite);
                }
                aggregator.finish()
            });

            for (mut suite, mut indicator) in jobs {
                if slot_tx.send(()).is_err() {
                    break;
                }
                let slot = Slot { queue: &slot_rx };
                let done_tx = done_tx.clone();
                let ctx = &ctx;
                scope.spawn(move || {
                    let _slot = slot;
                    run_suite(&mut suite, registry, ctx, indicator.as_mut());
                    // The aggregator outlives every suite task.
                    let _ = done_tx.send(suite);
                });
            }
            drop(done_tx);

            aggregator.join().unwrap_or_else(|_| {
                log::error!("result aggregation stopped unexpectedly");
                Tests::default()
            })
        });

        self.progress.stop();
        tests
    }
}

/// A concurrency slot, released on drop.
struct Slot<'a> {
    queue: &'a Mutex<Receiver<()>>,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        let queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        let _ = queue.recv();
    }
}
