//! Suite discovery and parsing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::TestSuite;
use crate::core::error::{Error, Result};

/// Finds suite documents and parses them into [`TestSuite`]s.
#[derive(Debug, Clone)]
pub struct SuiteLoader {
    glob: String,
    workers: usize,
}

impl SuiteLoader {
    /// Loader using `*.yml` for directories and one worker per CPU.
    pub fn new() -> Self {
        Self {
            glob: "*.yml".to_string(),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }

    /// Pattern a directory argument expands to.
    pub fn glob(mut self, pattern: impl Into<String>) -> Self {
        self.glob = pattern.into();
        self
    }

    /// Number of parsing threads (at least 1).
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Expand input paths into document paths.
    ///
    /// A directory becomes `dir/<glob>`; anything else is used as a glob
    /// pattern, so a plain file path matches itself. Duplicates are dropped,
    /// first occurrence wins.
    pub fn discover(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for input in inputs {
            let pattern = if input.is_dir() {
                input.join(&self.glob)
            } else {
                input.clone()
            };
            let pattern = pattern.to_string_lossy().into_owned();

            let mut matched = 0;
            for entry in glob::glob(&pattern)? {
                match entry {
                    Ok(path) if path.is_file() => {
                        matched += 1;
                        if seen.insert(path.clone()) {
                            files.push(path);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => log::warn!("cannot read {}: {}", e.path().display(), e.error()),
                }
            }
            if matched == 0 {
                log::warn!("no suite found for {pattern}");
            }
        }

        Ok(files)
    }

    /// Read and parse one document.
    ///
    /// The suite name gets the source path appended, counters are computed
    /// and every assertion line is compiled.
    pub fn load_file(path: &Path) -> Result<TestSuite> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::loader(format!("cannot read {}: {}", path.display(), e)))?;
        let mut suite: TestSuite = serde_yaml::from_str(&content)
            .map_err(|e| Error::loader(format!("cannot parse {}: {}", path.display(), e)))?;

        let package = path.display().to_string();
        let base = if suite.name.is_empty() {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            std::mem::take(&mut suite.name)
        };
        suite.name = format!("{base} [{package}]");
        suite.package = package;

        for case in &mut suite.testcases {
            for step in &mut case.teststeps {
                step.compile_assertions();
            }
        }
        suite.prepare();
        Ok(suite)
    }

    /// Parse documents on a bounded pool, keeping per-file outcomes in input order.
    ///
    /// The worker scope is the completion barrier: it returns only once every
    /// worker has joined, so all slots are filled when results are collected.
    pub fn load_each(&self, files: &[PathBuf]) -> Vec<(PathBuf, Result<TestSuite>)> {
        if files.is_empty() {
            return Vec::new();
        }

        let workers = self.workers.min(files.len());
        let next = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<Result<TestSuite>>>> =
            Mutex::new((0..files.len()).map(|_| None).collect());
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let i = next.fetch_add(1, Ordering::SeqCst);
                        let Some(path) = files.get(i) else { break };
                        let outcome = Self::load_file(path);
                        let mut slots = slots.lock().unwrap_or_else(|e| e.into_inner());
                        slots[i] = Some(outcome);
                    }
                });
            }
        });

        let slots = slots.into_inner().unwrap_or_else(|e| e.into_inner());
        files
            .iter()
            .cloned()
            .zip(slots)
            .map(|(path, slot)| {
                let outcome = slot.unwrap_or_else(|| {
                    Err(Error::loader(format!("{} was not parsed", path.display())))
                });
                (path, outcome)
            })
            .collect()
    }

    /// Parse documents in parallel. Failed documents are logged and dropped.
    pub fn load_all(&self, files: &[PathBuf]) -> Vec<TestSuite> {
        self.load_each(files)
            .into_iter()
            .filter_map(|(path, outcome)| match outcome {
                Ok(suite) => Some(suite),
                Err(e) => {
                    log::error!("skipping {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    }
}

impl Default for SuiteLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Assertion lines of a suite that failed to compile, one message per line.
pub fn compile_problems(suite: &TestSuite) -> Vec<String> {
    let mut problems = Vec::new();
    for case in &suite.testcases {
        for (index, step) in case.teststeps.iter().enumerate() {
            for err in step.compile_errors() {
                problems.push(format!(
                    "{}: case {:?} step {}: {}",
                    suite.package,
                    case.name,
                    index + 1,
                    err
                ));
            }
        }
    }
    problems
}
