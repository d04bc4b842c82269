//! Shell-command executor.
//!
//! The step's `script` is written to a temporary file and run by PowerShell
//! on Windows. Elsewhere it runs under the interpreter named on a leading
//! `#!` line, or `/bin/sh`.

use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Instant;

use super::Executor;
use super::capture::spawn_reader;
use crate::core::context::RunContext;
use crate::suite::{ExecResult, StepResult, TestStep};

/// Exit code reported when the process could not be started.
pub const CODE_NOT_STARTED: &str = "127";

#[derive(Debug, Default, Deserialize)]
struct ExecParams {
    #[serde(default)]
    script: String,
}

/// Runs a step's `script` through a shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecExecutor;

impl Executor for ExecExecutor {
    fn name(&self) -> &str {
        "exec"
    }

    fn run(&self, step: &TestStep, ctx: &RunContext) -> StepResult {
        let start = Instant::now();
        let mut result = match step.decode_params::<ExecParams>() {
            Ok(params) if params.script.trim().is_empty() => invalid("invalid command"),
            Ok(params) => run_script(&ctx.apply_aliases(&params.script), &ctx.suite),
            Err(e) => invalid(&format!("invalid exec step: {e}")),
        };
        result.time = start.elapsed().as_secs_f64();
        StepResult::Exec(result)
    }

    fn field(&self, result: &StepResult, name: &str) -> Option<String> {
        let StepResult::Exec(r) = result else {
            return None;
        };
        match name {
            "code" => Some(r.code.clone()),
            "stdout" => Some(r.stdout.clone()),
            "stderr" => Some(r.stderr.clone()),
            "err" => Some(r.err.clone().unwrap_or_default()),
            "time" => Some(r.time.to_string()),
            _ => None,
        }
    }

    fn default_assertion(&self) -> &str {
        "code ShouldEqual 0"
    }

    fn describe(&self, step: &TestStep) -> String {
        step.param_str("script").unwrap_or_default()
    }
}

fn invalid(message: &str) -> ExecResult {
    ExecResult {
        code: "1".to_string(),
        err: Some(message.to_string()),
        ..Default::default()
    }
}

fn not_started(message: String) -> ExecResult {
    ExecResult {
        code: CODE_NOT_STARTED.to_string(),
        err: Some(message),
        ..Default::default()
    }
}

/// Interpreter program and leading arguments for a script.
///
/// Windows always uses PowerShell; elsewhere a `#!` first line wins over
/// `/bin/sh`.
pub(crate) fn interpreter(script: &str) -> (String, Vec<String>) {
    if cfg!(windows) {
        return (
            "PowerShell".to_string(),
            vec![
                "-ExecutionPolicy".to_string(),
                "Bypass".to_string(),
                "-Command".to_string(),
            ],
        );
    }

    if let Some(shebang) = script.lines().next().and_then(|l| l.strip_prefix("#!")) {
        let mut parts = shebang.split_whitespace().map(String::from);
        if let Some(program) = parts.next() {
            return (program, parts.collect());
        }
    }
    ("/bin/sh".to_string(), Vec::new())
}

fn run_script(script: &str, suite: &str) -> ExecResult {
    let script_file = match write_script(script) {
        Ok(path) => path,
        Err(e) => return not_started(format!("cannot write script file: {e}")),
    };

    let (program, args) = interpreter(script);
    log::debug!("[{suite}] running {program} {}", script_file.display());

    let mut cmd = Command::new(&program);
    cmd.args(&args)
        .arg(&*script_file)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return not_started(format!("failed to start {program}: {e}")),
    };

    let stdout = child
        .stdout
        .take()
        .map(|out| spawn_reader(out, format!("[{suite}] stdout")));
    let stderr = child
        .stderr
        .take()
        .map(|err| spawn_reader(err, format!("[{suite}] stderr")));

    let status = child.wait();

    let mut result = ExecResult {
        stdout: stdout.and_then(|h| h.join().ok()).unwrap_or_default(),
        stderr: stderr.and_then(|h| h.join().ok()).unwrap_or_default(),
        ..Default::default()
    };

    match status {
        Ok(status) => result.code = exit_code(status),
        Err(e) => {
            result.code = CODE_NOT_STARTED.to_string();
            result.err = Some(format!("failed to wait for {program}: {e}"));
        }
    }

    // `script_file` is removed here, after the child is gone.
    drop(script_file);
    result
}

/// Write the script to a `venom-*` temporary file that is removed on drop.
fn write_script(script: &str) -> std::io::Result<tempfile::TempPath> {
    let suffix = if cfg!(windows) { ".ps1" } else { "" };
    let mut file = tempfile::Builder::new()
        .prefix("venom-")
        .suffix(suffix)
        .tempfile()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;
    let path = file.into_temp_path();
    make_executable(&path)?;
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Exit code as a string; processes killed by a signal report `128 + signal`.
fn exit_code(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return code.to_string();
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return (128 + signal).to_string();
        }
    }
    "-1".to_string()
}
