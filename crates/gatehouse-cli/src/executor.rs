use gatehouse_core::gate::{GateExecutor, GateResult};
use gatehouse_core::paths;
use gatehouse_core::policy::Policy;
use gatehouse_core::task::Task;
use gatehouse_core::types::GateStatus;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// Keep only the tail of verbose gate output.
const MAX_OUTPUT: usize = 10 * 1024;

/// Runs policy gates as `sh -c <command>` in the project root.
///
/// Each task gets its own executor so the task context can be exported to
/// the gate through `GATEHOUSE_*` environment variables.
pub struct ShellGateExecutor<'p> {
    policy: &'p Policy,
    root: PathBuf,
    env: Vec<(&'static str, String)>,
}

impl<'p> ShellGateExecutor<'p> {
    pub fn for_task(
        policy: &'p Policy,
        root: &Path,
        run_id: &str,
        task: &Task,
        artifacts_dir: &Path,
    ) -> Self {
        // Gates write extra evidence next to the run's reports.
        let run_dir = paths::run_dir(artifacts_dir, run_id);
        let env = vec![
            ("GATEHOUSE_RUN_ID", run_id.to_string()),
            ("GATEHOUSE_TASK_ID", task.id.clone()),
            ("GATEHOUSE_TASK_TITLE", task.title.clone()),
            ("GATEHOUSE_TASK_TAGS", task.tags.join(",")),
            ("GATEHOUSE_TASK_SOURCE_LINE", task.source_line.to_string()),
            (
                "GATEHOUSE_ARTIFACTS_DIR",
                artifacts_dir.to_string_lossy().into_owned(),
            ),
            (
                "GATEHOUSE_TASK_ARTIFACT_DIR",
                run_dir.to_string_lossy().into_owned(),
            ),
        ];
        Self {
            policy,
            root: root.to_path_buf(),
            env,
        }
    }
}

impl GateExecutor for ShellGateExecutor<'_> {
    fn execute(&mut self, gate_id: &str, attempt: u32) -> GateResult {
        let Some(gate) = self.policy.gate(gate_id) else {
            return GateResult::not_run(gate_id, attempt, "", format!("unknown gate: {gate_id}"));
        };
        let timeout = match gate.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        tracing::debug!(gate = gate_id, attempt, command = %gate.command, "running gate");
        let start = Instant::now();
        let out = run_shell(&gate.command, &self.root, &self.env, timeout);
        let duration_ms = start.elapsed().as_millis() as u64;

        let (status, return_code, stderr) = match out.outcome {
            ShellOutcome::Exited(code) => (GateStatus::from_success(code == 0), code, out.stderr),
            ShellOutcome::Signalled => (
                GateStatus::Failed,
                -1,
                append_line(out.stderr, "terminated by signal"),
            ),
            ShellOutcome::Error(msg) => (GateStatus::Failed, -1, append_line(out.stderr, &msg)),
        };

        GateResult {
            gate_id: gate_id.to_string(),
            status,
            attempt,
            duration_ms,
            command: gate.command.clone(),
            stdout: out.stdout,
            stderr,
            return_code,
            log_ref: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Process plumbing
// ---------------------------------------------------------------------------

enum ShellOutcome {
    Exited(i32),
    Signalled,
    /// Spawn failure, wait failure or timeout.
    Error(String),
}

struct ShellOutput {
    outcome: ShellOutcome,
    stdout: String,
    stderr: String,
}

/// Run `sh -c <command>` with an optional timeout.
///
/// stdout/stderr are drained on dedicated threads so a chatty gate can't
/// deadlock on a full pipe. The timeout uses a waiter thread and
/// `recv_timeout`. The shell leads its own process group, so on expiry the
/// whole group is killed and whatever output was read so far is kept.
fn run_shell(
    command: &str,
    cwd: &Path,
    env: &[(&'static str, String)],
    timeout: Option<Duration>,
) -> ShellOutput {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let spawned = cmd.spawn();
    let mut child = match spawned {
        Ok(c) => c,
        Err(e) => {
            return ShellOutput {
                outcome: ShellOutcome::Error(format!("failed to spawn: {e}")),
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    };
    let child_pid = child.id();

    let stdout_thread = spawn_reader(child.stdout.take());
    let stderr_thread = spawn_reader(child.stderr.take());

    let outcome = match timeout {
        None => wait_outcome(child.wait()),
        Some(limit) => {
            let (tx, rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(child.wait());
            });
            match rx.recv_timeout(limit) {
                Ok(result) => wait_outcome(result),
                Err(_) => {
                    // Readers hit EOF once every process holding the pipes is gone.
                    kill_process_group(child_pid);
                    ShellOutcome::Error(format!("timed out after {}s", limit.as_secs()))
                }
            }
        }
    };

    let stdout = cap_tail(&stdout_thread.join().unwrap_or_default());
    let stderr = cap_tail(&stderr_thread.join().unwrap_or_default());
    ShellOutput {
        outcome,
        stdout,
        stderr,
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> std::thread::JoinHandle<String>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = pipe {
            let _ = r.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn wait_outcome(result: std::io::Result<ExitStatus>) -> ShellOutcome {
    match result {
        Ok(status) => match status.code() {
            Some(code) => ShellOutcome::Exited(code),
            None => ShellOutcome::Signalled,
        },
        Err(e) => ShellOutcome::Error(format!("wait failed: {e}")),
    }
}

/// Last `MAX_OUTPUT` bytes of `s`, snapped forward to a char boundary.
fn cap_tail(s: &str) -> String {
    if s.len() <= MAX_OUTPUT {
        return s.to_string();
    }
    let mut start = s.len() - MAX_OUTPUT;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

fn append_line(mut buf: String, line: &str) -> String {
    if !buf.is_empty() && !buf.ends_with('\n') {
        buf.push('\n');
    }
    buf.push_str(line);
    buf
}

/// SIGKILL the process group led by `pgid`. Best-effort.
fn kill_process_group(pgid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg("--")
        .arg(format!("-{pgid}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
