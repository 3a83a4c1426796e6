use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Toolchain;
use crate::errors::OpsbenchError;
use crate::types::BenchmarkSpec;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Anything that can turn a benchmark into captured output text.
pub trait OutputSource {
    /// Output of one successful execution, or the reason there is none.
    fn capture(&self, spec: &BenchmarkSpec) -> Result<String, OpsbenchError>;
}

/// Builds each benchmark with an external toolchain and runs the result
/// under a wall-clock timeout.
#[derive(Debug, Clone)]
pub struct BenchmarkRunner {
    toolchain: Toolchain,
    timeout: Duration,
}

impl BenchmarkRunner {
    pub fn new(toolchain: Toolchain, timeout: Duration) -> Self {
        BenchmarkRunner { toolchain, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn timed_out(&self, spec: &BenchmarkSpec) -> OpsbenchError {
        OpsbenchError::ExecutionTimedOut {
            name: spec.name.clone(),
            timeout: self.timeout(),
        }
    }

    /// Wait for a pipe reader until `deadline`.
    fn collect(
        &self,
        rx: &Receiver<String>,
        deadline: Instant,
        spec: &BenchmarkSpec,
    ) -> Result<String, OpsbenchError> {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(text) => Ok(text),
            Err(RecvTimeoutError::Timeout) => Err(self.timed_out(spec)),
            // The reader thread died without sending; treat as no output.
            Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
        }
    }

    /// Compile `spec.source` into `spec.executable` inside its work dir.
    pub fn build(&self, spec: &BenchmarkSpec) -> Result<PathBuf, OpsbenchError> {
        let source = spec.source_path();
        let output = spec.executable_path();
        let args = self.toolchain.expand_args(&source, &output);
        let failed = |detail: String| OpsbenchError::BuildFailed {
            name: spec.name.clone(),
            detail,
        };

        tracing::info!(
            benchmark = %spec.name,
            program = %self.toolchain.program,
            ?args,
            "compiling"
        );

        let result = Command::new(&self.toolchain.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| failed(format!("could not launch {}: {e}", self.toolchain.program)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let stderr = stderr.trim();
            return Err(failed(if stderr.is_empty() {
                format!("toolchain {}", result.status)
            } else {
                format!("toolchain {}\n{stderr}", result.status)
            }));
        }

        if !output.is_file() {
            return Err(failed(format!(
                "toolchain reported success but produced no executable at {}",
                output.display()
            )));
        }

        Ok(output)
    }

    /// Run the built executable from its work dir and capture stdout.
    ///
    /// On timeout the child is killed and whatever it printed is discarded.
    pub fn execute(&self, spec: &BenchmarkSpec) -> Result<String, OpsbenchError> {
        let failed = |detail: String| OpsbenchError::ExecutionFailed {
            name: spec.name.clone(),
            detail,
        };

        // A relative program path combined with current_dir resolves
        // differently per platform, so always hand over an absolute path.
        let executable = std::path::absolute(spec.executable_path())
            .map_err(|e| failed(format!("invalid executable path: {e}")))?;

        tracing::info!(benchmark = %spec.name, executable = %executable.display(), "running");

        let mut child = Command::new(&executable)
            .current_dir(&spec.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failed(format!("could not launch {}: {e}", executable.display())))?;

        // Drain both pipes concurrently so a chatty child never blocks on a
        // full pipe while we poll for its exit.
        let stdout_rx = spawn_drain(child.stdout.take());
        let stderr_rx = spawn_drain(child.stderr.take());

        let started = Instant::now();
        let deadline = started + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.timed_out(spec));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(failed(format!("could not wait for process: {e}")));
                }
            }
        };

        // A background process started by the benchmark may inherit the
        // pipes and keep them open after the child exits. The deadline covers
        // reading them too; readers that miss it are left detached.
        let output = self.collect(&stdout_rx, deadline, spec)?;
        let errors = self.collect(&stderr_rx, deadline, spec)?;
        if !errors.trim().is_empty() {
            tracing::debug!(benchmark = %spec.name, stderr = %errors.trim(), "benchmark stderr");
        }

        if !status.success() {
            return Err(failed(format!("process {status}")));
        }

        tracing::debug!(
            benchmark = %spec.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = output.len(),
            "execution completed"
        );
        Ok(output)
    }
}

impl OutputSource for BenchmarkRunner {
    fn capture(&self, spec: &BenchmarkSpec) -> Result<String, OpsbenchError> {
        self.build(spec)?;
        self.execute(spec)
    }
}

fn spawn_drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver may already be dropped after a timeout.
        let _ = tx.send(drain(pipe));
    });
    rx
}

fn drain<R: Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
