//! Planner process supervision.
//!
//! A run owns its child process: it spawns it without a shell, drains stdout
//! and stderr concurrently while it runs, and waits for exit, a deadline, or
//! cancellation, whichever comes first. On Unix the child leads its own
//! process group so termination also reaches anything it started.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use glide_core::{CapturedOutput, PlanError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::invocation::Invocation;

const READ_CHUNK: usize = 8 * 1024;
/// How long to wait for the output pipes to close once the child is gone.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// A running planner process.
pub struct PlannerRun {
    // Dropped before `child` so an abandoned group is killed while the
    // leader is still unreaped and the pgid cannot have been reused.
    group: ProcessGroup,
    child: Child,
    stdout: OutputPipe,
    stderr: OutputPipe,
    started: Instant,
}

enum Ended {
    Exited(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

impl PlannerRun {
    /// Start the planner. Fails with `SpawnFailure` when the executable
    /// cannot be started; never waits for the process.
    pub fn spawn(invocation: &Invocation) -> Result<Self, PlanError> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.workdir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|err| PlanError::SpawnFailure {
            program: invocation.program.clone(),
            message: err.to_string(),
            output: CapturedOutput::default(),
        })?;

        let pid = child.id();
        let stdout = OutputPipe::start(child.stdout.take(), "stdout", pid);
        let stderr = OutputPipe::start(child.stderr.take(), "stderr", pid);

        Ok(Self {
            group: ProcessGroup::new(pid),
            child,
            stdout,
            stderr,
            started: Instant::now(),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the run to finish.
    ///
    /// Exit code zero yields the captured output. A non-zero exit is a
    /// `ComputationFailure`; an elapsed `timeout` or a triggered `cancel`
    /// kills the process group and yields `Timeout` or `Cancelled`. Every
    /// failure carries whatever output was captured.
    pub async fn wait(
        mut self,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<CapturedOutput, PlanError> {
        let deadline = async {
            match timeout {
                Some(after) => {
                    tokio::time::sleep(after).await;
                    after
                }
                None => std::future::pending().await,
            }
        };

        let ended = tokio::select! {
            status = self.child.wait() => Ended::Exited(status),
            after = deadline => Ended::TimedOut(after),
            _ = cancel.cancelled() => Ended::Cancelled,
        };

        match ended {
            // Leftovers in the group would keep the output pipes open. The
            // leader is already reaped here, so only signal a group that
            // still has members.
            Ended::Exited(Ok(_)) => self.group.sweep(),
            _ => self.terminate().await,
        }
        self.group.disarm();

        let output = self.collect_output().await;
        tracing::debug!(
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "planner process finished"
        );

        match ended {
            Ended::Exited(Ok(status)) if status.success() => Ok(output),
            Ended::Exited(Ok(status)) => Err(PlanError::ComputationFailure {
                code: status.code(),
                output,
            }),
            Ended::Exited(Err(err)) => {
                tracing::warn!("Failed to wait on planner process: {}", err);
                Err(PlanError::ComputationFailure { code: None, output })
            }
            Ended::TimedOut(after) => Err(PlanError::Timeout { after, output }),
            Ended::Cancelled => Err(PlanError::Cancelled { output }),
        }
    }

    async fn terminate(&mut self) {
        self.group.kill();
        if let Err(err) = self.child.kill().await {
            tracing::debug!("Planner process already gone: {}", err);
        }
    }

    async fn collect_output(&mut self) -> CapturedOutput {
        let stdout = self.stdout.finish(OUTPUT_DRAIN_GRACE).await;
        let stderr = self.stderr.finish(OUTPUT_DRAIN_GRACE).await;
        CapturedOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        }
    }
}

/// One output stream read into a shared buffer, so bytes read so far survive
/// the reader being aborted.
struct OutputPipe {
    stream: &'static str,
    buffer: Arc<Mutex<Vec<u8>>>,
    reader: JoinHandle<()>,
}

impl OutputPipe {
    fn start<R>(pipe: Option<R>, stream: &'static str, pid: Option<u32>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let reader = match pipe {
            Some(pipe) => tokio::spawn(capture(pipe, stream, pid, buffer.clone())),
            None => tokio::spawn(async {}),
        };
        Self {
            stream,
            buffer,
            reader,
        }
    }

    /// Wait up to `grace` for the pipe to close, then return what was read.
    async fn finish(&mut self, grace: Duration) -> Vec<u8> {
        match tokio::time::timeout(grace, &mut self.reader).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(stream = self.stream, "Output reader failed: {}", err),
            Err(_) => {
                tracing::warn!(
                    stream = self.stream,
                    "Output pipe still open after planner exit; keeping partial output"
                );
                self.reader.abort();
            }
        }
        let mut buffer = self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *buffer)
    }
}

async fn capture<R>(
    mut reader: R,
    stream: &'static str,
    pid: Option<u32>,
    buffer: Arc<Mutex<Vec<u8>>>,
) where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                tracing::debug!(
                    pid = ?pid,
                    stream,
                    "{}",
                    String::from_utf8_lossy(&chunk[..n]).trim_end()
                );
                buffer
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .extend_from_slice(&chunk[..n]);
            }
            Err(err) => {
                tracing::warn!(pid = ?pid, stream, "Failed reading planner output: {}", err);
                break;
            }
        }
    }
}

/// Kills the planner's process group when dropped while armed, which covers
/// the request future being dropped on client disconnect.
struct ProcessGroup {
    pgid: Option<i32>,
    armed: bool,
}

impl ProcessGroup {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|pid| i32::try_from(pid).ok()),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    #[cfg(unix)]
    fn kill(&self) {
        if let Some(pgid) = self.pgid {
            // SAFETY: killpg has no memory-safety preconditions.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }

    /// Whether any process is still in the group.
    #[cfg(unix)]
    fn is_populated(&self) -> bool {
        match self.pgid {
            // SAFETY: signal 0 only checks for existence.
            Some(pgid) => unsafe { libc::killpg(pgid, 0) == 0 },
            None => false,
        }
    }

    /// Kill leftovers after the leader exited. A group with no members is
    /// left alone since its id may already belong to someone else.
    #[cfg(unix)]
    fn sweep(&self) {
        if self.is_populated() {
            tracing::debug!(pgid = ?self.pgid, "Killing processes left behind by the planner");
            self.kill();
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}

    #[cfg(not(unix))]
    fn sweep(&self) {}
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(pgid = ?self.pgid, "Planner run abandoned; killing process group");
            self.kill();
        }
    }
}
