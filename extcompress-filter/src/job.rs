//! Process lifecycle management for external filters.
//!
//! A [`StreamJob`] wraps one running filter process so that its stdout can be
//! consumed as an ordinary [`Read`] stream. Three things can happen to a job
//! concurrently: the caller reads output, the caller closes the stream
//! (possibly before the filter finished), and somebody asks for the exit
//! status. The job guarantees that
//!
//! - closing early never deadlocks and never leaks the process,
//! - the exit status is always available through [`StreamJob::result`],
//! - the OS-level wait happens exactly once, no matter how many callers ask.
//!
//! # Early close
//!
//! Closing a job whose process is still running sends it
//! [`TERMINATION_SIGNAL`] and records the job as *forced*. A forced job
//! always reports result `0`: the caller chose to stop, so the signal-induced
//! exit status says nothing about the filter's health. There is no
//! escalation to a stronger signal. A filter whose output was already read
//! to end-of-stream gets a short grace period to exit first, so a drained
//! pipeline stage reports its real status.
//!
//! # Example
//!
//! ```no_run
//! use extcompress_filter::StreamJob;
//! use std::io::Read;
//! use std::process::Command;
//!
//! let mut command = Command::new("bzip2");
//! command.args(["-d", "-c", "data.bz2"]);
//! let mut job = StreamJob::spawn(command, None).unwrap();
//!
//! let mut text = String::new();
//! job.read_to_string(&mut text).unwrap();
//! job.close().unwrap();
//! assert_eq!(job.result().unwrap(), 0);
//! ```

use extcompress_core::error::{ExtCompressError, Result};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, ChildStderr, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Signal sent to a filter whose job is closed before it finished.
#[cfg(unix)]
pub const TERMINATION_SIGNAL: i32 = libc::SIGTERM;

/// Boxed input reader fed to a filter's stdin.
pub type InputStream = Box<dyn Read + Send + 'static>;

/// How long `close()` lets a filter whose output hit end-of-stream exit on
/// its own before signalling it.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Interval between exit polls during [`DRAIN_GRACE`].
const DRAIN_POLL: Duration = Duration::from_millis(5);

/// Reap progress of a child process.
enum ReapState {
    /// Not reaped yet. The pid stays reserved while the child is here.
    Running(Child),
    /// Final outcome: exit code, or the reason the wait failed.
    Done(std::result::Result<i32, String>),
}

struct Tracker {
    state: ReapState,
    /// One thread is blocked until the child exits, without holding the lock.
    waiting: bool,
}

/// Exit bookkeeping shared between a job and its [`ExitHandle`]s.
///
/// The child is only ever reaped with the lock held, so a pid seen in
/// [`ReapState::Running`] under the lock is still ours to signal.
struct ExitState {
    pid: u32,
    program: String,
    forced: AtomicBool,
    tracker: Mutex<Tracker>,
    finished: Condvar,
}

impl ExitState {
    /// Block until the exit code is known, reaping the child if nobody has.
    fn wait(&self) -> Result<i32> {
        let mut tracker = self.tracker.lock();
        loop {
            if let ReapState::Done(outcome) = &tracker.state {
                return outcome
                    .clone()
                    .map_err(|msg| ExtCompressError::reap_failed(self.pid, msg));
            }
            if tracker.waiting {
                self.finished.wait(&mut tracker);
                continue;
            }

            tracker.waiting = true;
            MutexGuard::unlocked(&mut tracker, || self.block_until_exited());
            tracker.waiting = false;

            // A close may have collected the status meanwhile.
            let outcome = match &mut tracker.state {
                ReapState::Running(child) => Some(self.reap(child)),
                ReapState::Done(_) => None,
            };
            if let Some(outcome) = outcome {
                tracker.state = ReapState::Done(outcome);
            }
            self.finished.notify_all();
        }
    }

    /// Wait for an exited child, leaving it a zombie so its pid stays reserved.
    #[cfg(unix)]
    fn block_until_exited(&self) {
        let Ok(pid) = libc::pid_t::try_from(self.pid) else {
            return;
        };
        loop {
            // SAFETY: siginfo_t is plain data and valid when zeroed.
            let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
            // SAFETY: `info` is a valid, writable siginfo_t for the whole call.
            let rc = unsafe {
                libc::waitid(
                    libc::P_PID,
                    pid as libc::id_t,
                    &mut info,
                    libc::WEXITED | libc::WNOWAIT,
                )
            };
            if rc == 0 {
                return;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                // ECHILD: a close already reaped it under the lock.
                debug!(pid = self.pid, program = %self.program, error = %err, "waitid returned early");
                return;
            }
        }
    }

    /// Without WNOWAIT the reap itself blocks, under the lock.
    #[cfg(not(unix))]
    fn block_until_exited(&self) {}

    fn reap(&self, child: &mut Child) -> std::result::Result<i32, String> {
        match child.wait() {
            Ok(status) => Ok(self.exit_code(status)),
            Err(e) => {
                error!(pid = self.pid, program = %self.program, error = %e, "Failed to reap filter process");
                Err(e.to_string())
            }
        }
    }

    /// Map an exit status to the recorded result code.
    fn exit_code(&self, status: ExitStatus) -> i32 {
        let code = raw_exit_code(status);
        if self.forced.load(Ordering::SeqCst) {
            debug!(pid = self.pid, program = %self.program, code, "Filter stopped by forced close");
            return 0;
        }
        if code == 0 {
            debug!(pid = self.pid, program = %self.program, "External filter finished successfully");
        } else {
            warn!(pid = self.pid, program = %self.program, code, "External filter exited non-zero");
        }
        code
    }

    /// Record the status of an exited child, or signal it if still running.
    ///
    /// A child whose output was drained gets [`DRAIN_GRACE`] to exit on its
    /// own first.
    fn terminate(&self, drained: bool) {
        let mut tracker = self.tracker.lock();
        let ReapState::Running(child) = &mut tracker.state else {
            return;
        };

        let grace = if drained { DRAIN_GRACE } else { Duration::ZERO };
        match self.poll_exit(child, grace) {
            Some(status) => {
                tracker.state = ReapState::Done(Ok(self.exit_code(status)));
                self.finished.notify_all();
            }
            None => {
                self.forced.store(true, Ordering::SeqCst);
                // Still unreaped under the lock, so the pid cannot have been reused.
                self.send_termination();
            }
        }
    }

    /// Poll for an exit status for up to `grace`.
    fn poll_exit(&self, child: &mut Child, grace: Duration) -> Option<ExitStatus> {
        let deadline = Instant::now() + grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) => {}
                Err(e) => {
                    warn!(pid = self.pid, program = %self.program, error = %e, "Failed to poll filter process");
                    return None;
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(DRAIN_POLL);
        }
    }

    #[cfg(unix)]
    fn send_termination(&self) {
        let Ok(pid) = libc::pid_t::try_from(self.pid) else {
            warn!(pid = self.pid, program = %self.program, "Process id out of range, not signalling");
            return;
        };
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid, TERMINATION_SIGNAL) };
        if rc == 0 {
            info!(pid = self.pid, program = %self.program, "Sent SIGTERM to filter on early close");
        } else {
            let err = io::Error::last_os_error();
            warn!(pid = self.pid, program = %self.program, error = %err, "Failed to signal filter process");
        }
    }

    #[cfg(not(unix))]
    fn send_termination(&self) {
        warn!(pid = self.pid, program = %self.program, "Early termination is only supported on Unix");
    }

    fn is_finished(&self) -> bool {
        matches!(self.tracker.lock().state, ReapState::Done(_))
    }
}

/// Numeric exit code; 128 + signal number when the process was killed.
fn raw_exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// A running external filter bound to its stdout stream.
///
/// Read the output through [`Read`], then call [`close`](Self::close) and
/// [`result`](Self::result) in either order. Dropping a job that was never
/// closed closes it.
///
/// `result()` waits for the process to exit. Calling it while the output
/// is still unread can block forever if the filter is stalled on a full
/// pipe; drain or close the job first.
pub struct StreamJob {
    stdout: Option<std::process::ChildStdout>,
    drained: bool,
    exit: Arc<ExitState>,
}

impl StreamJob {
    /// Start `command` and return a job reading its stdout.
    ///
    /// When `input` is given it is copied into the child's stdin on a
    /// background thread, and stdin is closed once the reader is exhausted.
    /// Stderr is forwarded line by line to the log. The child runs in its
    /// own process group.
    pub fn spawn(mut command: Command, input: Option<InputStream>) -> Result<Self> {
        let program = command.get_program().to_string_lossy().into_owned();

        command
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|e| {
            error!(program = %program, error = %e, "Failed to start external filter");
            ExtCompressError::spawn(&program, e)
        })?;
        let pid = child.id();
        debug!(pid, program = %program, "External filter started");

        let stdout = child.stdout.take();
        let stdin = child.stdin.take();
        let stderr = child.stderr.take();

        let job = Self {
            stdout,
            drained: false,
            exit: Arc::new(ExitState {
                pid,
                program: program.clone(),
                forced: AtomicBool::new(false),
                tracker: Mutex::new(Tracker {
                    state: ReapState::Running(child),
                    waiting: false,
                }),
                finished: Condvar::new(),
            }),
        };

        if let Some(stderr) = stderr {
            let name = program.clone();
            spawn_worker(&format!("{}-stderr", program), move || {
                log_stderr(stderr, pid, &name);
            })?;
        }
        if let (Some(input), Some(stdin)) = (input, stdin) {
            let name = program.clone();
            spawn_worker(&format!("{}-stdin", program), move || {
                feed_stdin(input, stdin, pid, &name);
            })?;
        }

        Ok(job)
    }

    /// Process id of the filter.
    pub fn pid(&self) -> u32 {
        self.exit.pid
    }

    /// Program name the filter was started with.
    pub fn program(&self) -> &str {
        &self.exit.program
    }

    /// Check if the job was stopped by an early close.
    pub fn was_forced(&self) -> bool {
        self.exit.forced.load(Ordering::SeqCst)
    }

    /// Check if the exit status has been recorded.
    pub fn is_finished(&self) -> bool {
        self.exit.is_finished()
    }

    /// Get a handle that can observe this job's result after the job itself
    /// has been moved elsewhere (e.g. into another job's stdin).
    pub fn exit_handle(&self) -> ExitHandle {
        ExitHandle(Arc::clone(&self.exit))
    }

    /// Block until the filter exited and return its result code.
    ///
    /// Every caller gets the same value. A job stopped by an early close
    /// reports `0`.
    pub fn result(&self) -> Result<i32> {
        self.exit.wait()
    }

    /// Release the output stream and reap the filter.
    ///
    /// If the filter is still running it is sent [`TERMINATION_SIGNAL`]
    /// first. When its output was read to the end, it is given a short grace
    /// period to exit on its own before that. A failure to deliver the signal
    /// is logged and the close continues. Closing again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.exit.terminate(self.drained);
        // Dropping the read end may make the child die of SIGPIPE; that is fine.
        self.stdout.take();
        self.exit.wait().map(|_| ())
    }
}

impl Read for StreamJob {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Err(io::Error::other("read on a closed stream job"));
        };
        let n = stdout.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.drained = true;
        }
        Ok(n)
    }
}

impl Drop for StreamJob {
    fn drop(&mut self) {
        if self.stdout.is_some() {
            // Reap failures are already logged by the finalizer.
            let _ = self.close();
        }
    }
}

impl std::fmt::Debug for StreamJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamJob")
            .field("pid", &self.exit.pid)
            .field("program", &self.exit.program)
            .field("open", &self.stdout.is_some())
            .field("drained", &self.drained)
            .finish()
    }
}

/// Cloneable view on a [`StreamJob`]'s exit status.
#[derive(Clone)]
pub struct ExitHandle(Arc<ExitState>);

impl ExitHandle {
    /// Process id of the filter.
    pub fn pid(&self) -> u32 {
        self.0.pid
    }

    /// Block until the filter exited and return its result code.
    pub fn result(&self) -> Result<i32> {
        self.0.wait()
    }

    /// Check if the exit status has been recorded.
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl std::fmt::Debug for ExitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExitHandle").field("pid", &self.0.pid).finish()
    }
}

/// Run `command` to completion with no streams attached except stderr,
/// which is logged. A non-zero exit is an error.
pub fn run_to_completion(mut command: Command) -> Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let output = command.output().map_err(|e| {
        error!(program = %program, error = %e, "Failed to start external filter");
        ExtCompressError::spawn(&program, e)
    })?;

    for line in String::from_utf8_lossy(&output.stderr).lines() {
        if !line.is_empty() {
            warn!(program = %program, "{}", line);
        }
    }

    let code = raw_exit_code(output.status);
    if code != 0 {
        warn!(program = %program, code, "External filter command failed");
        return Err(ExtCompressError::filter_failed(program, code));
    }
    debug!(program = %program, "External filter finished successfully");
    Ok(())
}

fn spawn_worker<F>(name: &str, work: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(work)
        .map(|_| ())
        .map_err(|e| {
            error!(thread = name, error = %e, "Failed to start filter I/O thread");
            ExtCompressError::Io(e)
        })
}

fn feed_stdin(mut input: InputStream, mut stdin: ChildStdin, pid: u32, program: &str) {
    match io::copy(&mut input, &mut stdin) {
        Ok(bytes) => debug!(pid, program, bytes, "Finished feeding filter input"),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!(pid, program, "Filter closed its input early");
        }
        Err(e) => warn!(pid, program, error = %e, "Failed to feed filter input"),
    }
}

fn log_stderr(stderr: ChildStderr, pid: u32, program: &str) {
    for line in BufReader::new(stderr).split(b'\n') {
        match line {
            Ok(line) if line.is_empty() => {}
            Ok(line) => warn!(pid, program, "{}", String::from_utf8_lossy(&line)),
            Err(e) => {
                debug!(pid, program, error = %e, "Stopped reading filter stderr");
                break;
            }
        }
    }
}
