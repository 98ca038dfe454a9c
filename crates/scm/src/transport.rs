//! Running git as a subprocess.
//!
//! The transport never interprets results: it hands back exit code, stdout
//! and stderr and lets the session decide what counts as success. Commands
//! are argument vectors, never shell strings, so branch names, paths and
//! credentials cannot inject anything.

use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Exit code plus captured output of one git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `-1` when the process was terminated by a signal.
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Executes git commands for a [`crate::Session`].
///
/// `Err` means git could not be run at all (missing binary, timeout).
/// A non-zero exit is an `Ok` with the code set.
pub trait GitTransport: Send + Sync {
    fn run(&self, cwd: Option<&Path>, args: &[&OsStr]) -> io::Result<CommandOutput>;
}

impl<T: GitTransport + ?Sized> GitTransport for Box<T> {
    fn run(&self, cwd: Option<&Path>, args: &[&OsStr]) -> io::Result<CommandOutput> {
        (**self).run(cwd, args)
    }
}

/// The system `git` binary.
#[derive(Debug, Clone)]
pub struct SystemGit {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new("git")
    }
}

impl SystemGit {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    /// Kill the child and fail with [`io::ErrorKind::TimedOut`] after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, cwd: Option<&Path>, args: &[&OsStr]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Confirmation text is matched literally, so keep it untranslated.
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .env_remove("GIT_COMMON_DIR")
            .env_remove("GIT_INDEX_FILE")
            .env_remove("GIT_OBJECT_DIRECTORY")
            .env_remove("GIT_ALTERNATE_OBJECT_DIRECTORIES");
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

impl GitTransport for SystemGit {
    fn run(&self, cwd: Option<&Path>, args: &[&OsStr]) -> io::Result<CommandOutput> {
        // Arguments may carry credentials; only the subcommand is logged.
        let subcommand = args
            .iter()
            .find(|a| !a.to_string_lossy().starts_with('-'))
            .map(|a| a.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(%subcommand, cwd = ?cwd, "running git");

        let mut cmd = self.command(cwd, args);
        let output = match self.timeout {
            None => CommandOutput::from(cmd.output()?),
            Some(timeout) => run_with_timeout(&mut cmd, timeout)?,
        };
        debug!(%subcommand, code = output.code, "git finished");
        Ok(output)
    }
}

fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<CommandOutput> {
    let mut child = cmd.spawn()?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("git did not finish within {}s", timeout.as_secs_f32()),
            ));
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(CommandOutput {
        code: status.code().unwrap_or(-1),
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
