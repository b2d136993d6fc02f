//! External tool process runner
//!
//! Spawns forensic helper programs (model interpreters, ffmpeg) and captures
//! their output. Console windows are hidden on Windows.

use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ForensicsError, ForensicsResult};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Captured output of a finished tool process
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// Exit code, -1 when killed by a signal
    pub status: i32,
    pub timed_out: bool,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == 0 && !self.timed_out
    }

    pub fn stdout_string(&self) -> String {
        self.stdout.join("\n")
    }

    pub fn stderr_string(&self) -> String {
        self.stderr.join("\n")
    }

    /// Convert a failed run into the matching error, keeping stderr.
    pub fn into_checked(self, tool: &str, timeout: Option<Duration>) -> ForensicsResult<Self> {
        if self.timed_out {
            return Err(ForensicsError::ToolTimedOut {
                tool: tool.to_string(),
                seconds: timeout.map(|t| t.as_secs()).unwrap_or_default(),
            });
        }
        if self.status != 0 {
            return Err(ForensicsError::ToolFailed {
                tool: tool.to_string(),
                status: self.status,
                stderr: self.stderr_string(),
            });
        }
        Ok(self)
    }
}

/// Runs an external executable with a fixed working directory and timeout
#[derive(Debug, Clone)]
pub struct ToolRunner {
    exe_path: PathBuf,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ToolRunner {
    pub fn new(exe_path: impl AsRef<Path>) -> Self {
        Self {
            exe_path: exe_path.as_ref().to_path_buf(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Run the tool from this directory
    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    /// Run the tool and capture stdout/stderr line by line
    pub fn run<S: AsRef<OsStr>>(&self, args: &[S]) -> ForensicsResult<ToolOutput> {
        let mut cmd = self.build_command(args);
        tracing::debug!("Spawning {:?} with {} args", self.exe_path, args.len());

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ForensicsError::tool_not_found("Executable", &self.exe_path)
            } else {
                ForensicsError::Io(e)
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ForensicsError::invalid_output(self.name(), "stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ForensicsError::invalid_output(self.name(), "stderr not captured"))?;

        let (stdout_tx, stdout_rx) = mpsc::channel();
        let (stderr_tx, stderr_rx) = mpsc::channel();
        let stdout_thread = thread::spawn(move || capture_output(stdout, stdout_tx));
        let stderr_thread = thread::spawn(move || capture_output(stderr, stderr_tx));

        let (status, timed_out) = match self.timeout {
            Some(duration) => wait_with_timeout(&mut child, duration)?,
            None => (child.wait()?, false),
        };

        // Reader threads end once the pipes close; a panic there only loses output.
        let _ = stdout_thread.join();
        let _ = stderr_thread.join();

        Ok(ToolOutput {
            stdout: stdout_rx.try_iter().collect(),
            stderr: stderr_rx.try_iter().collect(),
            status: status.code().unwrap_or(-1),
            timed_out,
        })
    }

    /// Run and fail on non-zero exit or timeout
    pub fn run_checked<S: AsRef<OsStr>>(
        &self,
        tool: &str,
        args: &[S],
    ) -> ForensicsResult<ToolOutput> {
        self.run(args)?.into_checked(tool, self.timeout)
    }

    fn name(&self) -> String {
        self.exe_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.exe_path.display().to_string())
    }

    fn build_command<S: AsRef<OsStr>>(&self, args: &[S]) -> Command {
        let mut cmd = Command::new(&self.exe_path);
        cmd.args(args);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd
    }
}

fn capture_output<R: std::io::Read>(reader: R, tx: Sender<String>) {
    let reader = BufReader::new(reader);
    for line in reader.lines().map_while(Result::ok) {
        let _ = tx.send(line);
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> ForensicsResult<(ExitStatus, bool)> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let status = child.wait()?;
            return Ok((status, true));
        }
        thread::sleep(Duration::from_millis(50));
    }
}
