//! Process runner - executes the external `bw` and `pass` binaries.
//!
//! Every call goes through the [`ProcessRunner`] trait so the store clients
//! can be driven by a scripted runner in tests.

use std::io::{ErrorKind, Write};
use std::process::{ChildStdin, Command, ExitStatus, Stdio};
use thiserror::Error;

/// Errors raised while running an external command
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("cannot execute `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// One external command: program, arguments, optional stdin text and
/// extra environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub input: Option<String>,
    pub envs: Vec<(String, String)>,
    /// Indices into `args` that are never echoed to the log
    pub secret_args: Vec<usize>,
    /// Inherit the terminal's stdin/stderr (for password prompts)
    pub interactive: bool,
    /// Log the command line before running it
    pub log: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            log: true,
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an argument that must not appear in logs or error messages
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret_args.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.log = false;
        self
    }

    pub fn with_logging(mut self, log: bool) -> Self {
        self.log = self.log && log;
        self
    }

    /// Command line with secret arguments masked
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.as_str());
        for (idx, arg) in self.args.iter().enumerate() {
            if self.secret_args.contains(&idx) {
                parts.push("***");
            } else {
                parts.push(arg.as_str());
            }
        }
        parts.join(" ")
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Human readable exit status ("exit status: 1", "signal: 9")
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            status: format!("exit status: {}", code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    fn from_status(status: ExitStatus, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            success: status.success(),
            status: status.to_string(),
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        }
    }

    /// Stdout of a successful run, otherwise [`ProcessError::Failed`]
    pub fn into_stdout(self, invocation: &Invocation) -> Result<String, ProcessError> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(ProcessError::Failed {
                command: invocation.display(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Capability to run external commands
pub trait ProcessRunner {
    /// Run the command to completion and capture its output.
    /// A non-zero exit is reported through [`CommandOutput::success`].
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ProcessError>;

    /// Run the command and fail unless it exits successfully
    fn run_checked(&self, invocation: &Invocation) -> Result<String, ProcessError> {
        self.run(invocation)?.into_stdout(invocation)
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ProcessError> {
        (**self).run(invocation)
    }
}

/// Runs commands on the host with `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ProcessError> {
        if invocation.log {
            tracing::info!("> {}", invocation.display());
        } else {
            tracing::debug!("> {}", invocation.display());
        }

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(invocation.envs.iter().map(|(k, v)| (k, v)))
            .stdout(Stdio::piped());

        if invocation.input.is_some() {
            command.stdin(Stdio::piped());
        } else if invocation.interactive {
            command.stdin(Stdio::inherit());
        } else {
            command.stdin(Stdio::null());
        }

        if invocation.interactive {
            command.stderr(Stdio::inherit());
        } else {
            command.stderr(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let io_error = |source| ProcessError::Io {
            command: invocation.display(),
            source,
        };

        // Feed stdin from its own thread so a child that writes while it
        // reads cannot fill the stdout pipe and stall both sides
        let writer = match (invocation.input.clone(), child.stdin.take()) {
            (Some(input), Some(stdin)) => {
                Some(std::thread::spawn(move || feed_stdin(stdin, input)))
            }
            _ => None,
        };

        let output = child.wait_with_output().map_err(io_error)?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(result) => result.map_err(io_error)?,
                Err(_) => {
                    return Err(io_error(std::io::Error::other("stdin writer panicked")));
                }
            }
        }

        Ok(CommandOutput::from_status(
            output.status,
            output.stdout,
            output.stderr,
        ))
    }
}

/// Write `input` and close the pipe. A child that exits without reading
/// everything is not an error here; its exit status tells the story.
fn feed_stdin(mut stdin: ChildStdin, input: String) -> std::io::Result<()> {
    match stdin.write_all(input.as_bytes()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err),
    }
}
