//! External command-line tools.
//!
//! All subprocess launches go through [`CommandExecutor`] so that tests can
//! replace the real process with a scripted one. Calls block until the process
//! exits; output is captured whole.

use crate::error::{BuildError, Result};
use log::{debug, info};
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

/// Launches a program and captures its output.
pub trait CommandExecutor: Send + Sync + fmt::Debug {
    /// Runs `program` with `args` in `cwd` and waits for it to exit.
    ///
    /// A program that cannot be found must surface as
    /// [`io::ErrorKind::NotFound`].
    fn execute(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<Output>;
}

/// Runs real processes through `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealCommandExecutor;

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<Output> {
        Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
    }
}

/// A named program together with the executor used to launch it.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: String,
    executor: Arc<dyn CommandExecutor>,
}

impl ExternalTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            executor: Arc::new(RealCommandExecutor),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether the program can be found on `PATH`.
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    /// Runs the tool to completion.
    ///
    /// Fails with [`BuildError::ToolNotFound`] if it cannot be launched and
    /// with [`BuildError::ToolFailure`], carrying stdout followed by stderr,
    /// if it exits nonzero. A zero exit says nothing about which files the
    /// tool produced.
    pub fn run(&self, args: &[String], cwd: &Path) -> Result<Output> {
        info!("running {} {} in {}", self.program, args.join(" "), cwd.display());
        let output = self
            .executor
            .execute(&self.program, args, cwd)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => BuildError::ToolNotFound {
                    tool: self.program.clone(),
                },
                _ => BuildError::Io(e),
            })?;

        if !output.status.success() {
            let mut message = String::from_utf8_lossy(&output.stdout).into_owned();
            message.push_str(&String::from_utf8_lossy(&output.stderr));
            debug!("{} exited with {}", self.program, output.status);
            return Err(BuildError::ToolFailure {
                tool: self.program.clone(),
                output: message,
            });
        }
        Ok(output)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::CommandExecutor;
    use std::io;
    use std::path::Path;
    use std::process::{ExitStatus, Output};
    use std::sync::Mutex;

    pub(crate) fn exit_status(code: i32) -> ExitStatus {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            ExitStatus::from_raw(code << 8)
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::ExitStatusExt;
            ExitStatus::from_raw(code as u32)
        }
    }

    /// Records invocations and writes scripted files into the working
    /// directory, standing in for a real tool.
    #[derive(Debug, Default)]
    pub(crate) struct MockCommandExecutor {
        pub outputs: Vec<(String, Vec<u8>)>,
        pub stdout: String,
        pub stderr: String,
        pub status_code: i32,
        pub calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl MockCommandExecutor {
        pub(crate) fn producing(files: &[(&str, &[u8])]) -> Self {
            Self {
                outputs: files
                    .iter()
                    .map(|(path, data)| (path.to_string(), data.to_vec()))
                    .collect(),
                ..Self::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    impl CommandExecutor for MockCommandExecutor {
        fn execute(&self, program: &str, args: &[String], cwd: &Path) -> io::Result<Output> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((program.to_string(), args.to_vec()));
            }
            for (path, data) in &self.outputs {
                std::fs::write(cwd.join(path), data)?;
            }
            Ok(Output {
                status: exit_status(self.status_code),
                stdout: self.stdout.as_bytes().to_vec(),
                stderr: self.stderr.as_bytes().to_vec(),
            })
        }
    }
}
