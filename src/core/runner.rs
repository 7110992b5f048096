use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Description of a single external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ToolSpec {
    pub fn new(program: &str, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout,
        }
    }
}

/// Captured result of a tool invocation that ran to completion.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code; `None` when the child was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout and stderr joined, for marker matching across both streams.
    pub fn combined(&self) -> String {
        if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else if self.stdout.trim().is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Ways an invocation can fail before producing a usable result.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("'{tool}' not found - is it installed and on PATH?")]
    NotFound { tool: String },

    #[error("'{tool}' did not finish within {}s", .limit.as_secs())]
    Timeout { tool: String, limit: Duration },

    #[error("failed to run '{tool}': {source}")]
    Execution {
        tool: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    pub fn tool(&self) -> &str {
        match self {
            ToolError::NotFound { tool }
            | ToolError::Timeout { tool, .. }
            | ToolError::Execution { tool, .. } => tool,
        }
    }
}

/// Seam between the tag operations and the external libnfc tools.
pub trait ToolRunner {
    fn run(&self, spec: &ToolSpec) -> Result<ToolOutput, ToolError>;
}

/// Runner that spawns the real external tools.
pub struct SystemRunner;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

impl ToolRunner for SystemRunner {
    fn run(&self, spec: &ToolSpec) -> Result<ToolOutput, ToolError> {
        log::info!(
            "Running {} {:?} (timeout {}s)",
            spec.program,
            spec.args,
            spec.timeout.as_secs()
        );

        let start = Instant::now();
        let mut child = match Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ToolError::NotFound {
                    tool: spec.program.clone(),
                })
            }
            Err(e) => {
                return Err(ToolError::Execution {
                    tool: spec.program.clone(),
                    source: e,
                })
            }
        };

        // Drain both pipes off-thread; a child blocked on a full pipe would
        // never exit and the wait loop below would run out the clock.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = start + spec.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ToolError::Execution {
                        tool: spec.program.clone(),
                        source: e,
                    });
                }
            }
            if Instant::now() >= deadline {
                log::warn!(
                    "{} exceeded its {}s timeout, killing it",
                    spec.program,
                    spec.timeout.as_secs()
                );
                let _ = child.kill();
                // Reap, so the child never outlives the call. Partial pipe
                // contents are dropped with the drain threads.
                let _ = child.wait();
                return Err(ToolError::Timeout {
                    tool: spec.program.clone(),
                    limit: spec.timeout,
                });
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        };

        let output = ToolOutput {
            code: status.code(),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
            duration: start.elapsed(),
        };
        log::debug!(
            "{} exited with {:?} after {}ms",
            spec.program,
            output.code,
            output.duration.as_millis()
        );
        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut text);
        }
        text
    })
}
