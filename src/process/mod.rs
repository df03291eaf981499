//! Subprocess invocation with line-by-line output streaming

use anyhow::{Context, Result};
use std::fmt;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

#[cfg(test)]
mod tests;

/// A line of output from a running process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Captured output of a finished process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// An executable with its arguments and environment overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((name.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Run the process, forwarding its output to our stdout and stderr as it arrives.
    pub async fn execute(&self) -> Result<i32> {
        self.execute_with(|line| match line {
            OutputLine::Stdout(line) => println!("{}", line),
            OutputLine::Stderr(line) => eprintln!("{}", line),
        })
        .await
    }

    /// Run the process, capturing both output streams.
    pub async fn output(&self) -> Result<ProcessOutput> {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit_code = self
            .execute_with(|line| match line {
                OutputLine::Stdout(line) => stdout.push(line),
                OutputLine::Stderr(line) => stderr.push(line),
            })
            .await?;

        Ok(ProcessOutput {
            exit_code,
            stdout: stdout.join("\n"),
            stderr: stderr.join("\n"),
        })
    }

    /// Run the process, handing every output line to `on_line` as it is read.
    ///
    /// Stdin is closed before the process starts. Both output pipes are
    /// drained on their own tasks so a chatty child never blocks on a full
    /// pipe. Returns the exit code, or -1 when the process was killed by a
    /// signal.
    pub async fn execute_with<F>(&self, mut on_line: F) -> Result<i32>
    where
        F: FnMut(OutputLine),
    {
        debug!("Running command: {}", self);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (name, value) in &self.env {
            cmd.env(name, value);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to execute {}", self.program))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(
                stdout,
                tx.clone(),
                OutputLine::Stdout,
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(
                stderr,
                tx.clone(),
                OutputLine::Stderr,
            )));
        }
        drop(tx);

        // The channel closes once both readers hit end of file.
        while let Some(line) = rx.recv().await {
            on_line(line);
        }
        for reader in readers {
            reader.await.context("Output reader task failed")?;
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for {}", self.program))?;
        let exit_code = status.code().unwrap_or(-1);
        debug!("{} exited with code {}", self.program, exit_code);
        Ok(exit_code)
    }
}

async fn forward_lines<R>(
    reader: R,
    tx: mpsc::UnboundedSender<OutputLine>,
    wrap: fn(String) -> OutputLine,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    // Lines are read as bytes: engines print arbitrary bytes, and the pipe
    // must be drained to the end or the child dies of SIGPIPE.
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.ends_with(b"\n") {
                    buf.pop();
                    if buf.ends_with(b"\r") {
                        buf.pop();
                    }
                }
                // A closed receiver only means nobody is listening any more.
                let _ = tx.send(wrap(String::from_utf8_lossy(&buf).into_owned()));
            }
            Err(e) => {
                debug!("Failed to read process output: {}", e);
                break;
            }
        }
    }
}

impl fmt::Display for ProcessCommand {
    /// Shell-like rendering, for logs and for users to copy.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.env {
            write!(f, "{}={} ", name, quote(value))?;
        }
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
