//! Capture of raw nmon output.
//!
//! A [`LineSource`] yields lines from a running nmon process or from a
//! previously recorded file. [`Capture`] reads it until end of input or
//! shutdown, drops lines the parser has no use for, and forwards the rest, in
//! order, into the pipeline's line channel.

use crate::config::SourceConfig;
use crate::core::LineSource;
use crate::decoders::split_first;
use crate::telemetry;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Reads the standard output of a spawned monitor command line by line.
///
/// The child is killed if the source is dropped before it exits.
pub struct CommandSource {
    program: String,
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl CommandSource {
    /// Spawns `command` (program followed by its arguments).
    pub fn spawn(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("capture command is empty"))?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn capture command {:?}", command))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("capture command has no stdout"))?;
        info!(program = %program, ?args, pid = ?child.id(), "Capture command started.");
        Ok(Self {
            program: program.clone(),
            child,
            lines: BufReader::new(stdout).lines(),
        })
    }
}

#[async_trait]
impl LineSource for CommandSource {
    fn describe(&self) -> String {
        format!("command `{}`", self.program)
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let line = self.lines.next_line().await?;
        if line.is_none() {
            let status = self.child.wait().await?;
            if status.success() {
                info!(program = %self.program, %status, "Capture command exited.");
            } else {
                warn!(program = %self.program, %status, "Capture command exited with failure.");
            }
        }
        Ok(line)
    }
}

/// Reads lines from any buffered reader, such as a recorded nmon file or stdin.
pub struct ReaderSource<R> {
    name: String,
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> ReaderSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            lines: reader.lines(),
        }
    }
}

impl ReaderSource<BufReader<tokio::fs::File>> {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open nmon input {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

impl ReaderSource<BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LineSource for ReaderSource<R> {
    fn describe(&self) -> String {
        format!("input {}", self.name)
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// Opens the source named by the configuration: `input` when set (`-` for
/// stdin), otherwise the capture command.
pub async fn open_source(config: &SourceConfig) -> Result<Box<dyn LineSource>> {
    match &config.input {
        Some(path) if path.as_os_str() == "-" => Ok(Box::new(ReaderSource::stdin())),
        Some(path) => Ok(Box::new(ReaderSource::open(path).await?)),
        None => Ok(Box::new(CommandSource::spawn(&config.command)?)),
    }
}

/// Drops lines whose first field (text before the first comma) starts with
/// an ignored prefix, so `NET` also drops `NETPACKET` and `NETERROR`.
#[derive(Debug, Clone, Default)]
pub struct PrefixFilter {
    ignored: Vec<String>,
}

impl PrefixFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|prefix: &String| !prefix.is_empty())
                .collect(),
        }
    }

    pub fn accepts(&self, line: &str) -> bool {
        let first = split_first(line).0;
        !self.ignored.iter().any(|prefix| first.starts_with(prefix.as_str()))
    }
}

/// Pumps a [`LineSource`] into the line channel.
pub struct Capture {
    source: Box<dyn LineSource>,
    filter: PrefixFilter,
    lines_tx: mpsc::Sender<String>,
}

impl Capture {
    pub fn new(
        source: Box<dyn LineSource>,
        filter: PrefixFilter,
        lines_tx: mpsc::Sender<String>,
    ) -> Self {
        Self {
            source,
            filter,
            lines_tx,
        }
    }

    /// Forwards lines until the source is exhausted, the receiver is dropped,
    /// or shutdown is signalled. Dropping `self` closes the line channel.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<()>) -> Result<()> {
        let source = self.source.describe();
        info!(source = %source, "Capture started.");
        let mut forwarded = 0u64;
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Capture received shutdown signal.");
                    break;
                }
                next = self.source.next_line() => next,
            };
            let mut line = match next.with_context(|| format!("failed to read from {}", source))? {
                Some(line) => line,
                None => {
                    info!(source = %source, "Capture source exhausted.");
                    break;
                }
            };
            telemetry::line_captured();
            // Recordings copied off AIX hosts often carry CRLF endings.
            if line.ends_with('\r') {
                line.pop();
            }
            if !self.filter.accepts(&line) {
                telemetry::line_filtered();
                continue;
            }
            debug!(line = %line, "Captured line.");
            if self.lines_tx.send(line).await.is_err() {
                debug!("Line receiver dropped, stopping capture.");
                break;
            }
            forwarded += 1;
        }
        info!(forwarded, "Capture finished.");
        Ok(())
    }
}
