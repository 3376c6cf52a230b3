//! Record outputs and the manager that fans records out to them.

use crate::config::OutputConfig;
use crate::core::Output;
use crate::telemetry;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, instrument, warn};

/// Writes each record as one line on standard output.
pub struct StdoutOutput {
    stdout: Mutex<Stdout>,
}

impl StdoutOutput {
    pub fn new() -> Self {
        Self {
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdoutOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Output for StdoutOutput {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send_record(&self, record: &str) -> Result<()> {
        let mut stdout = self.stdout.lock().await;
        stdout.write_all(record.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// Appends newline-terminated records to a file, creating it if needed.
pub struct FileOutput {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileOutput {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open output file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Output for FileOutput {
    fn name(&self) -> &str {
        "file"
    }

    async fn send_record(&self, record: &str) -> Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(format!("{}\n", record).as_bytes())
            .await
            .with_context(|| format!("failed to write to {}", self.path.display()))?;
        file.flush().await?;
        Ok(())
    }
}

/// Dispatches every record to all configured outputs.
pub struct OutputManager {
    outputs: Vec<Arc<dyn Output>>,
}

impl OutputManager {
    pub fn new(outputs: Vec<Arc<dyn Output>>) -> Self {
        Self { outputs }
    }

    /// Builds the outputs enabled in the `[output]` section.
    pub async fn from_config(config: &OutputConfig) -> Result<Self> {
        let mut outputs: Vec<Arc<dyn Output>> = Vec::new();
        if config.stdout {
            debug!("Initializing StdoutOutput");
            outputs.push(Arc::new(StdoutOutput::new()));
        }
        if let Some(path) = &config.file {
            debug!(path = %path.display(), "Initializing FileOutput");
            outputs.push(Arc::new(FileOutput::open(path).await?));
        }
        if outputs.is_empty() {
            warn!("No outputs enabled, records will be discarded.");
        }
        Ok(Self::new(outputs))
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Sends `record` to every output concurrently.
    ///
    /// Individual failures are logged and counted. An error is returned only
    /// when every output failed.
    pub async fn send_record(&self, record: &str) -> Result<()> {
        let results = join_all(self.outputs.iter().map(|output| async move {
            let result = output.send_record(record).await;
            match &result {
                Ok(()) => telemetry::record_written(output.name()),
                Err(e) => {
                    warn!(output = output.name(), error = %e, "Failed to write record.");
                    telemetry::output_failure(output.name());
                }
            }
            result
        }))
        .await;

        if !results.is_empty() && results.iter().all(Result::is_err) {
            bail!("all {} outputs failed to write the record", results.len());
        }
        Ok(())
    }
}

/// Drains `records_rx` into the manager until the channel closes.
#[instrument(skip_all)]
pub async fn run_output_stage(manager: Arc<OutputManager>, mut records_rx: mpsc::Receiver<String>) {
    let mut delivered = 0u64;
    let mut failed = 0u64;
    while let Some(record) = records_rx.recv().await {
        match manager.send_record(&record).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                error!(error = %e, "Record could not be delivered.");
                failed += 1;
            }
        }
    }
    info!(delivered, failed, "Output stage finished.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingOutput {
        records: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Output for RecordingOutput {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send_record(&self, record: &str) -> Result<()> {
            self.records.lock().unwrap().push(record.to_string());
            Ok(())
        }
    }

    struct FailingOutput;

    #[async_trait]
    impl Output for FailingOutput {
        fn name(&self) -> &str {
            "failing"
        }

        async fn send_record(&self, _record: &str) -> Result<()> {
            bail!("sink unavailable")
        }
    }

    #[tokio::test]
    async fn test_file_output_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.lp");
        std::fs::write(&path, "existing\n").unwrap();

        let output = FileOutput::open(&path).await.unwrap();
        output.send_record("cpu-host,run=r user=1 1").await.unwrap();
        output.send_record("cpu-host,run=r user=2 2").await.unwrap();

        let contents = std::fs::read_to_string(output.path()).unwrap();
        assert_eq!(
            contents,
            "existing\ncpu-host,run=r user=1 1\ncpu-host,run=r user=2 2\n"
        );
    }

    #[tokio::test]
    async fn test_partial_failure_is_not_an_error() {
        let recording = Arc::new(RecordingOutput::default());
        let manager = OutputManager::new(vec![recording.clone() as Arc<dyn Output>, Arc::new(FailingOutput)]);
        manager.send_record("a").await.unwrap();
        assert_eq!(*recording.records.lock().unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_total_failure_is_an_error() {
        let manager = OutputManager::new(vec![
            Arc::new(FailingOutput) as Arc<dyn Output>,
            Arc::new(FailingOutput),
        ]);
        assert!(manager.send_record("a").await.is_err());
        assert!(OutputManager::new(Vec::new()).send_record("a").await.is_ok());
    }

    #[tokio::test]
    async fn test_output_stage_preserves_order() {
        let recording = Arc::new(RecordingOutput::default());
        let manager = Arc::new(OutputManager::new(vec![recording.clone() as Arc<dyn Output>]));
        let (tx, rx) = mpsc::channel(2);
        let stage = tokio::spawn(run_output_stage(manager, rx));
        for i in 0..10 {
            tx.send(format!("r{}", i)).await.unwrap();
        }
        drop(tx);
        stage.await.unwrap();

        let expected: Vec<String> = (0..10).map(|i| format!("r{}", i)).collect();
        assert_eq!(*recording.records.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = OutputConfig {
            stdout: false,
            file: Some(dir.path().join("out.lp")),
        };
        let manager = OutputManager::from_config(&config).await.unwrap();
        assert_eq!(manager.len(), 1);

        let none = OutputManager::from_config(&OutputConfig { stdout: false, file: None })
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
