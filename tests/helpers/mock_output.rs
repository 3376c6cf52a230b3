#![allow(dead_code)]
use async_trait::async_trait;
use nmonflux::core::Output;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::mpsc;

/// A mock Output that sends every received record over a channel.
#[derive(Clone, Debug)]
pub struct ChannelOutput {
    pub record_tx: mpsc::Sender<String>,
}

impl ChannelOutput {
    pub fn new(record_tx: mpsc::Sender<String>) -> Self {
        Self { record_tx }
    }
}

#[async_trait]
impl Output for ChannelOutput {
    fn name(&self) -> &str {
        "channel_mock"
    }

    async fn send_record(&self, record: &str) -> anyhow::Result<()> {
        self.record_tx.send(record.to_string()).await?;
        Ok(())
    }
}

/// A mock Output that fails every write and counts the attempts.
#[derive(Clone, Debug, Default)]
pub struct FailingOutput {
    pub attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl Output for FailingOutput {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn send_record(&self, _record: &str) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("simulated output failure")
    }
}
