#![allow(dead_code)]
//! In-memory line sources for driving the pipeline.

use async_trait::async_trait;
use nmonflux::core::LineSource;
use std::collections::VecDeque;

/// Yields a fixed list of lines, then either ends or stays open forever.
#[derive(Debug, Clone)]
pub struct VecSource {
    lines: VecDeque<String>,
    hold_open: bool,
}

impl VecSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            hold_open: false,
        }
    }

    /// Keeps the source open after its last line, like a live nmon process
    /// between snapshots.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[async_trait]
impl LineSource for VecSource {
    fn describe(&self) -> String {
        "in-memory".to_string()
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        match self.lines.pop_front() {
            Some(line) => Ok(Some(line)),
            None if self.hold_open => std::future::pending().await,
            None => Ok(None),
        }
    }
}
