//! Scripted adapter for exercising drivers without hardware.

use super::Adapter;
use crate::error::{AppResult, DaqError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

/// Replies to commands from a FIFO script and records every command sent.
///
/// When the script runs dry the adapter behaves like a closed connection.
#[derive(Debug, Default)]
pub struct MockAdapter {
    replies: VecDeque<(Option<Duration>, AppResult<String>)>,
    sent: Vec<String>,
    latency: Option<Duration>,
}

impl MockAdapter {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply payload.
    pub fn reply(mut self, payload: impl Into<String>) -> Self {
        self.replies.push_back((None, Ok(payload.into())));
        self
    }

    /// Queue a reply that takes `delay` to arrive, overriding the default latency.
    pub fn reply_after(mut self, delay: Duration, payload: impl Into<String>) -> Self {
        self.replies.push_back((Some(delay), Ok(payload.into())));
        self
    }

    /// Queue a failure for the next exchange.
    pub fn fail(mut self, error: DaqError) -> Self {
        self.replies.push_back((None, Err(error)));
        self
    }

    /// Sleep this long inside every exchange without its own delay
    /// (tokio time, so pausable in tests).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Commands sent so far, oldest first.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    async fn exchange(&mut self, command: &str) -> AppResult<String> {
        self.sent.push(command.to_string());
        let (delay, reply) = self
            .replies
            .pop_front()
            .unwrap_or((None, Err(DaqError::ConnectionClosed)));
        if let Some(delay) = delay.or(self.latency) {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_order_and_exhaustion() {
        let mut adapter = MockAdapter::new().reply("a").fail(DaqError::ConnectionClosed);
        assert_eq!(adapter.exchange("X?").await.unwrap(), "a");
        assert!(adapter.exchange("Y?").await.is_err());
        assert!(matches!(
            adapter.exchange("Z?").await,
            Err(DaqError::ConnectionClosed)
        ));
        assert_eq!(adapter.sent(), ["X?", "Y?", "Z?"]);
        assert_eq!(adapter.remaining(), 0);
    }
}
