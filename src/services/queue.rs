use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::core::MatchRanker;
use crate::models::{MatchingErrorResponse, MatchingRequest, MatchingResponse};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Match queue is full")]
    Full,

    #[error("Match queue is closed")]
    Closed,

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Producer side of the asynchronous matching path.
///
/// Messages are raw JSON payloads, the same shape a broker would deliver.
#[derive(Debug, Clone)]
pub struct MatchQueue {
    tx: mpsc::Sender<Vec<u8>>,
}

impl MatchQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn submit(&self, request: &MatchingRequest) -> Result<(), QueueError> {
        let payload = serde_json::to_vec(request)?;
        self.submit_raw(payload)
    }

    pub fn submit_raw(&self, payload: Vec<u8>) -> Result<(), QueueError> {
        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}

/// Reply for one queued request
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QueueReply {
    Matched(MatchingResponse),
    Failed(MatchingErrorResponse),
}

#[async_trait]
pub trait ResponsePublisher: Send + Sync {
    async fn publish(&self, reply: QueueReply);
}

/// Publisher that only logs the outcome; results stay readable via the cache
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl ResponsePublisher for LogPublisher {
    async fn publish(&self, reply: QueueReply) {
        match &reply {
            QueueReply::Matched(response) => tracing::info!(
                request_id = %response.request_id,
                matches = response.matches.len(),
                "Queued request matched"
            ),
            QueueReply::Failed(error) => tracing::warn!(
                request_id = %error.request_id,
                error = %error.error,
                "Queued request failed: {}",
                error.message
            ),
        }
    }
}

/// Publisher that forwards replies to an in-process channel
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<QueueReply>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<QueueReply>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ResponsePublisher for ChannelPublisher {
    async fn publish(&self, reply: QueueReply) {
        if self.tx.send(reply).is_err() {
            tracing::warn!("Reply channel closed, dropping reply");
        }
    }
}

/// Consumes queued requests and runs them through the ranker
pub struct QueueWorker {
    ranker: Arc<MatchRanker>,
    rx: mpsc::Receiver<Vec<u8>>,
    publisher: Arc<dyn ResponsePublisher>,
    shutdown_rx: watch::Receiver<bool>,
}

impl QueueWorker {
    pub fn new(
        ranker: Arc<MatchRanker>,
        rx: mpsc::Receiver<Vec<u8>>,
        publisher: Arc<dyn ResponsePublisher>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            ranker,
            rx,
            publisher,
            shutdown_rx,
        }
    }

    /// Run the consumer loop
    pub async fn run(mut self) {
        tracing::info!("Starting match queue worker");

        loop {
            tokio::select! {
                // Check for shutdown signal
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        tracing::info!("Shutdown signal received, stopping queue worker");
                        break;
                    }
                }

                message = self.rx.recv() => {
                    match message {
                        Some(payload) => {
                            let reply = self.process_message(&payload).await;
                            self.publisher.publish(reply).await;
                        }
                        None => {
                            tracing::warn!("Match queue closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Match queue worker stopped");
    }

    async fn process_message(&self, payload: &[u8]) -> QueueReply {
        let request: MatchingRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse queued request");
                return QueueReply::Failed(MatchingErrorResponse {
                    request_id: request_id_hint(payload),
                    error: "invalid_message".to_string(),
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        };

        match self.ranker.match_request(&request).await {
            Ok(response) => QueueReply::Matched(response),
            Err(e) => QueueReply::Failed(MatchingErrorResponse {
                request_id: request.request_id.clone(),
                error: e.code().to_string(),
                message: e.to_string(),
                timestamp: Utc::now(),
            }),
        }
    }
}

/// Best-effort request id from a payload that did not decode
fn request_id_hint(payload: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(payload)
        .ok()
        .and_then(|value| value.get("request_id")?.as_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}
