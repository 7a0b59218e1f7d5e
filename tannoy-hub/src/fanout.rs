//! Best-effort webhook fanout to receiver nodes
//!
//! Every catalog mutation and panic upload pushes one notification to
//! every configured receiver, concurrently, with a bounded per-receiver
//! timeout. Delivery is fire-and-forget: a dead receiver is logged and
//! skipped, never retried, and never blocks delivery to the others.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use tannoy_common::notify::Notification;
use tannoy_common::{Error, Result};

/// Outcome of one delivery attempt.
#[derive(Debug)]
pub struct Delivery {
    pub endpoint: String,
    pub outcome: Result<()>,
}

impl Delivery {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Pushes notifications to the configured receiver endpoints.
#[derive(Debug, Clone)]
pub struct Fanout {
    receivers: Vec<String>,
    http: reqwest::Client,
}

impl Fanout {
    pub fn new(receivers: Vec<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { receivers, http })
    }

    pub fn receivers(&self) -> &[String] {
        &self.receivers
    }

    /// Deliver `note` to every receiver concurrently and report each
    /// outcome. One slow or dead receiver costs at most the configured
    /// timeout and nothing more.
    pub async fn broadcast(&self, note: &Notification) -> Vec<Delivery> {
        if self.receivers.is_empty() {
            debug!("No receivers configured; dropping {} notification", note.kind());
            return Vec::new();
        }

        info!(
            "Fanning out {} notification to {} receiver(s)",
            note.kind(),
            self.receivers.len()
        );

        let deliveries = self
            .receivers
            .iter()
            .map(|endpoint| self.deliver_one(endpoint, note));
        let outcomes = join_all(deliveries).await;

        let delivered = outcomes.iter().filter(|d| d.is_ok()).count();
        info!(
            "Fanout complete: {}/{} receiver(s) reached",
            delivered,
            outcomes.len()
        );
        outcomes
    }

    async fn deliver_one(&self, endpoint: &str, note: &Notification) -> Delivery {
        let outcome = async {
            let response = self
                .http
                .post(endpoint)
                .json(note)
                .send()
                .await
                .map_err(|e| Error::Delivery {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(Error::Delivery {
                    endpoint: endpoint.to_string(),
                    reason: format!("receiver answered {}", response.status()),
                })
            }
        }
        .await;

        match &outcome {
            Ok(()) => debug!("Delivered {} to {}", note.kind(), endpoint),
            Err(e) => warn!("Delivery failed: {}", e),
        }
        Delivery {
            endpoint: endpoint.to_string(),
            outcome,
        }
    }
}
