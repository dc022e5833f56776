//! Log loading and in-order replay.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use marketplace_indexer::{DecodedLog, MarketplaceEventHandler, NotificationGate};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LogsFile {
    /// `[{...}, {...}]`
    DirectArray(Vec<DecodedLog>),
    /// `{"logs": [{...}]}`
    WithMetadata { logs: Vec<DecodedLog> },
}

pub fn load_logs(path: &Path) -> Result<Vec<DecodedLog>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let logs = match serde_json::from_str::<LogsFile>(&contents)
        .with_context(|| format!("failed to parse logs in {}", path.display()))?
    {
        LogsFile::DirectArray(logs) | LogsFile::WithMetadata { logs } => logs,
    };
    Ok(logs)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Feeds `logs` to the handler one at a time.
///
/// Stops at the first failure unless `continue_on_error` is set.
pub async fn replay(
    handler: &MarketplaceEventHandler,
    logs: &[DecodedLog],
    continue_on_error: bool,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for log in logs {
        match handler.process(log).await {
            Ok(Some(details)) => {
                summary.processed += 1;
                tracing::debug!(
                    target: "marketplace_listener::replay",
                    listing = %details.listing().id,
                    webhook = handler.webhook_enabled(),
                    discord = handler.discord_webhook_enabled(),
                    email = handler.email_webhook_enabled(),
                    pubsub = handler.gcloud_pubsub_enabled(),
                    "Notifications applicable"
                );
            }
            Ok(None) => summary.skipped += 1,
            Err(err) if continue_on_error => {
                summary.failed += 1;
                tracing::error!(
                    target: "marketplace_listener::replay",
                    event = %log.event_name,
                    position = %log.position(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "Skipping failed log"
                );
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to process {} at {}", log.event_name, log.position())
                });
            }
        }
    }

    Ok(summary)
}
