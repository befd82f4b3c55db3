use crate::state::AppState;
use chrono::Utc;
use devnotify_common::types::{DockerConfig, IntegrationKind, IntegrationStatus};
use devnotify_ingest::docker::{synthesize_events, DockerClient};
use devnotify_ingest::normalize::{normalize, NormalizeContext, SourceKind};
use devnotify_ingest::retry::{retry_with_cap, RetryPolicy};
use devnotify_storage::{IntegrationFilter, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Periodic Docker poll scheduler.
///
/// Every tick it walks the connected Docker integrations, snapshots the
/// daemon state, synthesizes events newer than the integration's last sync
/// and persists them as notifications. The daemon's own event stream is
/// not consumed.
pub struct DockerPollScheduler {
    store: Arc<Store>,
    http: reqwest::Client,
    tick_secs: u64,
    timeout: Duration,
    retry: RetryPolicy,
}

impl DockerPollScheduler {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            http: state.http.clone(),
            tick_secs: state.config.docker_poller.interval_secs,
            timeout: state.adapter_timeout(),
            retry: state.retry_policy(),
        }
    }

    pub async fn run(self) {
        let mut tick = interval(Duration::from_secs(self.tick_secs.max(1)));
        loop {
            tick.tick().await;
            if let Err(e) = self.poll_once().await {
                tracing::error!(error = %e, "docker poll pass failed");
            }
        }
    }

    async fn poll_once(&self) -> anyhow::Result<()> {
        let filter = IntegrationFilter {
            kind: Some(IntegrationKind::Docker),
            status: Some(IntegrationStatus::Connected),
            ..Default::default()
        };
        let integrations = self.store.list_integrations(&filter).await?;
        for integration in integrations {
            let config: DockerConfig = match serde_json::from_value(integration.config.clone()) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(id = %integration.id, error = %e, "invalid docker config, skipping");
                    continue;
                }
            };

            let client = DockerClient::new(self.http.clone(), &config, self.timeout);
            let containers = retry_with_cap(self.retry, || client.list_containers()).await;
            let images = retry_with_cap(self.retry, || client.list_images()).await;

            let (containers, images) = match (containers, images) {
                (Ok(c), Ok(i)) => (c, i),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!(id = %integration.id, error = %e, "docker poll failed");
                    self.store
                        .set_integration_status(&integration.id, IntegrationStatus::Error, None)
                        .await?;
                    continue;
                }
            };

            let ctx = NormalizeContext {
                project_id: integration.project_id.clone(),
                integration_id: Some(integration.id.clone()),
            };
            let now = Utc::now();
            let mut stored = 0usize;
            for event in synthesize_events(&containers, &images) {
                // Only state changes since the last successful sync become
                // notifications; older snapshot entries were already seen.
                if let (Some(ts), Some(last_sync)) = (event.timestamp, integration.last_sync) {
                    if ts <= last_sync {
                        continue;
                    }
                }
                let raw = serde_json::to_value(&event)?;
                match normalize(SourceKind::DockerEvent, &raw, &ctx, now) {
                    Ok(notification) => {
                        self.store.insert_notification(&notification).await?;
                        stored += 1;
                    }
                    Err(e) => {
                        tracing::warn!(id = %integration.id, error = %e, "docker event rejected");
                    }
                }
            }

            self.store
                .set_integration_status(&integration.id, IntegrationStatus::Connected, Some(now))
                .await?;
            tracing::info!(
                id = %integration.id,
                containers = containers.len(),
                images = images.len(),
                stored,
                "docker poll pass finished"
            );
        }
        Ok(())
    }
}
