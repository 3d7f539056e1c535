//! Coordination rounds and the polling loop.

use std::{
    future::Future,
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tokio::time::MissedTickBehavior;

use crate::{
    document::{
        UpdateDocument, ViewDocument, ViewMetadata, published_from_value, remote_section,
    },
    error::CoordinatorError,
    pair::{Published, merge_reports, publish_into_view},
    publish::{modified, read_json_or_empty, write_atomic},
};

/// Input and output locations plus polling cadence.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Server peer's update document.
    pub server_update: PathBuf,
    /// Client peer's update document.
    pub client_update: PathBuf,
    /// Where the server's view is published.
    pub server_view: PathBuf,
    /// Where the client's view is published.
    pub client_view: PathBuf,
    /// How often to check the update documents for changes.
    pub interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            server_update: PathBuf::from("server_update.json"),
            client_update: PathBuf::from("client_update.json"),
            server_view: PathBuf::from("server_view.json"),
            client_view: PathBuf::from("client_view.json"),
            interval: Duration::from_millis(100),
        }
    }
}

/// Both views produced by one round.
#[derive(Debug, Clone, PartialEq)]
pub struct Views {
    /// View for the server peer.
    pub server: ViewDocument,
    /// View for the client peer.
    pub client: ViewDocument,
}

/// Merge both update documents into both views.
///
/// Each view folds the merged pairs into its own previously published
/// lineage, so the two views keep independent epochs.
pub fn merge_round(
    server: &UpdateDocument,
    client: &UpdateDocument,
    server_previous: &Published,
    client_previous: &Published,
    generated_at_ms: u64,
) -> Views {
    let merged = merge_reports(&client.pairs, &server.pairs);

    let view = |own: &UpdateDocument, peer: &UpdateDocument, previous: &Published| {
        let pairs = publish_into_view(&merged, previous);
        ViewDocument {
            local: own.local.clone(),
            remote: remote_section(peer),
            metadata: ViewMetadata {
                generated_at_ms,
                local_qp_count: own.queue_count(),
                remote_qp_count: peer.queue_count(),
                pair_count: pairs.len(),
            },
            pairs,
        }
    };

    Views {
        server: view(server, client, server_previous),
        client: view(client, server, client_previous),
    }
}

/// Modification times of the two update documents.
type Fingerprint = (Option<SystemTime>, Option<SystemTime>);

/// File-backed coordinator.
///
/// Rounds read both update documents and both previously published views
/// from disk, so the published files are the only state carried between
/// rounds and across restarts.
#[derive(Debug)]
pub struct Coordinator {
    config: CoordinatorConfig,
    last_seen: Option<Fingerprint>,
}

impl Coordinator {
    /// Create a coordinator. The first [`poll`](Self::poll) always runs a
    /// round.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config, last_seen: None }
    }

    /// Configuration in use.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run one round unconditionally and publish both views.
    pub fn round(&mut self, now_ms: u64) -> Result<Views, CoordinatorError> {
        self.last_seen = Some(self.fingerprint());

        let server = UpdateDocument::from_value(&read_json_or_empty(&self.config.server_update));
        let client = UpdateDocument::from_value(&read_json_or_empty(&self.config.client_update));
        let server_previous = published_from_value(&read_json_or_empty(&self.config.server_view));
        let client_previous = published_from_value(&read_json_or_empty(&self.config.client_view));

        let views = merge_round(&server, &client, &server_previous, &client_previous, now_ms);

        write_atomic(&self.config.server_view, &views.server)?;
        write_atomic(&self.config.client_view, &views.client)?;

        tracing::info!(
            pairs = views.server.metadata.pair_count,
            server_qps = views.server.metadata.local_qp_count,
            client_qps = views.client.metadata.local_qp_count,
            "views published"
        );

        Ok(views)
    }

    /// Run a round if either update document changed since the last round.
    ///
    /// Returns whether a round ran. A file appearing or disappearing counts
    /// as a change.
    pub fn poll(&mut self, now_ms: u64) -> Result<bool, CoordinatorError> {
        if self.last_seen == Some(self.fingerprint()) {
            return Ok(false);
        }
        self.round(now_ms)?;
        Ok(true)
    }

    /// Poll on the configured interval until `shutdown` resolves.
    ///
    /// Round failures are logged and polling continues.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<(), CoordinatorError> {
        tracing::info!(
            server_update = %self.config.server_update.display(),
            client_update = %self.config.client_update.display(),
            interval_ms = self.config.interval.as_millis() as u64,
            "coordinator polling"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    return Ok(());
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.poll(wall_clock_ms()) {
                        tracing::error!("round failed: {}", e);
                    }
                },
            }
        }
    }

    fn fingerprint(&self) -> Fingerprint {
        (modified(&self.config.server_update), modified(&self.config.client_update))
    }
}

/// Milliseconds since the Unix epoch.
#[allow(clippy::disallowed_methods)]
pub fn wall_clock_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as u64)
}
