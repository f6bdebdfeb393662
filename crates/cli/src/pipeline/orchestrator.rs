//! Pipeline orchestrator - drives one acquisition run of the camera.
//!
//! The camera worker runs on its own thread; this side polls the frame ring,
//! waits for the finished notification and turns Ctrl+C or the timeout into
//! a stop request.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use camera::{Camera, FrameRing};
use contracts::{AcquisitionListener, CameraBlueprint, CameraError, RunSummary};
use observability::AcquisitionMetricsAggregator;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// How long to wait for the worker thread after the finished notification
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The camera blueprint configuration
    pub blueprint: CameraBlueprint,

    /// Stop the run after this long (None = no timeout)
    pub timeout: Option<Duration>,

    /// How often the frame ring is drained
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            blueprint: CameraBlueprint::default(),
            timeout: None,
            poll_interval: Duration::from_millis(20),
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run one sequence to completion, or until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let camera = Arc::new(
            Camera::from_blueprint(&self.config.blueprint).context("Failed to build camera")?,
        );

        let (tx, mut finished) = oneshot::channel();
        camera.set_listener(Some(Arc::new(FinishedNotifier::new(tx))));

        let request = camera.default_request();
        camera
            .start_configured_sequence()
            .context("Failed to start acquisition sequence")?;
        info!(
            camera = %camera.label(),
            count = ?request.count,
            interval_ms = request.interval_ms,
            stop_on_overflow = request.stop_on_overflow,
            "Sequence started"
        );

        let ring = camera.frame_ring();
        let mut aggregator = AcquisitionMetricsAggregator::new();
        let mut poll = tokio::time::interval(self.config.poll_interval);

        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        let mut stop_requested = false;
        let summary = loop {
            tokio::select! {
                result = &mut finished => {
                    break result.map_err(|_| CliError::MissingSummary)?;
                }
                _ = poll.tick() => {
                    drain_ring(ring.as_ref(), &mut aggregator);
                }
                _ = &mut shutdown, if !stop_requested => {
                    warn!("Received shutdown signal, stopping sequence...");
                    stop_requested = true;
                    request_stop(&camera).await?;
                }
                _ = &mut deadline, if !stop_requested => {
                    warn!(timeout_secs = timeout.map(|t| t.as_secs()), "Timeout reached, stopping sequence...");
                    stop_requested = true;
                    request_stop(&camera).await?;
                }
            }
        };

        let joiner = Arc::clone(&camera);
        let joined = tokio::task::spawn_blocking(move || joiner.wait_until_stopped(JOIN_TIMEOUT))
            .await
            .context("Join task panicked")?;
        if !joined {
            warn!("Acquisition worker did not exit in time");
        }

        drain_ring(ring.as_ref(), &mut aggregator);
        aggregator.finish(&summary);

        let status = camera.status();
        if let Some(ring) = &ring {
            observability::record_sink_depth(&self.config.blueprint.sink.name, ring.len());
        }

        Ok(PipelineStats {
            summary,
            metrics: aggregator.summary(),
            sink: status.sink,
            duration: start_time.elapsed(),
        })
    }
}

/// Stop runs on a blocking thread because it joins the worker
async fn request_stop(camera: &Arc<Camera>) -> Result<()> {
    let camera = Arc::clone(camera);
    tokio::task::spawn_blocking(move || camera.stop_sequence())
        .await
        .context("Stop task panicked")
}

fn drain_ring(ring: Option<&FrameRing>, aggregator: &mut AcquisitionMetricsAggregator) {
    let Some(ring) = ring else {
        return;
    };
    let frames = ring.drain();
    if !frames.is_empty() {
        debug!(count = frames.len(), "Drained frames from ring");
    }
    for frame in &frames {
        aggregator.update(&frame.metadata);
    }
}

/// Forwards the finished notification to the async side
struct FinishedNotifier {
    tx: Mutex<Option<oneshot::Sender<RunSummary>>>,
}

impl FinishedNotifier {
    fn new(tx: oneshot::Sender<RunSummary>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }
}

impl AcquisitionListener for FinishedNotifier {
    fn acquisition_finished(&self, summary: &RunSummary) -> Result<(), CameraError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        match tx {
            Some(tx) => {
                if tx.send(summary.clone()).is_err() {
                    debug!("Run summary receiver already dropped");
                }
            }
            None => debug!("Ignoring finished notification from a later run"),
        }
        Ok(())
    }
}
