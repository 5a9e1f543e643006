//! Control-plane tasks: scheduled parameter updates and event forwarding.

use crate::engine::EngineEvents;
use crate::node::NodeHandle;
use dsp_core::kernel::KernelParameters;
use dsp_core::{Error, NodeEvent, Result};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// A running [`spawn_kernel_update`] task
pub struct KernelUpdateTask<P> {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<NodeHandle<P>>,
}

impl<P> KernelUpdateTask<P> {
    /// Stop publishing and take the node handle back
    pub async fn stop(mut self) -> Result<NodeHandle<P>> {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.task
            .await
            .map_err(|e| Error::Other(anyhow::anyhow!("kernel update task failed: {}", e)))
    }
}

/// Publish `update()` to `handle` every `period`.
///
/// Snapshots that fail validation are skipped with a warning; a full queue
/// means the audio thread is behind and the snapshot is dropped.
pub fn spawn_kernel_update<P, F>(
    mut handle: NodeHandle<P>,
    period: Duration,
    mut update: F,
) -> KernelUpdateTask<P>
where
    P: KernelParameters,
    F: FnMut() -> P + Send + 'static,
{
    let (cancel_tx, mut cancel_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        info!("Starting kernel update task for {}", handle.id());

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match handle.publish(update()) {
                        Ok(()) => {}
                        Err(Error::QueueFull(queue)) => debug!("Dropped snapshot, {} is full", queue),
                        Err(e) => warn!("Rejected snapshot for {}: {}", handle.id(), e),
                    }
                }
                _ = &mut cancel_rx => {
                    break;
                }
            }
        }

        info!("Kernel update task for {} ended", handle.id());
        handle
    });

    KernelUpdateTask {
        cancel: Some(cancel_tx),
        task,
    }
}

/// Forward engine events into `sender`, polling every `period`.
///
/// Ends when the receiving side is dropped.
pub fn forward_events(
    mut events: EngineEvents,
    period: Duration,
    sender: mpsc::Sender<NodeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        let mut reported_drops = 0;
        info!("Starting event forwarding task");

        'outer: loop {
            tokio::select! {
                _ = interval.tick() => {
                    while let Some(event) = events.pop() {
                        if sender.send(event).await.is_err() {
                            break 'outer;
                        }
                    }

                    let dropped = events.dropped();
                    if dropped > reported_drops {
                        warn!("{} engine events dropped", dropped - reported_drops);
                        reported_drops = dropped;
                    }
                }
                _ = sender.closed() => {
                    break;
                }
            }
        }

        info!("Event forwarding task ended");
    })
}
