//! Engine-side wrapper around a kernel and its control-side handle.

use dsp_core::kernel::{AudioKernel, ExecuteContext, KernelParameters, KernelStatus};
use dsp_core::{Error, NodeId, Result, SampleBlock};
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of running one node for one block
#[derive(Debug)]
pub(crate) enum NodeOutcome {
    /// Node was inactive and produced silence
    Skipped,
    Processed(KernelStatus),
    Failed(Error),
}

/// Type-erased node as stored in the engine arena
pub(crate) trait ProcessNode: Send {
    fn process(&mut self, input: &SampleBlock, output: &mut SampleBlock, sample_rate: u32) -> NodeOutcome;

    fn deactivate(&self);
}

pub(crate) struct KernelNode<K: AudioKernel> {
    kernel: K,
    parameters: K::Parameters,
    updates: HeapConsumer<K::Parameters>,
    active: Arc<AtomicBool>,
}

impl<K: AudioKernel> KernelNode<K> {
    /// Build the node and the handle that feeds it
    pub(crate) fn create(
        id: NodeId,
        kernel: K,
        queue_capacity: usize,
        sample_rate: u32,
    ) -> (Self, NodeHandle<K::Parameters>) {
        let (producer, consumer) = HeapRb::<K::Parameters>::new(queue_capacity.max(1)).split();
        let active = Arc::new(AtomicBool::new(true));

        let node = Self {
            kernel,
            parameters: K::Parameters::default(),
            updates: consumer,
            active: active.clone(),
        };
        let handle = NodeHandle {
            id,
            updates: producer,
            active,
            sample_rate,
        };
        (node, handle)
    }
}

impl<K: AudioKernel> ProcessNode for KernelNode<K> {
    fn process(&mut self, input: &SampleBlock, output: &mut SampleBlock, sample_rate: u32) -> NodeOutcome {
        if !self.active.load(Ordering::Acquire) {
            output.clear();
            return NodeOutcome::Skipped;
        }

        // Newest snapshot wins
        while let Some(parameters) = self.updates.pop() {
            self.parameters = parameters;
        }

        let mut context = ExecuteContext {
            parameters: &self.parameters,
            input,
            output,
            sample_rate,
        };
        match self.kernel.execute(&mut context) {
            Ok(status) => NodeOutcome::Processed(status),
            Err(e) => {
                context.output.clear();
                NodeOutcome::Failed(e)
            }
        }
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Control-side end of a node: publishes parameter snapshots and toggles it.
///
/// Owned by exactly one control task at a time.
pub struct NodeHandle<P> {
    id: NodeId,
    updates: HeapProducer<P>,
    active: Arc<AtomicBool>,
    sample_rate: u32,
}

impl<P: KernelParameters> NodeHandle<P> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Validate `parameters` and queue them for the next block
    pub fn publish(&mut self, parameters: P) -> Result<()> {
        parameters.validate(self.sample_rate)?;
        self.updates
            .push(parameters)
            .map_err(|_| Error::QueueFull(format!("parameter queue of {}", self.id)))
    }

    /// Free room in the parameter queue
    pub fn pending_capacity(&self) -> usize {
        self.updates.free_len()
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl<P> std::fmt::Debug for NodeHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("id", &self.id)
            .field("active", &self.active.load(Ordering::Relaxed))
            .finish()
    }
}
