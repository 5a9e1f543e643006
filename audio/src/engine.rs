use crate::node::{KernelNode, NodeHandle, NodeOutcome, ProcessNode};
use dsp_core::kernel::{AudioKernel, KernelStatus};
use dsp_core::{Error, Fault, NodeEvent, NodeId, Result, SampleBlock};
use log::{debug, error, info};
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Fixed shape and queue sizes of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub channels: usize,
    pub parameter_queue_capacity: usize,
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: dsp_core::SAMPLE_RATE,
            block_size: dsp_core::BLOCK_SIZE,
            channels: dsp_core::CHANNELS,
            parameter_queue_capacity: 16,
            event_queue_capacity: 64,
        }
    }
}

/// Runs a linear chain of nodes, one block at a time.
///
/// Nodes process in the order they were added; each node reads what the
/// previous one wrote. The engine is meant to live on the audio thread;
/// the control plane talks to it only through [`NodeHandle`]s and
/// [`EngineEvents`].
pub struct Engine {
    config: EngineConfig,
    slots: Vec<Option<Box<dyn ProcessNode>>>,
    free_slots: Vec<usize>,
    order: Vec<NodeId>,
    front: SampleBlock,
    back: SampleBlock,
    events: HeapProducer<NodeEvent>,
    dropped_events: Arc<AtomicUsize>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<(Self, EngineEvents)> {
        if config.sample_rate == 0 || config.block_size == 0 || config.channels == 0 {
            return Err(Error::InvalidArgument(format!(
                "engine needs a non-zero sample rate, block size and channel count: {:?}",
                config
            )));
        }

        let (producer, consumer) = HeapRb::<NodeEvent>::new(config.event_queue_capacity.max(1)).split();
        let dropped_events = Arc::new(AtomicUsize::new(0));

        info!(
            "Engine created: {} Hz, {} frames x {} channels",
            config.sample_rate, config.block_size, config.channels
        );

        let engine = Self {
            config,
            slots: Vec::new(),
            free_slots: Vec::new(),
            order: Vec::new(),
            front: SampleBlock::new(config.channels, config.block_size),
            back: SampleBlock::new(config.channels, config.block_size),
            events: producer,
            dropped_events: dropped_events.clone(),
        };
        let events = EngineEvents {
            events: consumer,
            dropped: dropped_events,
        };
        Ok((engine, events))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Live nodes in processing order
    pub fn nodes(&self) -> &[NodeId] {
        &self.order
    }

    /// Append a node to the end of the chain
    pub fn add_node<K: AudioKernel>(&mut self, kernel: K) -> NodeHandle<K::Parameters> {
        let index = match self.free_slots.pop() {
            Some(index) => index,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        let id = NodeId::new(index);

        let (node, handle) = KernelNode::create(
            id,
            kernel,
            self.config.parameter_queue_capacity,
            self.config.sample_rate,
        );
        self.slots[index] = Some(Box::new(node));
        self.order.push(id);

        info!("Added {} ({})", id, std::any::type_name::<K>());
        handle
    }

    /// Drop a node and release its slot for reuse
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let slot = self
            .slots
            .get_mut(id.index())
            .and_then(|slot| slot.take())
            .ok_or(Error::UnknownNode(id))?;
        drop(slot);

        self.order.retain(|node| *node != id);
        self.free_slots.push(id.index());
        info!("Removed {}", id);
        Ok(())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(_)))
    }

    /// Process one block through the chain.
    ///
    /// `input` and `output` must have the engine's shape. Errors here concern
    /// the call itself; node failures are reported as [`NodeEvent::Faulted`].
    pub fn process_block(&mut self, input: &SampleBlock, output: &mut SampleBlock) -> Result<()> {
        self.check_shape(input)?;
        self.check_shape(output)?;

        self.front.copy_from(input);
        for &id in &self.order {
            let Some(node) = self.slots.get_mut(id.index()).and_then(|slot| slot.as_mut()) else {
                continue;
            };

            match node.process(&self.front, &mut self.back, self.config.sample_rate) {
                NodeOutcome::Skipped | NodeOutcome::Processed(KernelStatus::Continue) => {}
                NodeOutcome::Processed(KernelStatus::Finished) => {
                    node.deactivate();
                    debug!("{} finished its stream", id);
                    publish_event(
                        &mut self.events,
                        &self.dropped_events,
                        NodeEvent::StreamFinished { node: id },
                    );
                }
                NodeOutcome::Failed(e) => {
                    node.deactivate();
                    error!("{} failed and was deactivated: {}", id, e);
                    publish_event(
                        &mut self.events,
                        &self.dropped_events,
                        NodeEvent::Faulted {
                            node: id,
                            fault: Fault::from(&e),
                        },
                    );
                }
            }

            std::mem::swap(&mut self.front, &mut self.back);
        }

        output.copy_from(&self.front);
        Ok(())
    }

    fn check_shape(&self, block: &SampleBlock) -> Result<()> {
        if block.channels() != self.config.channels || block.frames() != self.config.block_size {
            return Err(Error::InvalidArgument(format!(
                "block is {}x{}, engine runs {}x{}",
                block.channels(),
                block.frames(),
                self.config.channels,
                self.config.block_size
            )));
        }
        Ok(())
    }
}

fn publish_event(events: &mut HeapProducer<NodeEvent>, dropped: &AtomicUsize, event: NodeEvent) {
    if events.push(event).is_err() {
        dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Control-side reader of the events raised on the audio thread
pub struct EngineEvents {
    events: HeapConsumer<NodeEvent>,
    dropped: Arc<AtomicUsize>,
}

impl EngineEvents {
    pub fn pop(&mut self) -> Option<NodeEvent> {
        self.events.pop()
    }

    /// Take every event raised so far, oldest first
    pub fn drain(&mut self) -> Vec<NodeEvent> {
        let mut drained = Vec::new();
        while let Some(event) = self.events.pop() {
            drained.push(event);
        }
        drained
    }

    /// Events lost because the queue was full
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}
