use super::handles::{NodeId, Observer, SignalId, WatchId};
use super::signal::{Signal, Value};
use crate::data_structures::{DoubleBuffer, NodeSet, Slab};
use crate::error::{Result, SimError};
use std::fmt;

/// Derived signal: every change of `from` is mapped through `map` and written to `to`
/// right away, without waiting for the next micro step.
#[derive(Clone, Copy, Debug)]
pub struct Link {
    pub from: SignalId,
    pub to: SignalId,
    pub map: fn(Value) -> Value,
}

impl Link {
    /// Passes the value through unchanged.
    pub fn copy(value: Value) -> Value {
        value
    }

    /// Inverts a 1 bit value, high impedance reads as 0.
    pub fn invert(value: Value) -> Value {
        Value::from_bool(!value.bool())
    }
}

/// External callback notified with the new value whenever its signal changes.
pub(crate) struct Watch {
    pub signal: SignalId,
    pub callback: Box<dyn FnMut(SignalId, Value)>,
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch").field("signal", &self.signal).finish()
    }
}

/// Nodes waiting for the next micro step, in the order they were scheduled.
///
/// A node is queued at most once per micro step no matter how many of its inputs change.
#[derive(Debug, Default)]
pub(crate) struct Schedule {
    pending: DoubleBuffer<NodeId>,
    queued: NodeSet,
}

impl Schedule {
    pub fn new(nodes: usize) -> Self {
        Self {
            pending: DoubleBuffer::new(),
            queued: NodeSet::new(nodes),
        }
    }

    pub fn push(&mut self, node: NodeId) {
        if self.queued.insert(node.0) {
            self.pending.push(node);
        }
    }

    /// Returns the nodes of the next micro step, they may be scheduled again from now on.
    pub fn take(&mut self) -> Vec<NodeId> {
        let batch = self.pending.take();
        for node in &batch {
            self.queued.remove(node.0);
        }
        batch
    }

    pub fn recycle(&mut self, batch: Vec<NodeId>) {
        self.pending.recycle(batch)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Owner of every signal of a running model and the parties observing them.
///
/// All writes go through [Net::set], which notifies the observers of the signal in
/// registration order once its state actually changed.
#[derive(Debug)]
pub(crate) struct Net {
    pub signals: Vec<Signal>,
    pub links: Vec<Link>,
    pub watches: Slab<Watch>,
    max_depth: usize,
    changed: Option<Vec<SignalId>>,
}

impl Net {
    pub fn new(signals: Vec<Signal>, links: Vec<Link>, max_depth: usize) -> Self {
        Self {
            signals,
            links,
            watches: Slab::new(),
            max_depth,
            changed: None,
        }
    }

    #[inline]
    pub fn get(&self, signal: SignalId) -> Value {
        self.signals[signal.0].get()
    }

    #[inline]
    pub fn signal(&self, signal: SignalId) -> &Signal {
        &self.signals[signal.0]
    }

    /// Writes `value` to `signal`, returns true if the signal changed.
    pub fn set(&mut self, signal: SignalId, value: Value, schedule: &mut Schedule) -> Result<bool> {
        self.set_at_depth(signal, value, schedule, 0)
    }

    fn set_at_depth(
        &mut self,
        signal: SignalId,
        value: Value,
        schedule: &mut Schedule,
        depth: usize,
    ) -> Result<bool> {
        if !self.signals[signal.0].set(value) {
            return Ok(false);
        }
        if let Some(changed) = &mut self.changed {
            changed.push(signal);
        }
        let value = self.signals[signal.0].get();

        // Observers are only added or removed from outside a propagation,
        // so the list can't change under us.
        for i in 0..self.signals[signal.0].observer_count() {
            match self.signals[signal.0].observer(i) {
                Observer::Node(node) => schedule.push(node),
                Observer::Link(link) => {
                    if depth >= self.max_depth {
                        return Err(SimError::Oscillation {
                            iterations: depth,
                            signals: vec![self.signals[signal.0].name().to_string()],
                        });
                    }
                    let link = self.links[link.0];
                    self.set_at_depth(link.to, (link.map)(value), schedule, depth + 1)?;
                }
                Observer::Watch(WatchId(index)) => {
                    if let Some(watch) = self.watches.get_mut(index) {
                        (watch.callback)(signal, value);
                    }
                }
            }
        }
        Ok(true)
    }

    /// Pushes the current value of `from` through `link` unconditionally.
    pub fn apply_link(&mut self, link: usize, schedule: &mut Schedule) -> Result<bool> {
        let link = self.links[link];
        let value = (link.map)(self.get(link.from));
        self.set_at_depth(link.to, value, schedule, 1)
    }

    /// Starts recording every signal that changes.
    pub fn track_changes(&mut self) {
        self.changed = Some(Vec::new());
    }

    /// Stops recording and returns the signals that changed, each once, in first change order.
    pub fn take_changes(&mut self) -> Vec<SignalId> {
        let mut changed = self.changed.take().unwrap_or_default();
        let mut seen = NodeSet::new(self.signals.len());
        changed.retain(|s| seen.insert(s.0));
        changed
    }
}
