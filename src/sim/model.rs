use super::builder::{Clock, Names};
use super::config::{SimConfig, FAST_CLOCK_FREQUENCY};
use super::event::{ModelEvent, ModelStateObserver};
use super::handles::*;
use super::net::{Link, Net, Schedule, Watch};
use super::node::Node;
use super::signal::{Signal, Value};
use crate::error::{Result, SimError};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// A circuit ready to be simulated, created by [ModelBuilder::build](super::ModelBuilder::build).
///
/// Changes to signals schedule the nodes observing them, [Model::do_step] evaluates the
/// scheduled nodes in micro steps until no signal changes anymore.
/// Every micro step evaluates all the pending nodes at once: first every node reads its
/// inputs, then every node writes its outputs.
///
/// In noise mode the driven signals start with random values and the pending nodes
/// of a micro step are evaluated one after the other in random order, which shakes out
/// circuits that only work because of a lucky evaluation order.
pub struct Model {
    nodes: Vec<Node>,
    net: Net,
    schedule: Schedule,
    names: Names,
    lookup: IndexMap<String, SignalId>,
    config: SimConfig,
    rng: StdRng,
    observers: Vec<Box<dyn ModelStateObserver>>,
    running: bool,
}

impl Model {
    pub(crate) fn new(
        nodes: Vec<Node>,
        signals: Vec<Signal>,
        links: Vec<Link>,
        names: Names,
        config: SimConfig,
    ) -> Self {
        let mut lookup = IndexMap::new();
        let named = names
            .inputs
            .iter()
            .chain(&names.outputs)
            .chain(&names.probes)
            .map(|n| (&n.name, n.signal))
            .chain(names.clocks.iter().map(|c| (&c.label, c.signal)));
        for (name, signal) in named {
            lookup.entry(name.clone()).or_insert(signal);
        }

        Self {
            schedule: Schedule::new(nodes.len()),
            net: Net::new(signals, links, config.max_loop_counter),
            nodes,
            names,
            lookup,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            observers: Vec::new(),
            running: false,
        }
    }

    /// Validates the clocks, sets the initial values and settles the whole network.
    ///
    /// Every node is evaluated at least once, in the order the nodes were added.
    /// Returns [SimError::Oscillation] if the network never settles, the model can still
    /// be inspected afterwards.
    pub fn init(&mut self) -> Result<usize> {
        let start = Instant::now();
        self.check_clocks()?;

        if self.config.noise {
            for node in &self.nodes {
                for output in &node.outputs {
                    let random = self.rng.gen::<u64>();
                    self.net.signals[output.0].set_value(random);
                }
            }
        }
        for link in 0..self.net.links.len() {
            self.net.apply_link(link, &mut self.schedule)?;
        }
        for i in 0..self.nodes.len() {
            self.schedule.push(ni!(i));
        }

        let steps = self.settle()?;
        self.running = true;
        debug!(
            nodes = self.nodes.len(),
            steps,
            noise = self.config.noise,
            elapsed = ?start.elapsed(),
            "model initialized"
        );
        self.fire(ModelEvent::Started);
        Ok(steps)
    }

    fn check_clocks(&self) -> Result<()> {
        let fast = self
            .names
            .clocks
            .iter()
            .filter(|c| c.frequency.map_or(false, |f| f > FAST_CLOCK_FREQUENCY))
            .count();
        if fast > 1 {
            return Err(SimError::MoreThanOneFastClock);
        }
        for clock in &self.names.clocks {
            if clock.frequency.is_some() && self.net.signal(clock.signal).observer_count() == 0 {
                return Err(SimError::ClockNotConnected {
                    label: clock.label.clone(),
                });
            }
        }
        Ok(())
    }

    /// Evaluates pending nodes until the network settles, returns the number of micro steps.
    pub fn do_step(&mut self) -> Result<usize> {
        if !self.running {
            return Err(SimError::NotRunning);
        }
        let steps = self.settle()?;
        trace!(steps, "step");
        self.fire(ModelEvent::Step);
        Ok(steps)
    }

    /// Runs a single micro step, returns true if nodes are still pending afterwards.
    pub fn do_micro_step(&mut self) -> Result<bool> {
        if !self.running {
            return Err(SimError::NotRunning);
        }
        self.micro_step()?;
        self.fire(ModelEvent::MicroStep);
        Ok(self.needs_update())
    }

    /// Returns true if nodes are waiting to be evaluated.
    pub fn needs_update(&self) -> bool {
        !self.schedule.is_empty()
    }

    fn settle(&mut self) -> Result<usize> {
        let mut counter = 0;
        while self.needs_update() {
            if counter >= self.config.max_loop_counter {
                return Err(self.oscillation(counter));
            }
            self.micro_step()?;
            counter += 1;
        }
        Ok(counter)
    }

    fn micro_step(&mut self) -> Result<()> {
        let mut batch = self.schedule.take();
        trace!(nodes = batch.len(), "micro step");
        if self.config.noise {
            batch.shuffle(&mut self.rng);
        }
        let result = self.evaluate(&batch);
        self.schedule.recycle(batch);
        result
    }

    fn evaluate(&mut self, batch: &[NodeId]) -> Result<()> {
        if self.config.noise {
            for node in batch {
                let node = &mut self.nodes[node.0];
                node.read_inputs(&self.net);
                node.write_outputs(&mut self.net, &mut self.schedule)?;
            }
        } else {
            for node in batch {
                self.nodes[node.0].read_inputs(&self.net);
            }
            for node in batch {
                self.nodes[node.0].write_outputs(&mut self.net, &mut self.schedule)?;
            }
        }
        Ok(())
    }

    /// Runs one more micro step recording the signals that change.
    fn oscillation(&mut self, iterations: usize) -> SimError {
        self.net.track_changes();
        let result = self.micro_step();
        let changed = self.net.take_changes();
        if let Err(e) = result {
            return e;
        }
        let signals: Vec<String> = changed
            .iter()
            .map(|s| self.net.signal(*s).name().to_string())
            .collect();
        warn!(iterations, ?signals, "network oscillates");
        SimError::Oscillation {
            iterations,
            signals,
        }
    }

    /// Sets the value of `signal`, nodes observing it are evaluated on the next step.
    pub fn set_value(&mut self, signal: SignalId, value: u64) -> Result<()> {
        self.set(signal, Value::new(value))
    }

    pub fn set_high_z(&mut self, signal: SignalId, high_z: bool) -> Result<()> {
        if high_z {
            self.set(signal, Value::HIGH_Z)
        } else {
            let value = self.net.get(signal).value;
            self.set(signal, Value::new(value))
        }
    }

    pub fn set(&mut self, signal: SignalId, value: Value) -> Result<()> {
        self.net.set(signal, value, &mut self.schedule)?;
        Ok(())
    }

    /// Sets the value of the signal registered under `name`.
    pub fn set_input(&mut self, name: &str, value: u64) -> Result<()> {
        let signal = self.find_signal(name).ok_or_else(|| SimError::UnknownSignal {
            name: name.to_string(),
        })?;
        self.set_value(signal, value)
    }

    /// Returns the value of `signal`, 0 while it is high impedance.
    pub fn value(&self, signal: SignalId) -> u64 {
        self.net.get(signal).value
    }

    pub fn get(&self, signal: SignalId) -> Value {
        self.net.get(signal)
    }

    pub fn signal(&self, signal: SignalId) -> &Signal {
        self.net.signal(signal)
    }

    pub fn signals(&self) -> &[Signal] {
        &self.net.signals
    }

    /// Returns the current value of every named signal.
    pub fn signals_copy(&self) -> Vec<(String, Value)> {
        self.lookup
            .iter()
            .map(|(name, signal)| (name.clone(), self.net.get(*signal)))
            .collect()
    }

    /// Returns the signal registered under `name` as input, output, probe or clock.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.lookup.get(name).copied()
    }

    pub fn inputs(&self) -> &[NamedSignal] {
        &self.names.inputs
    }

    pub fn outputs(&self) -> &[NamedSignal] {
        &self.names.outputs
    }

    pub fn clocks(&self) -> &[Clock] {
        &self.names.clocks
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Flips every clock and settles the network.
    pub fn toggle_clocks(&mut self) -> Result<usize> {
        if !self.running {
            return Err(SimError::NotRunning);
        }
        for i in 0..self.names.clocks.len() {
            let clock = self.names.clocks[i].signal;
            let value = Value::from_bool(!self.net.get(clock).bool());
            self.net.set(clock, value, &mut self.schedule)?;
        }
        self.do_step()
    }

    /// Calls `callback` with the new value every time `signal` changes.
    pub fn watch<F: FnMut(SignalId, Value) + 'static>(
        &mut self,
        signal: SignalId,
        callback: F,
    ) -> WatchId {
        let id = WatchId(self.net.watches.insert(Watch {
            signal,
            callback: Box::new(callback),
        }));
        self.net.signals[signal.0].add_observer(Observer::Watch(id));
        id
    }

    /// Removes a watch added with [Model::watch], returns false if it was already removed.
    pub fn unwatch(&mut self, watch: WatchId) -> bool {
        match self.net.watches.remove(watch.0) {
            Some(w) => self.net.signals[w.signal.0].remove_observer(Observer::Watch(watch)),
            None => false,
        }
    }

    /// Registers an observer of the model lifecycle.
    pub fn add_observer<O: ModelStateObserver + 'static>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    fn fire(&mut self, event: ModelEvent) {
        for observer in &mut self.observers {
            observer.handle_event(event);
        }
    }

    /// Stops the model, further steps return [SimError::NotRunning].
    pub fn close(&mut self) {
        if self.running {
            self.running = false;
            self.fire(ModelEvent::Stopped);
        }
    }

    pub(crate) fn node_name(&self, node: NodeId) -> &str {
        self.nodes[node.0].name()
    }

    pub(crate) fn node_outputs(&self, node: NodeId) -> &[SignalId] {
        &self.nodes[node.0].outputs
    }

    pub(crate) fn link(&self, link: LinkId) -> Link {
        self.net.links[link.0]
    }

    /// Dumps the model in [dot](https://en.wikipedia.org/wiki/DOT_(graph_description_language))
    /// format to `path`, one vertex per node and named input, one edge per connection.
    #[cfg(feature = "dot")]
    pub fn dump_dot<P: AsRef<std::path::Path>>(&self, path: P) -> std::io::Result<()> {
        use petgraph::dot::Dot;
        use std::collections::HashMap;
        use std::io::Write;

        let mut graph = petgraph::Graph::<String, String>::new();
        let mut writers = HashMap::new();
        for input in &self.names.inputs {
            let index = graph.add_node(format!("IN:{}", input.name));
            writers.insert(input.signal, index);
        }
        for clock in &self.names.clocks {
            let index = graph.add_node(format!("CLK:{}", clock.label));
            writers.insert(clock.signal, index);
        }
        let indexes: Vec<_> = self
            .nodes
            .iter()
            .map(|node| {
                let index = graph.add_node(format!("{}:{}", node.kind().name(), node.name()));
                for output in &node.outputs {
                    writers.insert(*output, index);
                }
                index
            })
            .collect();
        for (node, index) in self.nodes.iter().zip(&indexes) {
            for input in &node.inputs {
                if let Some(writer) = writers.get(input) {
                    let name = self.net.signal(*input).name().to_string();
                    graph.add_edge(*writer, *index, name);
                }
            }
        }

        let mut f = std::fs::File::create(path)?;
        write!(f, "{}", Dot::new(&graph))
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("nodes", &self.nodes.len())
            .field("signals", &self.net.signals.len())
            .field("running", &self.running)
            .finish()
    }
}
