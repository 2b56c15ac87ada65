use strum_macros::{Display, IntoStaticStr};

/// Lifecycle events fired by a [Model](super::Model).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, IntoStaticStr)]
pub enum ModelEvent {
    /// [Model::init](super::Model::init) finished settling the network.
    Started,
    /// A call to [Model::do_step](super::Model::do_step) finished.
    Step,
    /// A single micro step was run through [Model::do_micro_step](super::Model::do_micro_step).
    MicroStep,
    /// [Model::close](super::Model::close) was called.
    Stopped,
}

/// Receives [ModelEvents](ModelEvent), used by displays that repaint after each step.
///
/// Implemented for every `FnMut(ModelEvent)`.
pub trait ModelStateObserver {
    fn handle_event(&mut self, event: ModelEvent);
}

impl<F: FnMut(ModelEvent)> ModelStateObserver for F {
    fn handle_event(&mut self, event: ModelEvent) {
        self(event)
    }
}
