use crate::data_structures::SlabIndex;
use std::fmt::{self, Display, Formatter};

/// Represents the index of a [Signal](super::Signal) in a [ModelBuilder](super::ModelBuilder)
/// or in the [Model](super::Model) built from it.
///
/// Signal ids stay valid across [ModelBuilder::build](super::ModelBuilder::build).
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct SignalId(pub(crate) usize);

/// Represents the index of a node in a [ModelBuilder](super::ModelBuilder).
///
/// Building compacts the node arena, so node ids handed out by the builder are only
/// meaningful before [ModelBuilder::build](super::ModelBuilder::build).
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct NodeId(pub(crate) usize);

/// Represents the index of a derived signal link.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct LinkId(pub(crate) usize);

/// Handle returned by [Model::watch](super::Model::watch), used to remove the watch again.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct WatchId(pub(crate) SlabIndex);

/// Returns a new NodeId from a provided usize.
macro_rules! ni {
    ( $x:expr ) => {{
        $crate::sim::NodeId($x)
    }};
}

impl From<SlabIndex> for NodeId {
    fn from(i: SlabIndex) -> Self {
        Self(i.i_actually_really_know_what_i_am_doing_and_i_want_the_inner_usize())
    }
}
impl From<NodeId> for SlabIndex {
    fn from(n: NodeId) -> SlabIndex {
        SlabIndex::i_actually_really_know_what_i_am_doing_and_i_want_to_construct_from_usize(n.0)
    }
}
impl From<&NodeId> for SlabIndex {
    fn from(n: &NodeId) -> SlabIndex {
        (*n).into()
    }
}

impl Display for SignalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}
impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Something that gets notified when a signal changes.
///
/// Signals only store these tags, the notified parties live in their own arenas
/// inside the [Model](super::Model).
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum Observer {
    /// A node that gets scheduled for the next micro step.
    Node(NodeId),
    /// A derived signal that gets updated right away.
    Link(LinkId),
    /// An external callback.
    Watch(WatchId),
}

impl Observer {
    /// Returns a short name for the kind of observer.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Observer::Node(_) => "Node",
            Observer::Link(_) => "Link",
            Observer::Watch(_) => "Watch",
        }
    }
}

/// A signal registered under a name, like a circuit input, output or probe.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct NamedSignal {
    pub name: String,
    pub signal: SignalId,
}

impl NamedSignal {
    pub fn new<S: Into<String>>(name: S, signal: SignalId) -> Self {
        Self {
            name: name.into(),
            signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_slab_round_trip() {
        let n = ni!(7);
        let index: SlabIndex = n.into();
        assert_eq!(NodeId::from(index), n);
        assert_eq!(n.to_string(), "n7");
    }

    #[test]
    fn test_observer_kind_name() {
        assert_eq!(Observer::Node(ni!(0)).kind_name(), "Node");
        assert_eq!(Observer::Link(LinkId(0)).kind_name(), "Link");
    }
}
