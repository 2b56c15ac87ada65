use crate::sim::Value;

/// Stored bit(s) of a flip-flop plus the clock level seen on the previous evaluation.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub(crate) struct FlipFlopState {
    pub q: u64,
    pub last_clock: bool,
}

impl FlipFlopState {
    /// Records the clock level, returns true on a rising edge.
    pub fn clock(&mut self, clock: Value) -> bool {
        let clock = clock.bool();
        let rising = clock && !self.last_clock;
        self.last_clock = clock;
        rising
    }

    /// Returns the `[Q, ¬Q]` outputs.
    pub fn outputs(&self, mask: u64) -> [Value; 2] {
        [Value::new(self.q), Value::new(!self.q & mask)]
    }
}

/// D flip-flop, inputs `[D, C]`: stores D on the rising edge.
pub(crate) fn read_d(inputs: &[Value], state: &mut FlipFlopState, mask: u64) {
    if state.clock(inputs[1]) {
        state.q = inputs[0].value & mask;
    }
}

/// JK flip-flop, inputs `[J, C, K]`.
pub(crate) fn read_jk(inputs: &[Value], state: &mut FlipFlopState) {
    if state.clock(inputs[1]) {
        state.q = match (inputs[0].bool(), inputs[2].bool()) {
            (false, false) => state.q,
            (true, false) => 1,
            (false, true) => 0,
            (true, true) => state.q ^ 1,
        }
    }
}

/// T flip-flop, inputs `[T, C]` with an enable input or just `[C]` without.
pub(crate) fn read_t(inputs: &[Value], state: &mut FlipFlopState, enable: bool) {
    let (toggle, clock) = if enable {
        (inputs[0].bool(), inputs[1])
    } else {
        (true, inputs[0])
    };
    if state.clock(clock) && toggle {
        state.q ^= 1;
    }
}
