/// Default iteration budget, used both as the maximum number of micro steps a model may
/// take to settle and as the depth limit when following links or backtracking dependencies.
pub const MAX_LOOP_COUNTER: usize = 1000;

/// Clocks running above this frequency (in Hz) count as fast clocks.
pub const FAST_CLOCK_FREQUENCY: u32 = 50;

/// Configuration of a [Model](super::Model).
///
/// # Example
/// ```
/// # use digisim::SimConfig;
/// let config = SimConfig::default().with_noise(42).with_max_loop_counter(10);
///
/// assert!(config.noise);
/// assert_eq!(config.seed, 42);
/// assert_eq!(config.max_loop_counter, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    /// Iteration budget, see [MAX_LOOP_COUNTER].
    pub max_loop_counter: usize,
    /// Randomizes the initial values of driven signals and the evaluation order of nodes.
    pub noise: bool,
    /// Seed of the random generator used in noise mode.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_loop_counter: MAX_LOOP_COUNTER,
            noise: false,
            seed: 0,
        }
    }
}

impl SimConfig {
    pub fn with_max_loop_counter(mut self, max_loop_counter: usize) -> Self {
        self.max_loop_counter = max_loop_counter;
        self
    }

    /// Turns on noise mode using `seed`, runs are reproducible for a given seed.
    pub fn with_noise(mut self, seed: u64) -> Self {
        self.noise = true;
        self.seed = seed;
        self
    }

    pub fn without_noise(mut self) -> Self {
        self.noise = false;
        self
    }
}
