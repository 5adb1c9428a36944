//! A single stateful analog unit

use common::{Activation, RunningStat};

/// Continuous valued unit with a retainment rate and an activation
/// nonlinearity. Owned exclusively by its reservoir and mutated only
/// through its own compute and reset calls.
#[derive(Debug, Clone)]
pub struct AnalogNeuron {
    bias: f64,
    retainment: f64,
    activation: Activation,
    state: f64,
    previous_state: f64,
    signal: f64,
    stored_signal: f64,
    state_stat: RunningStat,
    stimuli_stat: RunningStat,
    signal_stat: RunningStat,
}

impl AnalogNeuron {
    /// Create a fresh unit with zeroed state
    pub fn new(bias: f64, retainment: f64, activation: Activation) -> Self {
        Self {
            bias,
            retainment,
            activation,
            state: 0.0,
            previous_state: 0.0,
            signal: 0.0,
            stored_signal: 0.0,
            state_stat: RunningStat::new(),
            stimuli_stat: RunningStat::new(),
            signal_stat: RunningStat::new(),
        }
    }

    /// Snapshot state and signal ahead of the synchronous update pass.
    /// Must run for every neuron in the reservoir before any of them
    /// computes, so the update order within a step cannot matter.
    pub fn store(&mut self) {
        self.previous_state = self.state;
        self.stored_signal = self.signal;
    }

    /// Advance the unit one step given its summed stimulus
    pub fn compute(&mut self, stimulus: f64, collect_statistics: bool) {
        let activated = self.activation.apply(stimulus + self.bias);
        self.state = self.retainment * self.previous_state + (1.0 - self.retainment) * activated;
        let (lo, hi) = self.activation.output_range();
        self.signal = self.state.clamp(lo, hi);
        if collect_statistics {
            self.stimuli_stat.update(stimulus);
            self.state_stat.update(self.state);
            self.signal_stat.update(self.signal);
        }
    }

    /// Return the unit to its initial state, keeping bias and wiring.
    /// Running statistics are cleared only when requested.
    pub fn reset(&mut self, reset_statistics: bool) {
        self.state = 0.0;
        self.previous_state = 0.0;
        self.signal = 0.0;
        self.stored_signal = 0.0;
        if reset_statistics {
            self.state_stat.reset();
            self.stimuli_stat.reset();
            self.signal_stat.reset();
        }
    }

    /// Current state
    #[inline(always)]
    pub fn state(&self) -> f64 {
        self.state
    }

    /// State as of the last snapshot
    #[inline(always)]
    pub fn previous_state(&self) -> f64 {
        self.previous_state
    }

    /// Current output signal
    #[inline(always)]
    pub fn signal(&self) -> f64 {
        self.signal
    }

    /// Signal as of the last snapshot, read by downstream consumers
    #[inline(always)]
    pub fn stored_signal(&self) -> f64 {
        self.stored_signal
    }

    /// Running statistics over the states
    #[inline(always)]
    pub fn state_stat(&self) -> &RunningStat {
        &self.state_stat
    }

    /// Running statistics over the stimuli
    #[inline(always)]
    pub fn stimuli_stat(&self) -> &RunningStat {
        &self.stimuli_stat
    }

    /// Running statistics over the output signals
    #[inline(always)]
    pub fn signal_stat(&self) -> &RunningStat {
        &self.signal_stat
    }
}
