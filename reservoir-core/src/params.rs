use common::Activation;

use crate::{ReservoirError, Result};

/// Shape of a weight distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightShape {
    /// Uniformly distributed within the range
    Uniform,
    /// Gaussian centered on the range midpoint, clipped to the range
    Gaussian,
}

/// Describes the distribution a single connection weight is drawn from
#[derive(Debug, Clone, Copy)]
pub struct WeightDist {
    /// Lower bound of the drawn value
    pub min: f64,
    /// Upper bound of the drawn value
    pub max: f64,
    /// Whether to flip the sign of the drawn value with probability 1/2
    pub random_sign: bool,
    /// The shape of the distribution
    pub shape: WeightShape,
}

impl WeightDist {
    /// A uniform draw from [min, max] with the sign kept as drawn
    pub fn uniform(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            random_sign: false,
            shape: WeightShape::Uniform,
        }
    }

    fn validate(&self, what: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(ReservoirError::InvalidConfig(format!(
                "{} weight range [{}, {}] is not a valid interval",
                what, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// The internal wiring family of the reservoir
#[derive(Debug, Clone, Copy)]
pub enum Topology {
    /// Uniformly random directed pairs
    Random {
        /// Fraction of the n² possible pairs to materialize
        density: f64,
    },
    /// Ring lattice with optional bidirectional ring edges plus random
    /// interconnections on top
    Ring {
        /// Whether each neuron also connects to its ring successor
        bidirectional: bool,
        /// Fraction of neurons receiving a self-loop
        self_density: f64,
        /// Fraction of the n² possible pairs added as random interconnections
        inter_density: f64,
    },
    /// Doubly twisted toroid: a single-direction ring plus a vertical twist
    /// edge every ⌊√n⌋ neurons
    Dtt {
        /// Fraction of neurons receiving a self-loop
        self_density: f64,
    },
}

/// Assignment of leak/retainment rates to a subset of neurons.
/// A retaining neuron keeps `rate * previous_state` of its old state each
/// step, acting as an EMA smoothing filter on its own activation.
#[derive(Debug, Clone, Copy)]
pub struct Retainment {
    /// Fraction of neurons that retain part of their previous state
    pub density: f64,
    /// Smallest retainment rate assigned
    pub min_rate: f64,
    /// Largest retainment rate assigned
    pub max_rate: f64,
}

impl Retainment {
    /// No neuron retains anything, the reservoir is purely feed-through
    pub fn none() -> Self {
        Self {
            density: 0.0,
            min_rate: 0.0,
            max_rate: 0.0,
        }
    }
}

/// Configuration of the optional context neuron
#[derive(Debug, Clone, Copy)]
pub struct ContextParams {
    /// Distribution of the reservoir to context weights
    pub input_weights: WeightDist,
    /// Distribution of the context to reservoir weights
    pub feedback_weights: WeightDist,
    /// Fraction of neurons receiving the context feedback signal
    pub feedback_density: f64,
}

/// The parameters of the analog reservoir
#[derive(Debug, Clone)]
pub struct ReservoirParams {
    /// Number of neurons in the reservoir
    pub size: usize,
    /// Number of external input channels
    pub num_inputs: usize,
    /// Number of external feedback channels
    pub num_feedback: usize,

    /// Internal wiring family
    pub topology: Topology,
    /// Probability of an input channel connecting to a neuron
    pub input_density: f64,
    /// Probability of a feedback channel connecting to a neuron
    pub feedback_density: f64,
    /// Distribution of input connection weights
    pub input_weights: WeightDist,
    /// Distribution of recurrent connection weights
    pub internal_weights: WeightDist,
    /// Distribution of feedback connection weights
    pub feedback_weights: WeightDist,
    /// Distribution of neuron biases
    pub bias_weights: WeightDist,

    /// Activation function of the neurons
    pub activation: Activation,
    /// Retainment assignment over the neuron population
    pub retainment: Retainment,
    /// Optional context neuron, aggregating whole-reservoir state into a
    /// secondary delayed feedback signal
    pub context: Option<ContextParams>,

    /// Target spectral radius of the recurrent weight matrix.
    /// The spectral radius determines how fast the influence of an input
    /// dies out in a reservoir with time, and how stable the reservoir
    /// activations are. It should be greater in tasks requiring longer
    /// memory of the input. `None` leaves the weights unscaled.
    pub spectral_radius: Option<f64>,
    /// Whether squared states are appended to the predictor vector
    pub augmented_states: bool,
    /// Optional seed for the construction Rng
    pub seed: Option<u64>,
}

fn check_unit_interval(what: &str, v: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&v) {
        return Err(ReservoirError::InvalidConfig(format!(
            "{} must be within [0, 1], got {}",
            what, v
        )));
    }
    Ok(())
}

impl ReservoirParams {
    /// Check every configured value against its valid domain
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(ReservoirError::InvalidConfig(
                "reservoir size must be at least 1".to_string(),
            ));
        }
        check_unit_interval("input_density", self.input_density)?;
        check_unit_interval("feedback_density", self.feedback_density)?;
        match self.topology {
            Topology::Random { density } => check_unit_interval("density", density)?,
            Topology::Ring {
                self_density,
                inter_density,
                ..
            } => {
                check_unit_interval("self_density", self_density)?;
                check_unit_interval("inter_density", inter_density)?;
            }
            Topology::Dtt { self_density } => check_unit_interval("self_density", self_density)?,
        }
        check_unit_interval("retainment density", self.retainment.density)?;
        check_unit_interval("retainment min_rate", self.retainment.min_rate)?;
        check_unit_interval("retainment max_rate", self.retainment.max_rate)?;
        if self.retainment.min_rate > self.retainment.max_rate {
            return Err(ReservoirError::InvalidConfig(
                "retainment min_rate exceeds max_rate".to_string(),
            ));
        }
        self.input_weights.validate("input")?;
        self.internal_weights.validate("internal")?;
        self.feedback_weights.validate("feedback")?;
        self.bias_weights.validate("bias")?;
        if let Some(context) = &self.context {
            check_unit_interval("context feedback_density", context.feedback_density)?;
            context.input_weights.validate("context input")?;
            context.feedback_weights.validate("context feedback")?;
        }
        if let Some(rho) = self.spectral_radius {
            if !rho.is_finite() || rho <= 0.0 {
                return Err(ReservoirError::InvalidConfig(format!(
                    "target spectral radius must be positive, got {}",
                    rho
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ReservoirParams {
        ReservoirParams {
            size: 10,
            num_inputs: 1,
            num_feedback: 0,
            topology: Topology::Random { density: 0.1 },
            input_density: 1.0,
            feedback_density: 0.0,
            input_weights: WeightDist::uniform(-1.0, 1.0),
            internal_weights: WeightDist::uniform(-1.0, 1.0),
            feedback_weights: WeightDist::uniform(-1.0, 1.0),
            bias_weights: WeightDist::uniform(-0.1, 0.1),
            activation: Activation::Tanh,
            retainment: Retainment::none(),
            context: None,
            spectral_radius: None,
            augmented_states: false,
            seed: Some(42),
        }
    }

    #[test]
    fn valid_params_pass() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn density_outside_unit_interval_rejected() {
        let mut p = params();
        p.topology = Topology::Random { density: 1.5 };
        assert!(matches!(
            p.validate(),
            Err(ReservoirError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_size_rejected() {
        let mut p = params();
        p.size = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn inverted_weight_range_rejected() {
        let mut p = params();
        p.internal_weights = WeightDist::uniform(1.0, -1.0);
        assert!(p.validate().is_err());
    }

    #[test]
    fn non_positive_spectral_radius_rejected() {
        let mut p = params();
        p.spectral_radius = Some(0.0);
        assert!(p.validate().is_err());
    }
}
