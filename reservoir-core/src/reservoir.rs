//! The reservoir engine: construction pipeline and synchronous dynamics

use std::cmp::max;

use common::RunningStat;
use nanorand::{Rng, WyRand};

use crate::neuron::AnalogNeuron;
use crate::params::{ReservoirParams, Topology};
use crate::spectral::scale_to_spectral_radius;
use crate::topology::{Connection, Edge, TopologyBuilder};
use crate::weight::sample_weight;
use crate::{ReservoirError, Result};

/// The context neuron: aggregates whole reservoir state into a secondary,
/// one step delayed feedback signal
#[derive(Debug, Clone)]
struct ContextNeuron {
    state: f64,
    /// reservoir to context weights, one per neuron
    input_weights: Vec<f64>,
    /// context to reservoir weights, one per neuron, zero where unwired
    feedback_weights: Vec<f64>,
    state_stat: RunningStat,
}

/// Aggregate view over the per neuron running statistics
#[derive(Debug, Clone)]
pub struct ReservoirStats {
    /// Aggregate over each neuron's maximum absolute state
    pub max_abs_states: RunningStat,
    /// Aggregate over each neuron's state RMS
    pub state_rmses: RunningStat,
    /// Aggregate over each neuron's state span
    pub state_spans: RunningStat,
    /// RMS of the context neuron state, when one exists
    pub context_state_rms: Option<f64>,
}

/// The analog reservoir: a fixed, randomly wired recurrent network of
/// analog units driven step by step as a nonlinear feature extractor
#[derive(Debug, Clone)]
pub struct Reservoir {
    params: ReservoirParams,
    neurons: Vec<AnalogNeuron>,
    /// connection tables indexed by target neuron
    input_connections: Vec<Vec<Connection>>,
    recurrent_connections: Vec<Vec<Connection>>,
    feedback_connections: Vec<Vec<Connection>>,
    context: Option<ContextNeuron>,
    /// externally supplied feedback values, read on the next compute call
    feedback: Vec<f64>,
    /// snapshot of every neuron's state taken before the update pass
    prev_states: Vec<f64>,
    num_workers: usize,
}

impl Reservoir {
    /// Build a ready reservoir from the given parameters.
    /// Construction either fully succeeds or fails outright, there is no
    /// partial reservoir state.
    pub fn new(params: ReservoirParams) -> Result<Self> {
        params.validate()?;
        let mut rng = match params.seed {
            Some(seed) => WyRand::new_seed(seed),
            None => WyRand::new(),
        };
        let n = params.size;

        let mut builder = TopologyBuilder::new(&mut rng);
        let internal_edges = match params.topology {
            Topology::Random { density } => builder.random(n, density, &params.internal_weights)?,
            Topology::Ring {
                bidirectional,
                self_density,
                inter_density,
            } => builder.ring(
                n,
                bidirectional,
                self_density,
                inter_density,
                &params.internal_weights,
            )?,
            Topology::Dtt { self_density } => {
                builder.dtt(n, self_density, &params.internal_weights)?
            }
        };
        let input_edges =
            builder.guaranteed(n, params.num_inputs, params.input_density, &params.input_weights)?;
        let feedback_edges = builder.guaranteed(
            n,
            params.num_feedback,
            params.feedback_density,
            &params.feedback_weights,
        )?;
        let context_feedback_edges = match &params.context {
            Some(context) => {
                builder.guaranteed(n, 1, context.feedback_density, &context.feedback_weights)?
            }
            None => Vec::new(),
        };
        debug!(
            "wired reservoir: {} internal, {} input, {} feedback connections",
            internal_edges.len(),
            input_edges.len(),
            feedback_edges.len()
        );

        let mut recurrent_connections = group_by_target(&internal_edges, n);
        let input_connections = group_by_target(&input_edges, n);
        let feedback_connections = group_by_target(&feedback_edges, n);

        let mut context = match &params.context {
            Some(context_params) => {
                let input_weights: Vec<f64> = (0..n)
                    .map(|_| sample_weight(&context_params.input_weights, &mut rng))
                    .collect();
                let mut feedback_weights = vec![0.0; n];
                for edge in &context_feedback_edges {
                    feedback_weights[edge.target] = edge.weight;
                }
                Some(ContextNeuron {
                    state: 0.0,
                    input_weights,
                    feedback_weights,
                    state_stat: RunningStat::new(),
                })
            }
            None => None,
        };

        // a density selected subset of neurons retains part of its state
        let mut retainment_rates = vec![0.0; n];
        let num_retaining = ((n as f64 * params.retainment.density).round() as usize).min(n);
        let mut order: Vec<usize> = (0..n).collect();
        for i in 0..num_retaining {
            let j = i + rng.generate_range(0..n - i);
            order.swap(i, j);
            retainment_rates[order[i]] = params.retainment.min_rate
                + rng.generate::<f64>() * (params.retainment.max_rate - params.retainment.min_rate);
        }

        let neurons: Vec<AnalogNeuron> = retainment_rates
            .iter()
            .map(|rate| {
                AnalogNeuron::new(
                    sample_weight(&params.bias_weights, &mut rng),
                    *rate,
                    params.activation,
                )
            })
            .collect();

        if let Some(target) = params.spectral_radius {
            let context_weights = context
                .as_mut()
                .map(|c| (&mut c.input_weights, &mut c.feedback_weights));
            scale_to_spectral_radius(&mut recurrent_connections, context_weights, target)?;
        }

        let num_workers = max(num_cpus::get().saturating_sub(2), 1).min(n);
        let num_feedback = params.num_feedback;

        Ok(Self {
            params,
            neurons,
            input_connections,
            recurrent_connections,
            feedback_connections,
            context,
            feedback: vec![0.0; num_feedback],
            prev_states: vec![0.0; n],
            num_workers,
        })
    }

    /// Advance every neuron one synchronous step.
    /// Each neuron reads only the previous step's snapshot and the static
    /// connection tables and writes exclusively its own state slot, so the
    /// per neuron updates run on parallel workers without locking.
    pub fn compute(&mut self, input: &[f64], collect_statistics: bool) -> Result<()> {
        if input.len() != self.params.num_inputs {
            return Err(ReservoirError::LengthMismatch {
                what: "input",
                expected: self.params.num_inputs,
                actual: input.len(),
            });
        }

        // store before update barrier
        for (prev, neuron) in self.prev_states.iter_mut().zip(self.neurons.iter_mut()) {
            neuron.store();
            *prev = neuron.previous_state();
        }

        let prev_states = &self.prev_states;
        let input_connections = &self.input_connections;
        let recurrent_connections = &self.recurrent_connections;
        let feedback_connections = &self.feedback_connections;
        let feedback = &self.feedback;
        let context_feedback = self
            .context
            .as_ref()
            .map(|c| (c.state, c.feedback_weights.as_slice()));

        let chunk_size = (self.neurons.len() + self.num_workers - 1) / self.num_workers;
        crossbeam::thread::scope(|scope| {
            for (chunk_idx, chunk) in self.neurons.chunks_mut(chunk_size).enumerate() {
                scope.spawn(move |_| {
                    for (offset, neuron) in chunk.iter_mut().enumerate() {
                        let i = chunk_idx * chunk_size + offset;
                        let mut stimulus = 0.0;
                        for c in &input_connections[i] {
                            stimulus += c.weight * input[c.source];
                        }
                        for c in &recurrent_connections[i] {
                            stimulus += c.weight * prev_states[c.source];
                        }
                        if let Some((context_state, weights)) = context_feedback {
                            stimulus += weights[i] * context_state;
                        }
                        for c in &feedback_connections[i] {
                            stimulus += c.weight * feedback[c.source];
                        }
                        neuron.compute(stimulus, collect_statistics);
                    }
                });
            }
        })
        .unwrap();

        // reads this step's fresh states, so it must stay behind the join
        if let Some(context) = &mut self.context {
            context.state = context
                .input_weights
                .iter()
                .zip(self.neurons.iter())
                .map(|(weight, neuron)| weight * neuron.state())
                .sum();
            if collect_statistics {
                context.state_stat.update(context.state);
            }
        }
        Ok(())
    }

    /// Store externally supplied feedback values, e.g. previous or desired
    /// outputs for teacher forcing, read as feedback sources on the next
    /// compute call
    pub fn set_feedback(&mut self, feedback: &[f64]) -> Result<()> {
        if feedback.len() != self.feedback.len() {
            return Err(ReservoirError::LengthMismatch {
                what: "feedback",
                expected: self.feedback.len(),
                actual: feedback.len(),
            });
        }
        self.feedback.copy_from_slice(feedback);
        Ok(())
    }

    /// Write the predictor vector into `buffer` starting at `offset`:
    /// every neuron's state, followed by every squared state when
    /// augmented states are enabled
    pub fn copy_predictors_to(&self, buffer: &mut [f64], offset: usize) -> Result<()> {
        let n = self.neurons.len();
        let needed = offset + self.num_output_predictors();
        if buffer.len() < needed {
            return Err(ReservoirError::LengthMismatch {
                what: "predictor buffer",
                expected: needed,
                actual: buffer.len(),
            });
        }
        for (i, neuron) in self.neurons.iter().enumerate() {
            buffer[offset + i] = neuron.state();
            if self.params.augmented_states {
                buffer[offset + n + i] = neuron.state() * neuron.state();
            }
        }
        Ok(())
    }

    /// Return the reservoir to its freshly constructed state, preserving
    /// topology and weights
    pub fn reset(&mut self, reset_statistics: bool) {
        for neuron in self.neurons.iter_mut() {
            neuron.reset(reset_statistics);
        }
        if let Some(context) = &mut self.context {
            context.state = 0.0;
            if reset_statistics {
                context.state_stat.reset();
            }
        }
        for f in self.feedback.iter_mut() {
            *f = 0.0;
        }
        for p in self.prev_states.iter_mut() {
            *p = 0.0;
        }
    }

    /// Aggregate the per neuron running statistics
    pub fn collect_statistics(&self) -> ReservoirStats {
        let mut max_abs_states = RunningStat::new();
        let mut state_rmses = RunningStat::new();
        let mut state_spans = RunningStat::new();
        for neuron in &self.neurons {
            let stat = neuron.state_stat();
            max_abs_states.update(stat.max_abs());
            state_rmses.update(stat.rms());
            state_spans.update(stat.span());
        }
        ReservoirStats {
            max_abs_states,
            state_rmses,
            state_spans,
            context_state_rms: self.context.as_ref().map(|c| c.state_stat.rms()),
        }
    }

    /// Number of neurons
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.neurons.len()
    }

    /// Number of values a predictor copy writes, twice the reservoir size
    /// when augmented states are enabled
    #[inline(always)]
    pub fn num_output_predictors(&self) -> usize {
        if self.params.augmented_states {
            2 * self.neurons.len()
        } else {
            self.neurons.len()
        }
    }

    /// The parameters the reservoir was built from
    #[inline(always)]
    pub fn params(&self) -> &ReservoirParams {
        &self.params
    }
}

fn group_by_target(edges: &[Edge], n: usize) -> Vec<Vec<Connection>> {
    let mut tables = vec![Vec::new(); n];
    for edge in edges {
        tables[edge.target].push(Connection {
            source: edge.source,
            weight: edge.weight,
        });
    }
    tables
}
