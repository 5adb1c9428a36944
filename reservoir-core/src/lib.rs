#[macro_use]
extern crate log;

mod error;
mod neuron;
mod params;
mod reservoir;
mod spectral;
mod topology;
mod weight;

pub use error::{ReservoirError, Result};
pub use neuron::AnalogNeuron;
pub use params::{
    ContextParams, ReservoirParams, Retainment, Topology, WeightDist, WeightShape,
};
pub use reservoir::{Reservoir, ReservoirStats};
pub use topology::{Connection, Edge, TopologyBuilder};
pub use weight::sample_weight;
