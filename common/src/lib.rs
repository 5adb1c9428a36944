//! This crate provides common funcionality

#![deny(unused_imports, unused_crate_dependencies)]
#![warn(missing_docs)]

mod activation;
mod stats;

pub use activation::Activation;
pub use stats::RunningStat;
