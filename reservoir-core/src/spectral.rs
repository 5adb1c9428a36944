//! Spectral radius normalization of the recurrent weight matrix

use nalgebra::{DMatrix, Normed};

use crate::topology::Connection;
use crate::{ReservoirError, Result};

/// Assemble the dense recurrent matrix, including the context row and
/// column when a context neuron exists, and rescale all recurrent weights
/// so that the maximum eigenvalue magnitude hits `target`.
/// The context tuple is (reservoir to context, context to reservoir).
pub(crate) fn scale_to_spectral_radius(
    recurrent: &mut [Vec<Connection>],
    context: Option<(&mut Vec<f64>, &mut Vec<f64>)>,
    target: f64,
) -> Result<()> {
    let n = recurrent.len();
    let dim = n + usize::from(context.is_some());
    let mut matrix: DMatrix<f64> = DMatrix::zeros(dim, dim);
    for (target_idx, connections) in recurrent.iter().enumerate() {
        for c in connections {
            matrix[(target_idx, c.source)] = c.weight;
        }
    }
    if let Some((input_weights, feedback_weights)) = &context {
        for (i, w) in input_weights.iter().enumerate() {
            matrix[(n, i)] = *w;
        }
        for (i, w) in feedback_weights.iter().enumerate() {
            matrix[(i, n)] = *w;
        }
    }

    let spec_rad = max_eigenvalue_magnitude(&matrix);
    debug!("spectral radius before scaling: {}", spec_rad);
    if spec_rad == 0.0 {
        return Err(ReservoirError::DegenerateReservoir);
    }
    let factor = target / spec_rad;
    for connections in recurrent.iter_mut() {
        for c in connections.iter_mut() {
            c.weight *= factor;
        }
    }
    if let Some((input_weights, feedback_weights)) = context {
        for w in input_weights.iter_mut() {
            *w *= factor;
        }
        for w in feedback_weights.iter_mut() {
            *w *= factor;
        }
    }
    Ok(())
}

/// Maximum magnitude over the (possibly complex) eigenvalues of a square
/// real matrix
pub(crate) fn max_eigenvalue_magnitude(matrix: &DMatrix<f64>) -> f64 {
    matrix
        .complex_eigenvalues()
        .iter()
        .map(|ev| ev.norm())
        .fold(0.0, f64::max)
}
