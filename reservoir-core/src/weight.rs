//! Drawing of single connection weights from a distribution description

use nanorand::{Rng, WyRand};

use crate::params::{WeightDist, WeightShape};

/// Draw a single weight from the distribution description.
/// Deterministic given a seeded Rng.
pub fn sample_weight(dist: &WeightDist, rng: &mut WyRand) -> f64 {
    let v = match dist.shape {
        WeightShape::Uniform => dist.min + rng.generate::<f64>() * (dist.max - dist.min),
        WeightShape::Gaussian => {
            let mean = 0.5 * (dist.min + dist.max);
            let sigma = (dist.max - dist.min) / 6.0;
            (mean + sigma * standard_normal(rng)).clamp(dist.min, dist.max)
        }
    };
    if dist.random_sign && rng.generate::<f64>() < 0.5 {
        -v
    } else {
        v
    }
}

/// Standard normal draw via the Box-Muller transform
fn standard_normal(rng: &mut WyRand) -> f64 {
    let u1 = rng.generate::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.generate::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::WeightDist;

    #[test]
    fn uniform_within_range() {
        let mut rng = WyRand::new_seed(1);
        let dist = WeightDist::uniform(0.25, 0.75);
        for _ in 0..1000 {
            let w = sample_weight(&dist, &mut rng);
            assert!((0.25..=0.75).contains(&w));
        }
    }

    #[test]
    fn gaussian_clipped_to_range() {
        let mut rng = WyRand::new_seed(2);
        let dist = WeightDist {
            min: -0.5,
            max: 0.5,
            random_sign: false,
            shape: WeightShape::Gaussian,
        };
        for _ in 0..1000 {
            let w = sample_weight(&dist, &mut rng);
            assert!((-0.5..=0.5).contains(&w));
        }
    }

    #[test]
    fn random_sign_flips_both_ways() {
        let mut rng = WyRand::new_seed(3);
        let dist = WeightDist {
            min: 0.5,
            max: 1.0,
            random_sign: true,
            shape: WeightShape::Uniform,
        };
        let draws: Vec<f64> = (0..200).map(|_| sample_weight(&dist, &mut rng)).collect();
        assert!(draws.iter().any(|w| *w > 0.0));
        assert!(draws.iter().any(|w| *w < 0.0));
        assert!(draws.iter().all(|w| (0.5..=1.0).contains(&w.abs())));
    }

    #[test]
    fn deterministic_given_seed() {
        let dist = WeightDist::uniform(-1.0, 1.0);
        let mut a = WyRand::new_seed(7);
        let mut b = WyRand::new_seed(7);
        for _ in 0..100 {
            assert_eq!(sample_weight(&dist, &mut a), sample_weight(&dist, &mut b));
        }
    }
}
