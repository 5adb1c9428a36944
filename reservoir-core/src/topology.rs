//! Construction of the directed connection topology

use std::cmp::max;

use nanorand::{Rng, WyRand};

use crate::params::WeightDist;
use crate::weight::sample_weight;
use crate::{ReservoirError, Result};

/// A directed weighted connection between two entity arrays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Index into the array the signal comes from
    pub source: usize,
    /// Index of the neuron the signal feeds into
    pub target: usize,
    /// Connection weight
    pub weight: f64,
}

/// A weighted source entry in a per-neuron connection table
#[derive(Debug, Clone, Copy)]
pub struct Connection {
    /// Index into the source array the table refers to
    pub source: usize,
    /// Connection weight
    pub weight: f64,
}

/// Builds the directed edge sets of the supported wiring families.
/// Holds the single construction Rng, which is never touched once the
/// reservoir is running.
pub struct TopologyBuilder<'a> {
    rng: &'a mut WyRand,
}

impl<'a> TopologyBuilder<'a> {
    /// Create a builder drawing from the given construction Rng
    pub fn new(rng: &'a mut WyRand) -> Self {
        Self { rng }
    }

    /// Uniformly random wiring: `round(n² · density)` distinct
    /// (source, target) pairs chosen without replacement
    pub fn random(&mut self, n: usize, density: f64, dist: &WeightDist) -> Result<Vec<Edge>> {
        let num_edges = (((n * n) as f64 * density).round() as usize).min(n * n);
        let mut pairs: Vec<usize> = (0..n * n).collect();
        let mut edges = Vec::with_capacity(num_edges);
        // partial Fisher-Yates over all n² pair indices
        for i in 0..num_edges {
            let j = i + self.rng.generate_range(0..pairs.len() - i);
            pairs.swap(i, j);
            edges.push(Edge {
                source: pairs[i] / n,
                target: pairs[i] % n,
                weight: sample_weight(dist, self.rng),
            });
        }
        Ok(edges)
    }

    /// Ring lattice: an edge from every neuron's ring predecessor, the
    /// successor edge when bidirectional, plus self-loops and random
    /// interconnections governed by their densities
    pub fn ring(
        &mut self,
        n: usize,
        bidirectional: bool,
        self_density: f64,
        inter_density: f64,
        dist: &WeightDist,
    ) -> Result<Vec<Edge>> {
        let mut occupied = vec![false; n * n];
        let mut edges = Vec::new();
        for target in 0..n {
            let pred = (target + n - 1) % n;
            self.place(pred, target, n, dist, &mut occupied, &mut edges);
        }
        if bidirectional {
            for target in 0..n {
                let succ = (target + 1) % n;
                self.place(succ, target, n, dist, &mut occupied, &mut edges);
            }
        }
        self.add_self_loops(n, self_density, dist, &mut occupied, &mut edges);
        self.add_interconnections(n, inter_density, dist, &mut occupied, &mut edges)?;
        Ok(edges)
    }

    /// Doubly twisted toroidal wiring: a single-direction ring (the
    /// horizontal twist) plus a vertical twist edge from every neuron i to
    /// (i + ⌊√n⌋) mod n, plus self-loops governed by their density
    pub fn dtt(&mut self, n: usize, self_density: f64, dist: &WeightDist) -> Result<Vec<Edge>> {
        let mut occupied = vec![false; n * n];
        let mut edges = Vec::new();
        for target in 0..n {
            let pred = (target + n - 1) % n;
            self.place(pred, target, n, dist, &mut occupied, &mut edges);
        }
        let step = (n as f64).sqrt().floor() as usize;
        for source in 0..n {
            let target = (source + step) % n;
            self.place(source, target, n, dist, &mut occupied, &mut edges);
        }
        self.add_self_loops(n, self_density, dist, &mut occupied, &mut edges);
        Ok(edges)
    }

    /// Wiring between an external source array and the neuron array.
    /// Guarantees each source at least `max(1, round(num_targets · density))`
    /// connections while hitting the ideal total of
    /// `round(num_targets · num_sources · density)`, the shortfall handed
    /// out round-robin over sources and targets assigned from a rotating
    /// cursor with wraparound.
    pub fn guaranteed(
        &mut self,
        num_targets: usize,
        num_sources: usize,
        density: f64,
        dist: &WeightDist,
    ) -> Result<Vec<Edge>> {
        if num_sources == 0 || num_targets == 0 {
            return Ok(Vec::new());
        }
        let density = density.clamp(0.0, 1.0);
        let ideal_total = (num_targets as f64 * num_sources as f64 * density).round() as usize;
        let min_per_source = max(1, (num_targets as f64 * density).round() as usize);
        let mut planned = vec![min_per_source.min(num_targets); num_sources];
        let mut total: usize = planned.iter().sum();
        let mut s = 0;
        while total < ideal_total {
            if planned.iter().all(|c| *c >= num_targets) {
                break;
            }
            if planned[s] < num_targets {
                planned[s] += 1;
                total += 1;
            }
            s = (s + 1) % num_sources;
        }

        let mut occupied = vec![false; num_sources * num_targets];
        let mut edges = Vec::with_capacity(total);
        let mut cursor = 0;
        for (source, count) in planned.iter().enumerate() {
            let mut placed = 0;
            for offset in 0..num_targets {
                if placed == *count {
                    break;
                }
                let target = (cursor + offset) % num_targets;
                if !occupied[source * num_targets + target] {
                    occupied[source * num_targets + target] = true;
                    edges.push(Edge {
                        source,
                        target,
                        weight: sample_weight(dist, self.rng),
                    });
                    placed += 1;
                }
            }
            if placed < *count {
                return Err(ReservoirError::PlacementExhausted {
                    requested: *count - placed,
                    available: 0,
                });
            }
            cursor = (cursor + *count) % num_targets;
        }
        Ok(edges)
    }

    fn place(
        &mut self,
        source: usize,
        target: usize,
        n: usize,
        dist: &WeightDist,
        occupied: &mut [bool],
        edges: &mut Vec<Edge>,
    ) {
        if occupied[source * n + target] {
            return;
        }
        occupied[source * n + target] = true;
        edges.push(Edge {
            source,
            target,
            weight: sample_weight(dist, self.rng),
        });
    }

    /// Self-loops on a uniformly chosen subset of `round(n · density)` neurons
    fn add_self_loops(
        &mut self,
        n: usize,
        density: f64,
        dist: &WeightDist,
        occupied: &mut [bool],
        edges: &mut Vec<Edge>,
    ) {
        let num_loops = (n as f64 * density).round() as usize;
        let mut neurons: Vec<usize> = (0..n).collect();
        for i in 0..num_loops.min(n) {
            let j = i + self.rng.generate_range(0..n - i);
            neurons.swap(i, j);
            self.place(neurons[i], neurons[i], n, dist, occupied, edges);
        }
    }

    /// `round(n² · density)` additional random non-self edges avoiding
    /// duplicates of anything already placed
    fn add_interconnections(
        &mut self,
        n: usize,
        density: f64,
        dist: &WeightDist,
        occupied: &mut [bool],
        edges: &mut Vec<Edge>,
    ) -> Result<()> {
        let num_edges = ((n * n) as f64 * density).round() as usize;
        if num_edges == 0 {
            return Ok(());
        }
        let mut candidates: Vec<usize> = (0..n * n)
            .filter(|pair| pair / n != pair % n && !occupied[*pair])
            .collect();
        if num_edges > candidates.len() {
            return Err(ReservoirError::PlacementExhausted {
                requested: num_edges,
                available: candidates.len(),
            });
        }
        for i in 0..num_edges {
            let j = i + self.rng.generate_range(0..candidates.len() - i);
            candidates.swap(i, j);
            self.place(candidates[i] / n, candidates[i] % n, n, dist, occupied, edges);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::WeightDist;

    fn dist() -> WeightDist {
        WeightDist::uniform(-1.0, 1.0)
    }

    fn assert_distinct(edges: &[Edge]) {
        for (i, a) in edges.iter().enumerate() {
            for b in edges.iter().skip(i + 1) {
                assert!(
                    a.source != b.source || a.target != b.target,
                    "duplicate pair ({}, {})",
                    a.source,
                    a.target
                );
            }
        }
    }

    #[test]
    fn random_edge_count_matches_density() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        let edges = builder.random(10, 0.1, &dist()).unwrap();
        assert_eq!(edges.len(), 10);
        assert_distinct(&edges);

        let edges = builder.random(7, 0.33, &dist()).unwrap();
        assert_eq!(edges.len(), (49.0f64 * 0.33).round() as usize);
        assert_distinct(&edges);
    }

    #[test]
    fn random_is_deterministic_given_seed() {
        let mut a = WyRand::new_seed(9);
        let mut b = WyRand::new_seed(9);
        let edges_a = TopologyBuilder::new(&mut a).random(20, 0.2, &dist()).unwrap();
        let edges_b = TopologyBuilder::new(&mut b).random(20, 0.2, &dist()).unwrap();
        assert_eq!(edges_a, edges_b);
    }

    #[test]
    fn bidirectional_ring_has_two_n_ring_edges() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        let n = 10;
        let edges = builder.ring(n, true, 0.0, 0.0, &dist()).unwrap();
        assert_eq!(edges.len(), 2 * n);
        assert_distinct(&edges);
        for target in 0..n {
            let pred = (target + n - 1) % n;
            let succ = (target + 1) % n;
            assert!(edges.iter().any(|e| e.source == pred && e.target == target));
            assert!(edges.iter().any(|e| e.source == succ && e.target == target));
        }
    }

    #[test]
    fn ring_self_loop_count_matches_density() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        let edges = builder.ring(10, false, 0.5, 0.0, &dist()).unwrap();
        let num_loops = edges.iter().filter(|e| e.source == e.target).count();
        assert_eq!(num_loops, 5);
        assert_eq!(edges.len(), 10 + 5);
    }

    #[test]
    fn ring_interconnections_added_on_top() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        let n = 10;
        let edges = builder.ring(n, true, 0.0, 0.1, &dist()).unwrap();
        assert_eq!(edges.len(), 2 * n + 10);
        assert_distinct(&edges);
    }

    #[test]
    fn ring_interconnections_exhaust_free_pairs() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        // 3 neurons: all 6 off-diagonal pairs taken by the ring itself
        let result = builder.ring(3, true, 0.0, 1.0, &dist());
        assert!(matches!(
            result,
            Err(ReservoirError::PlacementExhausted { .. })
        ));
    }

    #[test]
    fn dtt_vertical_twist_wraps() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        let n = 9;
        let edges = builder.dtt(n, 0.0, &dist()).unwrap();
        // 9 ring edges plus 9 vertical twist edges at step 3
        assert_eq!(edges.len(), 2 * n);
        assert_distinct(&edges);
        for source in 0..n {
            let target = (source + 3) % n;
            assert!(
                edges.iter().any(|e| e.source == source && e.target == target),
                "missing vertical edge {} -> {}",
                source,
                target
            );
        }
    }

    #[test]
    fn dtt_self_loops() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        let edges = builder.dtt(16, 1.0, &dist()).unwrap();
        let num_loops = edges.iter().filter(|e| e.source == e.target).count();
        assert_eq!(num_loops, 16);
    }

    #[test]
    fn guaranteed_minimum_per_source() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        let edges = builder.guaranteed(10, 3, 0.5, &dist()).unwrap();
        assert_eq!(edges.len(), 15);
        assert_distinct(&edges);
        for source in 0..3 {
            let fan_out = edges.iter().filter(|e| e.source == source).count();
            assert!(fan_out >= 5, "source {} has fan-out {}", source, fan_out);
        }
    }

    #[test]
    fn guaranteed_full_density_hits_every_target() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        let edges = builder.guaranteed(10, 1, 1.0, &dist()).unwrap();
        assert_eq!(edges.len(), 10);
        let mut targets: Vec<usize> = edges.iter().map(|e| e.target).collect();
        targets.sort_unstable();
        assert_eq!(targets, (0..10).collect::<Vec<usize>>());
    }

    #[test]
    fn guaranteed_low_density_still_connects_every_source() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        let edges = builder.guaranteed(10, 4, 0.0, &dist()).unwrap();
        // ideal total is 0 but the per-source guarantee wins
        assert_eq!(edges.len(), 4);
        for source in 0..4 {
            assert_eq!(edges.iter().filter(|e| e.source == source).count(), 1);
        }
    }

    #[test]
    fn guaranteed_clamps_density() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        let edges = builder.guaranteed(5, 2, 3.0, &dist()).unwrap();
        assert_eq!(edges.len(), 10);
        assert_distinct(&edges);
    }

    #[test]
    fn guaranteed_no_sources_yields_no_edges() {
        let mut rng = WyRand::new_seed(42);
        let mut builder = TopologyBuilder::new(&mut rng);
        assert!(builder.guaranteed(10, 0, 0.5, &dist()).unwrap().is_empty());
    }
}
