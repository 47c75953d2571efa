//! ═══════════════════════════════════════════════════════════════════════════
//! Approximate Vietoris–Rips persistence
//! ═══════════════════════════════════════════════════════════════════════════
//!
//! Turns a point cloud into a scalar "shape instability" score.
//!
//! Filtration: Euclidean Vietoris–Rips, edges entering at their length.
//!
//!   - H₀ (components): exact, from the Kruskal minimum spanning tree. Every
//!     tree edge kills one component at its length.
//!   - H₁ (loops): approximate. Every non-tree edge (u, v) of length ℓ closes
//!     a cycle born at ℓ. The cycle is taken to die when the first triangle
//!     containing (u, v) enters, at max(ℓ, min_w max(d(u,w), d(v,w))).
//!     Lifetimes of zero are dropped.
//!
//! Amplitude of a diagram: (Σ ((death − birth) / 2)^p)^(1/p), the p-norm of
//! each pair's L∞ distance to the diagonal.
//!
//! All quantities are homogeneous in the cloud's scale: scaling every point
//! by s scales every amplitude by s. A collapsed cloud scores 0.
//! ═══════════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};

use super::projection::ProjectedPoint;

/// Lifetimes at or below this are treated as zero.
const PERSISTENCE_EPSILON: f64 = 1e-12;

/// A (birth, death) pair of a persistence diagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistencePair {
    pub birth: f64,
    pub death: f64,
}

impl PersistencePair {
    pub fn lifetime(&self) -> f64 {
        self.death - self.birth
    }
}

/// Scalar summary of a cloud's shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeSummary {
    /// Amplitude of the H₀ diagram (cloud spread).
    pub h0_amplitude: f64,
    /// Amplitude of the H₁ diagram. This is the shape score.
    pub h1_amplitude: f64,
    /// Number of loops with non-zero lifetime.
    pub h1_features: usize,
    /// Number of points summarized.
    pub points: usize,
}

impl ShapeSummary {
    pub fn score(&self) -> f64 {
        self.h1_amplitude
    }
}

/// Persistence diagrams for dimensions 0 and 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagrams {
    pub h0: Vec<PersistencePair>,
    pub h1: Vec<PersistencePair>,
}

/// Computes [`ShapeSummary`]s from point clouds.
#[derive(Debug, Clone, Copy)]
pub struct TopologicalScorer {
    order: f64,
}

impl Default for TopologicalScorer {
    fn default() -> Self {
        Self { order: 2.0 }
    }
}

impl TopologicalScorer {
    /// `order` is the p of the amplitude norm; values below 1 are raised to 1.
    pub fn new(order: f64) -> Self {
        Self {
            order: if order >= 1.0 { order } else { 1.0 },
        }
    }

    /// Shape score of the cloud (H₁ amplitude).
    pub fn score(&self, points: &[ProjectedPoint]) -> f64 {
        self.summarize(points).h1_amplitude
    }

    pub fn summarize(&self, points: &[ProjectedPoint]) -> ShapeSummary {
        let diagrams = diagrams(points);
        ShapeSummary {
            h0_amplitude: amplitude(&diagrams.h0, self.order),
            h1_amplitude: amplitude(&diagrams.h1, self.order),
            h1_features: diagrams.h1.len(),
            points: points.len(),
        }
    }
}

/// Compute H₀ (exact) and H₁ (approximate) diagrams.
///
/// H₀ omits the essential class that never dies.
pub fn diagrams(points: &[ProjectedPoint]) -> Diagrams {
    let n = points.len();
    if n < 2 {
        return Diagrams::default();
    }

    let mut dist = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = points[i].distance(&points[j]);
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }

    let mut edges: Vec<(f64, usize, usize)> = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            edges.push((dist[i * n + j], i, j));
        }
    }
    edges.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut components = DisjointSet::new(n);
    let mut h0 = Vec::with_capacity(n - 1);
    let mut h1 = Vec::new();

    for &(len, u, v) in &edges {
        if components.union(u, v) {
            h0.push(PersistencePair {
                birth: 0.0,
                death: len,
            });
            continue;
        }

        let filled_at = (0..n)
            .filter(|&w| w != u && w != v)
            .map(|w| dist[u * n + w].max(dist[v * n + w]))
            .fold(f64::INFINITY, f64::min)
            .max(len);

        if filled_at.is_finite() && filled_at - len > PERSISTENCE_EPSILON {
            h1.push(PersistencePair {
                birth: len,
                death: filled_at,
            });
        }
    }

    Diagrams { h0, h1 }
}

/// p-norm of the pairs' L∞ distances to the diagonal.
pub fn amplitude(diagram: &[PersistencePair], order: f64) -> f64 {
    let sum: f64 = diagram
        .iter()
        .map(|pair| (pair.lifetime().max(0.0) / 2.0).powf(order))
        .sum();
    sum.powf(1.0 / order)
}

/// Union-find with path halving and union by size.
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`; false when already joined.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(n: usize, radius: f64) -> Vec<ProjectedPoint> {
        (0..n)
            .map(|i| {
                let theta = std::f64::consts::TAU * i as f64 / n as f64;
                ProjectedPoint::new(vec![radius * theta.cos(), radius * theta.sin(), 0.0])
            })
            .collect()
    }

    fn scale(points: &[ProjectedPoint], s: f64) -> Vec<ProjectedPoint> {
        points
            .iter()
            .map(|p| ProjectedPoint::new(p.coords.iter().map(|c| c * s).collect()))
            .collect()
    }

    #[test]
    fn test_small_clouds_are_empty() {
        assert_eq!(diagrams(&[]), Diagrams::default());
        assert_eq!(diagrams(&ring(1, 1.0)), Diagrams::default());
    }

    #[test]
    fn test_h0_has_n_minus_one_pairs() {
        let d = diagrams(&ring(12, 1.0));
        assert_eq!(d.h0.len(), 11);
        assert!(d.h0.iter().all(|p| p.birth == 0.0 && p.death > 0.0));
    }

    #[test]
    fn test_collapsed_cloud_scores_zero() {
        let cloud = vec![ProjectedPoint::new(vec![1.0, 2.0, 3.0]); 30];
        let summary = TopologicalScorer::default().summarize(&cloud);
        assert_eq!(summary.h1_amplitude, 0.0);
        assert_eq!(summary.h0_amplitude, 0.0);
        assert_eq!(summary.h1_features, 0);
        assert_eq!(summary.points, 30);
    }

    #[test]
    fn test_ring_has_a_loop() {
        let summary = TopologicalScorer::default().summarize(&ring(24, 1.0));
        assert!(summary.h1_features >= 1);
        assert!(summary.h1_amplitude > 0.0);
    }

    #[test]
    fn test_score_is_homogeneous_in_scale() {
        let scorer = TopologicalScorer::default();
        let base = ring(20, 1.0);
        let small = scorer.score(&base);
        let large = scorer.score(&scale(&base, 3.0));
        assert!((large - 3.0 * small).abs() < 1e-9 * large.max(1.0));
        assert!(large > small);
    }

    #[test]
    fn test_amplitude_norm() {
        let diagram = [
            PersistencePair {
                birth: 0.0,
                death: 6.0,
            },
            PersistencePair {
                birth: 1.0,
                death: 9.0,
            },
        ];
        // Distances to diagonal: 3 and 4.
        assert!((amplitude(&diagram, 2.0) - 5.0).abs() < 1e-12);
        assert!((amplitude(&diagram, 1.0) - 7.0).abs() < 1e-12);
        assert_eq!(amplitude(&[], 2.0), 0.0);
    }

    #[test]
    fn test_order_floor() {
        let scorer = TopologicalScorer::new(0.2);
        let cloud = ring(10, 1.0);
        assert_eq!(scorer.score(&cloud), TopologicalScorer::new(1.0).score(&cloud));
    }

    #[test]
    fn test_disjoint_set() {
        let mut ds = DisjointSet::new(4);
        assert!(ds.union(0, 1));
        assert!(ds.union(2, 3));
        assert!(!ds.union(1, 0));
        assert!(ds.union(1, 3));
        assert_eq!(ds.find(0), ds.find(2));
    }
}
