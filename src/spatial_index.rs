//! Static 3-d KD-tree for fixed-radius neighbour counting.
//!
//! ## Layout
//!
//! The tree is stored implicitly in a single permuted point buffer: for any
//! subslice, the median element (index `len / 2`) is the node, the elements
//! before it form the left subtree and the elements after it the right one.
//! Construction partitions each level around its median with
//! `select_nth_unstable_by`, cycling the split axis x → y → z.
//!
//! ## Invariants
//!
//! * Left-subtree coordinates on the split axis are `<=` the node's,
//!   right-subtree coordinates are `>=`.
//! * The tree is never mutated after construction, so it can be queried from
//!   many threads at once.

use std::cmp::Ordering;

use crate::projection::Cartesian;

const DIMENSIONS: usize = 3;

#[derive(Debug, Clone)]
pub struct KdTree {
    points: Vec<Cartesian>,
}

impl KdTree {
    pub fn build(points: &[Cartesian]) -> Self {
        let mut points = points.to_vec();
        build_recursive(&mut points, 0);
        KdTree { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of indexed points at distance `<= radius` from `center`,
    /// including a point equal to `center` itself.
    pub fn count_within(&self, center: &Cartesian, radius: f64) -> usize {
        count_recursive(&self.points, center, radius, radius * radius, 0)
    }
}

fn build_recursive(points: &mut [Cartesian], depth: usize) {
    if points.len() <= 1 {
        return;
    }
    let axis = depth % DIMENSIONS;
    let mid = points.len() / 2;
    points.select_nth_unstable_by(mid, |a, b| {
        a.coord(axis)
            .partial_cmp(&b.coord(axis))
            .unwrap_or(Ordering::Equal)
    });

    let (left, right) = points.split_at_mut(mid);
    build_recursive(left, depth + 1);
    build_recursive(&mut right[1..], depth + 1);
}

fn count_recursive(
    points: &[Cartesian],
    center: &Cartesian,
    radius: f64,
    radius_sq: f64,
    depth: usize,
) -> usize {
    if points.is_empty() {
        return 0;
    }
    let axis = depth % DIMENSIONS;
    let mid = points.len() / 2;
    let node = &points[mid];

    let mut count = usize::from(node.distance_squared(center) <= radius_sq);
    let split = node.coord(axis);
    let c = center.coord(axis);

    if c - radius <= split {
        count += count_recursive(&points[..mid], center, radius, radius_sq, depth + 1);
    }
    if c + radius >= split {
        count += count_recursive(&points[mid + 1..], center, radius, radius_sq, depth + 1);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn brute_force(points: &[Cartesian], center: &Cartesian, radius: f64) -> usize {
        points
            .iter()
            .filter(|p| p.distance_squared(center) <= radius * radius)
            .count()
    }

    #[test]
    fn matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let points: Vec<Cartesian> = (0..500)
            .map(|_| {
                Cartesian::new(
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                    rng.gen_range(0.0..10.0),
                )
            })
            .collect();
        let tree = KdTree::build(&points);
        assert_eq!(tree.len(), 500);

        for p in points.iter().take(50) {
            for radius in [0.5, 1.0, 3.0] {
                assert_eq!(tree.count_within(p, radius), brute_force(&points, p, radius));
            }
        }
    }

    #[test]
    fn duplicate_points_are_all_counted() {
        let p = Cartesian::new(1.0, 2.0, 3.0);
        let tree = KdTree::build(&vec![p; 100]);
        assert_eq!(tree.count_within(&p, 0.0), 100);
    }

    #[test]
    fn empty_tree() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.count_within(&Cartesian::new(0.0, 0.0, 0.0), 1.0), 0);
    }
}
