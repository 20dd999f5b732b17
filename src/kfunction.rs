//! Ripley's K-function over projected document positions.
//!
//! `K = area * Σ_i c_i / n²`, where `c_i` is the number of other points
//! within the search radius of point `i`, divided by the point's boundary
//! overlap ratio when edge correction is on.

use log::{debug, warn};

use crate::geometry::StudyRegion;
use crate::projection::Cartesian;
use crate::spatial_index::KdTree;

/// Everything a K computation needs besides the points themselves. Fixed
/// for a whole run.
#[derive(Debug, Clone, Copy)]
pub struct KFunction<'a> {
    pub region: &'a StudyRegion,
    /// Search radius as a Cartesian chord length.
    pub radius: f64,
    /// Study-region area in km².
    pub area: f64,
    pub edge_correction: bool,
}

impl<'a> KFunction<'a> {
    pub fn new(region: &'a StudyRegion, radius: f64, area: f64, edge_correction: bool) -> Self {
        KFunction {
            region,
            radius,
            area,
            edge_correction,
        }
    }

    /// K statistic of `points`. Fewer than two points yield 0.0.
    pub fn compute(&self, points: &[Cartesian]) -> f64 {
        let n = points.len();
        if n < 2 {
            warn!("K-function needs at least two points, got {}; using 0", n);
            return 0.0;
        }

        let tree = KdTree::build(points);
        let total: f64 = points
            .iter()
            .map(|p| {
                let neighbours = tree.count_within(p, self.radius).saturating_sub(1) as f64;
                neighbours * self.edge_multiplier(p)
            })
            .sum();

        self.area * total / (n * n) as f64
    }

    fn edge_multiplier(&self, point: &Cartesian) -> f64 {
        if !self.edge_correction {
            return 1.0;
        }
        let ratio = self.region.boundary_overlap_ratio(point, self.radius);
        if ratio <= 0.0 {
            debug!(
                "search square around ({:.3}, {:.3}, {:.3}) misses the study region, not correcting",
                point.x, point.y, point.z
            );
            return 1.0;
        }
        1.0 / ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grid, GridCell};
    use crate::projection::{destination, to_cartesian, BEARING_EAST};
    use approx::assert_abs_diff_eq;

    fn region() -> StudyRegion {
        let grid = Grid::new(vec![GridCell {
            id: 0,
            latmin: 40.0,
            lonmin: 29.0,
            latmax: 41.0,
            lonmax: 30.0,
        }])
        .unwrap();
        StudyRegion::from_grid(&grid)
    }

    #[test]
    fn separated_points_score_zero() {
        let region = region();
        let k = KFunction::new(&region, 0.5, 1000.0, true);
        let points: Vec<Cartesian> = (0..10)
            .map(|i| to_cartesian(40.1 + 0.05 * i as f64, 29.5))
            .collect();
        assert_eq!(k.compute(&points), 0.0);
    }

    #[test]
    fn fewer_than_two_points_is_zero() {
        let region = region();
        let k = KFunction::new(&region, 0.5, 1000.0, true);
        assert_eq!(k.compute(&[]), 0.0);
        assert_eq!(k.compute(&[to_cartesian(40.5, 29.5)]), 0.0);
    }

    #[test]
    fn interior_pairs_without_correction() {
        let region = region();
        let area = 1000.0;
        let a = (40.5, 29.5);
        let b = destination(a.0, a.1, BEARING_EAST, 0.2);
        let far = (40.8, 29.8);
        let points = vec![
            to_cartesian(a.0, a.1),
            to_cartesian(b.0, b.1),
            to_cartesian(far.0, far.1),
        ];

        // two points see one neighbour each
        let expected = area * 2.0 / 9.0;
        let plain = KFunction::new(&region, 0.5, area, false).compute(&points);
        let corrected = KFunction::new(&region, 0.5, area, true).compute(&points);
        assert_abs_diff_eq!(plain, expected, epsilon = 1e-9);
        assert_abs_diff_eq!(corrected, expected, epsilon = 1e-9);
    }

    #[test]
    fn correction_inflates_corner_counts() {
        let region = region();
        let corner = to_cartesian(40.0, 29.0);
        let points = vec![corner, corner];

        let plain = KFunction::new(&region, 0.5, 1.0, false).compute(&points);
        let corrected = KFunction::new(&region, 0.5, 1.0, true).compute(&points);
        assert_abs_diff_eq!(plain, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(corrected, 2.0, epsilon = 1e-9);
    }
}
