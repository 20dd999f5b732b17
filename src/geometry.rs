//! Area and boundary geometry of the study region.
//!
//! The region is the lat/lon box spanned by the grid's south-west and
//! north-east corners. Edge correction works in the Cartesian x/y plane:
//! the region is approximated by the axis-aligned box between the two
//! projected corners, and a point's circular search neighbourhood by the
//! square of side `2 * radius` around it. Square-in-box overlap is an
//! approximation of circle-in-region overlap and is kept as such because
//! published K scores depend on it.

use log::debug;

use crate::models::Grid;
use crate::projection::{self, Cartesian};

/// Projected bounds of a grid, computed once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudyRegion {
    pub south_west: (f64, f64),
    pub north_east: (f64, f64),
    sw: Cartesian,
    ne: Cartesian,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl StudyRegion {
    pub fn from_grid(grid: &Grid) -> Self {
        let south_west = grid.south_west();
        let north_east = grid.north_east();
        let sw = projection::to_cartesian(south_west.0, south_west.1);
        let ne = projection::to_cartesian(north_east.0, north_east.1);
        StudyRegion {
            south_west,
            north_east,
            sw,
            ne,
            x_range: (sw.x.min(ne.x), sw.x.max(ne.x)),
            y_range: (sw.y.min(ne.y), sw.y.max(ne.y)),
        }
    }

    /// Approximate surface area in km².
    ///
    /// Southern edge length times western edge length, shrunk for meridian
    /// convergence by half the relative difference between the Cartesian
    /// x extents of the southern and northern edges.
    pub fn area(&self) -> f64 {
        let (latmin, lonmin) = self.south_west;
        let (latmax, lonmax) = self.north_east;

        let width = projection::great_circle_km((latmin, lonmin), (latmin, lonmax));
        let height = projection::great_circle_km((latmin, lonmin), (latmax, lonmin));
        let rectangle = width * height;

        let south = (projection::to_cartesian(latmin, lonmin).x
            - projection::to_cartesian(latmin, lonmax).x)
            .abs();
        let north = (projection::to_cartesian(latmax, lonmin).x
            - projection::to_cartesian(latmax, lonmax).x)
            .abs();
        let (longer, shorter) = if south >= north { (south, north) } else { (north, south) };

        if longer <= 0.0 {
            debug!("study region has no x extent, skipping trapezoid correction");
            return rectangle;
        }
        rectangle * (1.0 - 0.5 * (longer - shorter) / longer)
    }

    /// Share of the square neighbourhood of `point` that falls inside the
    /// region, in [0, 1]. Points farther than `radius` from every edge get 1.
    pub fn boundary_overlap_ratio(&self, point: &Cartesian, radius: f64) -> f64 {
        let near_edge = (point.x - self.sw.x).abs() < radius
            || (self.ne.x - point.x).abs() < radius
            || (point.y - self.sw.y).abs() < radius
            || (self.ne.y - point.y).abs() < radius;
        if !near_edge {
            return 1.0;
        }

        let overlap_x = overlap(self.x_range, (point.x - radius, point.x + radius));
        let overlap_y = overlap(self.y_range, (point.y - radius, point.y + radius));
        let square = (2.0 * radius) * (2.0 * radius);
        if square <= 0.0 {
            return 1.0;
        }
        (overlap_x * overlap_y / square).clamp(0.0, 1.0)
    }
}

fn overlap(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.1.min(b.1) - a.0.max(b.0)).max(0.0)
}

/// Area of the region spanned by `grid`, in km².
pub fn study_area(grid: &Grid) -> f64 {
    StudyRegion::from_grid(grid).area()
}
