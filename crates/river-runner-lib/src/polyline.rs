//! Polyline storage module
//!
//! This module provides the `Polyline` struct: one piece of the river path in planar
//! coordinates, with precomputed metadata like its bounding box and cumulative arc lengths.

use crate::{Result, SnapError, utils};
use geo::line_measures::Distance;
use geo::{Closest, ClosestPoint, Coord, Euclidean, Line, LineString, Point, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rounding allowance, in ulps of the largest coordinate, for a point to count as on a segment
const ON_LINE_ULPS: f64 = 8.0;

/// A single polyline of the network with precomputed metadata
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polyline {
    /// Position of this polyline in the network's input sequence
    index: usize,
    /// Planar coordinates
    line: LineString<f64>,
    /// Precomputed axis-aligned bounding box
    bounding_box: Rect<f64>,
    /// Arc length at each vertex (first entry is 0, last is the total length)
    cumulative_lengths: Vec<f64>,
}

/// Result of a nearest-point search against one polyline
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NearestPoint {
    /// Euclidean distance from the query point to the line
    pub distance: f64,
    /// Arc-length position of the nearest location, measured from the first vertex
    pub position: f64,
    /// Index of the segment holding the nearest location
    pub segment: usize,
    /// The nearest location itself; the query point when it lies on the line
    pub location: Coord<f64>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Polyline {
    /// Create a new Polyline
    ///
    /// # Arguments
    /// * `index` - Stable index of the polyline inside its network
    /// * `line` - Planar coordinates, at least 2 of them
    ///
    /// # Returns
    /// The polyline on success, or `InvalidGeometry` if the line is too short or not finite
    pub fn new(index: usize, line: LineString<f64>) -> Result<Self> {
        if line.0.len() < 2 {
            return Err(SnapError::InvalidGeometry(format!(
                "Polyline {index} needs at least 2 coordinates, got {}",
                line.0.len()
            )));
        }
        if let Some(bad) = line.0.iter().find(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(SnapError::InvalidGeometry(format!(
                "Polyline {index} has a non-finite coordinate ({}, {})",
                bad.x, bad.y
            )));
        }

        let bounding_box = utils::bounding_rect_of(line.0.iter().copied())
            .ok_or_else(|| SnapError::InvalidGeometry(format!("Polyline {index} is empty")))?;

        let mut cumulative_lengths = Vec::with_capacity(line.0.len());
        let mut total = 0.0;
        cumulative_lengths.push(total);
        for segment in line.lines() {
            total += Euclidean.distance(&Point::from(segment.start), &Point::from(segment.end));
            cumulative_lengths.push(total);
        }

        Ok(Self {
            index,
            line,
            bounding_box,
            cumulative_lengths,
        })
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn line(&self) -> &LineString<f64> {
        &self.line
    }

    #[inline]
    pub fn coords(&self) -> &[Coord<f64>] {
        &self.line.0
    }

    #[inline]
    pub fn bounding_box(&self) -> Rect<f64> {
        self.bounding_box
    }

    /// Total arc length in planar units
    #[inline]
    pub fn length(&self) -> f64 {
        self.cumulative_lengths.last().copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn first(&self) -> Coord<f64> {
        self.line.0[0]
    }

    #[inline]
    pub fn last(&self) -> Coord<f64> {
        self.line.0[self.line.0.len() - 1]
    }

    /// Find the location on this polyline closest to `point`
    ///
    /// Each segment is tested with geo's closest point, clamped to its endpoints. A point lying on
    /// a segment (up to rounding noise) is its own nearest location at distance 0. When two
    /// segments are equally close the earlier one wins.
    pub fn nearest(&self, point: Coord<f64>) -> NearestPoint {
        let query = Point::from(point);
        let mut best = NearestPoint {
            distance: f64::INFINITY,
            position: 0.0,
            segment: 0,
            location: self.first(),
        };

        for (i, segment) in self.line.lines().enumerate() {
            let (foot, distance) = closest_on_segment(&segment, query);
            if distance < best.distance {
                best = NearestPoint {
                    distance,
                    position: self.cumulative_lengths[i]
                        + Euclidean.distance(&Point::from(segment.start), &foot),
                    segment: i,
                    location: foot.0,
                };
            }
        }

        best
    }

    /// Distance from `point` to the closest location on this polyline
    #[inline]
    pub fn distance_to(&self, point: Coord<f64>) -> f64 {
        self.nearest(point).distance
    }

    /// Coordinate at an arc-length position along the line
    ///
    /// Positions outside `[0, length]` are clamped to the endpoints.
    pub fn coord_at(&self, position: f64) -> Coord<f64> {
        if position <= 0.0 {
            return self.first();
        }
        if position >= self.length() {
            return self.last();
        }

        let segment_count = self.line.0.len() - 1;
        // First segment whose end lies at or beyond the position
        let i = self.cumulative_lengths[1..]
            .partition_point(|&c| c < position)
            .min(segment_count - 1);

        let (a, b) = (self.line.0[i], self.line.0[i + 1]);
        let seg_len = self.cumulative_lengths[i + 1] - self.cumulative_lengths[i];
        if seg_len <= 0.0 {
            return a;
        }
        let t = ((position - self.cumulative_lengths[i]) / seg_len).clamp(0.0, 1.0);
        Coord {
            x: a.x + t * (b.x - a.x),
            y: a.y + t * (b.y - a.y),
        }
    }
}

/// Closest point of `segment` to `query` and the distance between them
///
/// Distances within a few ulps of the coordinate magnitude are rounding noise from the
/// projection onto a slanted segment and collapse to an exact hit.
fn closest_on_segment(segment: &Line<f64>, query: Point<f64>) -> (Point<f64>, f64) {
    let foot = match segment.closest_point(&query) {
        Closest::Intersection(_) => return (query, 0.0),
        Closest::SinglePoint(p) => p,
        // Zero-length segment
        Closest::Indeterminate => Point::from(segment.start),
    };

    let distance = Euclidean.distance(&query, &foot);
    let scale = [segment.start, segment.end, query.0]
        .iter()
        .fold(1.0_f64, |m, c| m.max(c.x.abs()).max(c.y.abs()));
    if distance <= ON_LINE_ULPS * f64::EPSILON * scale {
        (query, 0.0)
    } else {
        (foot, distance)
    }
}
