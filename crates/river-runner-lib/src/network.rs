//! LineNetwork - Indexed, queryable collection of river polylines
//!
//! This module builds the network the snapper runs against: an ordered, immutable list of
//! [`Polyline`]s and a [`Quadtree`] over their bounding boxes.

use crate::{
    CandidateSet, Polyline, ProjectionChoice, ProjectionId, Quadtree, Result, SnapError,
    projection, utils,
};
use geo::{Coord, LineString, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered collection of polylines plus a bounding-box spatial index
///
/// Polyline `i` is the `i`-th line of the input sequence. The set is static once built, so
/// the index never goes stale.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineNetwork {
    /// All polylines, position == index
    polylines: Vec<Polyline>,
    /// Spatial index over polyline bounding boxes
    quadtree: Quadtree,
    /// Planar system the coordinates are expressed in
    projection: ProjectionId,
    /// Combined bounding box of all polylines
    bounding_box: Rect<f64>,
    /// Sum of polyline lengths
    total_length: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl LineNetwork {
    /// Build a network from planar polylines
    ///
    /// # Arguments
    /// * `lines` - Ordered planar polylines; each gets its input position as index
    /// * `projection` - The planar system the coordinates are in
    ///
    /// # Returns
    /// The network, or `InvalidGeometry` if any line has fewer than 2 coordinates.
    /// Nothing is returned on failure, not even the lines that were valid.
    pub fn build(lines: Vec<LineString<f64>>, projection: ProjectionId) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("network::build");

        if lines.is_empty() {
            return Err(SnapError::EmptyNetwork);
        }

        let polylines = lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| Polyline::new(index, line))
            .collect::<Result<Vec<_>>>()?;

        let bounding_box = polylines
            .iter()
            .map(Polyline::bounding_box)
            .reduce(utils::union_rect)
            .ok_or(SnapError::EmptyNetwork)?;

        let quadtree = Quadtree::from_entries(
            bounding_box,
            polylines.iter().map(|p| (p.index(), p.bounding_box())),
        );

        let total_length: f64 = polylines.iter().map(Polyline::length).sum();

        tracing::debug!(
            "Built line network: {} polylines, {:.1} units long, index depth {} ({})",
            polylines.len(),
            total_length,
            quadtree.depth(),
            projection
        );

        Ok(Self {
            polylines,
            quadtree,
            projection,
            bounding_box,
            total_length,
        })
    }

    /// Project geographic polylines and build a network from them
    pub fn from_geographic(lines: &[LineString<f64>], choice: ProjectionChoice) -> Result<Self> {
        let (planar, id) = projection::to_planar(lines, choice.fixed_id())?;
        Self::build(planar, id)
    }

    /// Indices of all polylines whose bounding box intersects `query`
    ///
    /// Returned in ascending index order without duplicates.
    pub fn query(&self, query: Rect<f64>) -> CandidateSet {
        let mut hits = CandidateSet::new();
        self.quadtree.query_into(query, &mut hits);
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    /// Get a polyline by index
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Polyline> {
        self.polylines.get(index)
    }

    /// Get all polylines
    #[inline]
    pub fn polylines(&self) -> &[Polyline] {
        &self.polylines
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.polylines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.polylines.is_empty()
    }

    #[inline]
    pub fn projection(&self) -> ProjectionId {
        self.projection
    }

    /// Combined planar bounding box
    #[inline]
    pub fn bounding_box(&self) -> Rect<f64> {
        self.bounding_box
    }

    /// Sum of all polyline lengths in planar units
    #[inline]
    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Downstream end of the flow path: the final coordinate of the last polyline
    #[inline]
    pub fn terminus(&self) -> Coord<f64> {
        // `build` guarantees at least one polyline
        self.polylines[self.polylines.len() - 1].last()
    }

    #[inline]
    pub fn spatial_index(&self) -> &Quadtree {
        &self.quadtree
    }
}
