//! Candidate filter
//!
//! Cheap over-approximation of the lines that may lie within a search radius of a point:
//! the point's degenerate box is grown by the radius and matched against polyline bounding
//! boxes. Exact distance is always at least the bounding-box distance, so a line missing from
//! the result can never be within the radius.

use crate::{LineNetwork, Result, SnapError, utils};
use geo::{Coord, Rect};
use smallvec::SmallVec;

/// Polyline indices in ascending order, usually only a handful
pub type CandidateSet = SmallVec<[usize; 8]>;

/// Search box of a point: its degenerate box grown by `offset` on all four sides
pub fn search_box(point: Coord<f64>, offset: f64) -> Result<Rect<f64>> {
    if !offset.is_finite() || offset < 0.0 {
        return Err(SnapError::InvalidTolerance(offset));
    }
    Ok(utils::expand_rect(utils::point_rect(point), offset))
}

/// Indices of polylines whose bounding box intersects the search box of `point`
///
/// An empty set is not an error: it means nothing lies within `offset` of the point.
pub fn candidates(network: &LineNetwork, point: Coord<f64>, offset: f64) -> Result<CandidateSet> {
    let query = search_box(point, offset)?;
    Ok(network.query(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProjectionId;
    use geo::LineString;

    fn create_test_network() -> LineNetwork {
        let lines = vec![
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]),
            LineString::from(vec![(10.0, 0.0), (10.0, 10.0)]),
            LineString::from(vec![(20.0, 20.0), (30.0, 30.0)]),
            LineString::from(vec![(-50.0, -50.0), (-40.0, -45.0)]),
        ];
        LineNetwork::build(lines, ProjectionId::utm(15, true).unwrap()).unwrap()
    }

    #[test]
    fn test_search_box() {
        let rect = search_box(Coord { x: 5.0, y: 1.0 }, 2.0).unwrap();
        assert_eq!(rect.min(), Coord { x: 3.0, y: -1.0 });
        assert_eq!(rect.max(), Coord { x: 7.0, y: 3.0 });
    }

    #[test]
    fn test_invalid_offset() {
        let network = create_test_network();
        let point = Coord { x: 0.0, y: 0.0 };
        assert!(matches!(
            candidates(&network, point, -1.0),
            Err(SnapError::InvalidTolerance(_))
        ));
        assert!(candidates(&network, point, f64::NAN).is_err());
        assert!(candidates(&network, point, f64::INFINITY).is_err());
    }

    #[test]
    fn test_zero_offset_point_on_line() {
        let network = create_test_network();
        let hits = candidates(&network, Coord { x: 5.0, y: 0.0 }, 0.0).unwrap();
        assert_eq!(hits.as_slice(), &[0]);
    }

    #[test]
    fn test_candidates_near_corner() {
        let network = create_test_network();
        let hits = candidates(&network, Coord { x: 11.0, y: 1.0 }, 1.5).unwrap();
        assert_eq!(hits.as_slice(), &[0, 1]);
    }

    #[test]
    fn test_bounding_box_over_approximation() {
        // (29, 21) is inside line 2's box but ~5.66 units from the diagonal itself
        let network = create_test_network();
        let hits = candidates(&network, Coord { x: 29.0, y: 21.0 }, 0.5).unwrap();
        assert_eq!(hits.as_slice(), &[2]);
    }

    #[test]
    fn test_no_candidates() {
        let network = create_test_network();
        let hits = candidates(&network, Coord { x: 100.0, y: -100.0 }, 5.0).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_monotonic_in_offset() {
        let network = create_test_network();
        let probes = [
            Coord { x: 15.0, y: 5.0 },
            Coord { x: -30.0, y: -30.0 },
            Coord { x: 5.0, y: 12.0 },
        ];
        let offsets = [0.0, 1.0, 4.0, 9.0, 16.0, 64.0];
        for point in probes {
            for pair in offsets.windows(2) {
                let small = candidates(&network, point, pair[0]).unwrap();
                let large = candidates(&network, point, pair[1]).unwrap();
                assert!(
                    small.iter().all(|i| large.contains(i)),
                    "{:?} at {} not a subset of {}",
                    point,
                    pair[0],
                    pair[1]
                );
            }
        }
    }
}
