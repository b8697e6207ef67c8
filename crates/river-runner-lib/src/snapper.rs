//! Snapper - moves each station onto the closest line of the network
//!
//! Per station:
//! 1. Candidate lines come from the bounding-box filter with `offset = tolerance`.
//! 2. The exact planar distance to every candidate is computed (point-to-segment projection
//!    clamped to the segment endpoints, minimum over all segments).
//! 3. The closest candidate wins; on an exact tie the lowest polyline index wins.
//! 4. If that distance exceeds the tolerance the station does not snap.
//! 5. Otherwise the snapped location is re-derived from the arc-length position of the
//!    nearest point along the chosen line. A station lying on the line keeps its own coordinate.
//!
//! The snapper holds no state besides its tolerance and never mutates its inputs.

use crate::{
    LineNetwork, PlanarStations, Result, SnapError, Station, StationId, candidates::candidates,
};
use geo::Coord;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A station moved onto the river
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SnappedPoint {
    /// The input station (planar location, all attributes)
    pub station: Station,
    /// Index of the chosen polyline
    pub line_index: usize,
    /// Distance from the station to the snapped location
    pub distance: f64,
    /// Arc-length position of the snapped location along the chosen polyline
    pub position: f64,
    /// Snapped planar coordinate, on the chosen polyline
    pub location: Coord<f64>,
}

/// Snap outcome for one input station, `snapped` is `None` when it failed
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SnapRecord {
    pub station_id: StationId,
    pub snapped: Option<SnappedPoint>,
}

impl SnapRecord {
    #[inline]
    pub fn is_snapped(&self) -> bool {
        self.snapped.is_some()
    }
}

/// Counters describing one snapping run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SnapSummary {
    /// Stations that snapped within tolerance
    pub snapped: usize,
    /// Stations with no candidate line in their search box
    pub no_candidates: usize,
    /// Stations whose closest candidate was farther than the tolerance
    pub out_of_tolerance: usize,
    /// Stations where two or more lines were exactly equally close
    pub ties: usize,
}

impl SnapSummary {
    /// Number of stations that failed to snap
    #[inline]
    pub fn unsnapped(&self) -> usize {
        self.no_candidates + self.out_of_tolerance
    }
}

/// Where a single planar point lands on the network
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SnapTarget {
    pub line_index: usize,
    pub distance: f64,
    /// Arc-length position along the chosen polyline
    pub position: f64,
    pub location: Coord<f64>,
}

enum Placement {
    Snapped { target: SnapTarget, tied: bool },
    NoCandidates,
    OutOfTolerance {
        distance: f64,
        line_index: usize,
    },
}

/// Stateless nearest-line snapper
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapper {
    tolerance: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Snapper {
    /// Create a snapper; `tolerance` must be finite and non-negative
    pub fn new(tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(SnapError::InvalidTolerance(tolerance));
        }
        Ok(Self { tolerance })
    }

    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Snap every station, preserving input order
    pub fn snap(&self, network: &LineNetwork, stations: &PlanarStations) -> Result<Vec<SnapRecord>> {
        self.snap_with_summary(network, stations)
            .map(|(records, _)| records)
    }

    /// Snap every station and report how the run went
    pub fn snap_with_summary(
        &self,
        network: &LineNetwork,
        stations: &PlanarStations,
    ) -> Result<(Vec<SnapRecord>, SnapSummary)> {
        #[cfg(feature = "profiling")]
        profiling::scope!("snapper::snap");

        if stations.projection() != network.projection() {
            return Err(SnapError::ProjectionMismatch {
                expected: network.projection(),
                found: stations.projection(),
            });
        }

        let mut summary = SnapSummary::default();
        let mut records = Vec::with_capacity(stations.len());

        for station in stations.iter() {
            let snapped = match self.place(network, station.location)? {
                Placement::Snapped { target, tied } => {
                    summary.snapped += 1;
                    if tied {
                        summary.ties += 1;
                        tracing::debug!(
                            "Station {} is equidistant from several lines, chose line {}",
                            station.id,
                            target.line_index
                        );
                    }
                    Some(SnappedPoint {
                        station: station.clone(),
                        line_index: target.line_index,
                        distance: target.distance,
                        position: target.position,
                        location: target.location,
                    })
                }
                Placement::NoCandidates => {
                    summary.no_candidates += 1;
                    tracing::debug!(
                        "Station {} has no line within {}",
                        station.id,
                        self.tolerance
                    );
                    None
                }
                Placement::OutOfTolerance {
                    distance,
                    line_index,
                } => {
                    summary.out_of_tolerance += 1;
                    tracing::debug!(
                        "Station {} is {:.3} from line {}, beyond tolerance {}",
                        station.id,
                        distance,
                        line_index,
                        self.tolerance
                    );
                    None
                }
            };
            records.push(SnapRecord {
                station_id: station.id,
                snapped,
            });
        }

        tracing::debug!(
            "Snapped {}/{} stations ({} without candidates, {} out of tolerance, {} ties)",
            summary.snapped,
            records.len(),
            summary.no_candidates,
            summary.out_of_tolerance,
            summary.ties
        );

        Ok((records, summary))
    }

    /// Snap a single planar point, `None` if it does not snap
    pub fn snap_point(
        &self,
        network: &LineNetwork,
        point: Coord<f64>,
    ) -> Result<Option<SnapTarget>> {
        Ok(match self.place(network, point)? {
            Placement::Snapped { target, .. } => Some(target),
            Placement::NoCandidates | Placement::OutOfTolerance { .. } => None,
        })
    }

    fn place(&self, network: &LineNetwork, point: Coord<f64>) -> Result<Placement> {
        let hits = candidates(network, point, self.tolerance)?;
        if hits.is_empty() {
            return Ok(Placement::NoCandidates);
        }

        // Candidates are in ascending index order, so a strict comparison keeps the lowest
        // index among exact ties
        let mut best: Option<(usize, crate::NearestPoint)> = None;
        let mut tied = false;
        for &index in &hits {
            let Some(polyline) = network.get(index) else {
                continue;
            };
            let nearest = polyline.nearest(point);
            match &best {
                Some((_, current)) if nearest.distance > current.distance => {}
                Some((_, current)) if nearest.distance == current.distance => tied = true,
                _ => {
                    best = Some((index, nearest));
                    tied = false;
                }
            }
        }

        let Some((line_index, nearest)) = best else {
            return Ok(Placement::NoCandidates);
        };

        if nearest.distance > self.tolerance {
            return Ok(Placement::OutOfTolerance {
                distance: nearest.distance,
                line_index,
            });
        }

        let polyline = network.get(line_index).ok_or_else(|| {
            SnapError::InvalidGeometry(format!("Polyline {line_index} vanished from network"))
        })?;
        let location = if nearest.distance == 0.0 {
            point
        } else {
            polyline.coord_at(nearest.position)
        };

        Ok(Placement::Snapped {
            target: SnapTarget {
                line_index,
                distance: nearest.distance,
                position: nearest.position,
                location,
            },
            tied,
        })
    }
}

/// Snap `stations` onto `network` within `tolerance`
///
/// One record per input station, in input order; failed stations carry `None`.
pub fn snap(
    network: &LineNetwork,
    stations: &PlanarStations,
    tolerance: f64,
) -> Result<Vec<SnapRecord>> {
    Snapper::new(tolerance)?.snap(network, stations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attributes, ProjectionId};
    use geo::LineString;

    fn utm15() -> ProjectionId {
        ProjectionId::utm(15, true).unwrap()
    }

    fn network_of(lines: Vec<LineString<f64>>) -> LineNetwork {
        LineNetwork::build(lines, utm15()).unwrap()
    }

    fn straight_network() -> LineNetwork {
        network_of(vec![LineString::from(vec![(0.0, 0.0), (10.0, 0.0)])])
    }

    fn stations_at(points: &[(f64, f64)]) -> PlanarStations {
        let stations = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                Station::new(StationId(i as i64 + 1), Coord { x, y })
                    .with_attributes(Attributes::new().with("pH", 7.0 + i as f64 / 10.0))
            })
            .collect();
        PlanarStations::from_planar(utm15(), stations)
    }

    #[test]
    fn test_snap_to_straight_line() {
        let records = snap(&straight_network(), &stations_at(&[(5.0, 1.0)]), 2.0).unwrap();
        assert_eq!(records.len(), 1);

        let snapped = records[0].snapped.as_ref().unwrap();
        assert_eq!(snapped.line_index, 0);
        assert!((snapped.distance - 1.0).abs() < 1e-12);
        assert!((snapped.location.x - 5.0).abs() < 1e-12);
        assert!(snapped.location.y.abs() < 1e-12);
        assert!((snapped.position - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_tolerance() {
        let snapper = Snapper::new(2.0).unwrap();
        let (records, summary) = snapper
            .snap_with_summary(&straight_network(), &stations_at(&[(5.0, 3.0)]))
            .unwrap();
        assert_eq!(records[0].station_id, StationId(1));
        assert!(records[0].snapped.is_none());
        assert_eq!(summary.out_of_tolerance, 1);
        assert_eq!(summary.no_candidates, 0);
        assert_eq!(summary.unsnapped(), 1);
    }

    #[test]
    fn test_bbox_candidate_beyond_tolerance() {
        // Inside the diagonal's bounding box but 4.24 units away from the line itself
        let network = network_of(vec![LineString::from(vec![(0.0, 0.0), (10.0, 10.0)])]);
        let snapper = Snapper::new(3.0).unwrap();
        let (records, summary) = snapper
            .snap_with_summary(&network, &stations_at(&[(8.0, 2.0)]))
            .unwrap();
        assert!(records[0].snapped.is_none());
        assert_eq!(summary.out_of_tolerance, 1);
    }

    #[test]
    fn test_no_candidates() {
        let snapper = Snapper::new(2.0).unwrap();
        let (records, summary) = snapper
            .snap_with_summary(&straight_network(), &stations_at(&[(50.0, 50.0)]))
            .unwrap();
        assert!(!records[0].is_snapped());
        assert_eq!(summary.no_candidates, 1);
    }

    #[test]
    fn test_exact_match_snaps_to_zero_distance() {
        let network = network_of(vec![LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 8.0)])]);
        let records = snap(&network, &stations_at(&[(4.0, 3.5), (1.25, 0.0)]), 1.0).unwrap();
        for (record, expected) in records.iter().zip([(4.0, 3.5), (1.25, 0.0)]) {
            let snapped = record.snapped.as_ref().unwrap();
            assert_eq!(snapped.distance, 0.0);
            assert_eq!(snapped.location, Coord { x: expected.0, y: expected.1 });
        }
    }

    #[test]
    fn test_on_slanted_segment_keeps_own_coordinate() {
        let network = network_of(vec![LineString::from(vec![(0.0, 0.0), (3.0, 4.0)])]);
        let points = [(0.3, 0.4), (0.9, 1.2), (2.1, 2.8)];
        let records = snap(&network, &stations_at(&points), 1.0).unwrap();
        for (record, (x, y)) in records.iter().zip(points) {
            let snapped = record.snapped.as_ref().unwrap();
            assert_eq!(snapped.distance, 0.0, "({x}, {y})");
            assert_eq!(snapped.location, Coord { x, y });
        }
    }

    #[test]
    fn test_shared_endpoint_tie_prefers_lower_index() {
        let network = network_of(vec![
            LineString::from(vec![(0.0, 0.0), (5.0, 0.0)]),
            LineString::from(vec![(5.0, 0.0), (10.0, 0.0)]),
        ]);
        let snapper = Snapper::new(2.0).unwrap();
        for _ in 0..10 {
            let (records, summary) = snapper
                .snap_with_summary(&network, &stations_at(&[(5.0, 0.0)]))
                .unwrap();
            let snapped = records[0].snapped.as_ref().unwrap();
            assert_eq!(snapped.line_index, 0);
            assert_eq!(snapped.distance, 0.0);
            assert_eq!(summary.ties, 1);
        }
    }

    #[test]
    fn test_equidistant_parallel_lines_prefer_lower_index() {
        // Listed out of spatial order: line 0 is above the point, line 1 below
        let network = network_of(vec![
            LineString::from(vec![(0.0, 2.0), (10.0, 2.0)]),
            LineString::from(vec![(0.0, -2.0), (10.0, -2.0)]),
        ]);
        let records = snap(&network, &stations_at(&[(5.0, 0.0)]), 5.0).unwrap();
        let snapped = records[0].snapped.as_ref().unwrap();
        assert_eq!(snapped.line_index, 0);
        assert_eq!(snapped.location, Coord { x: 5.0, y: 2.0 });
    }

    #[test]
    fn test_closest_line_wins_over_lower_index() {
        let network = network_of(vec![
            LineString::from(vec![(0.0, 3.0), (10.0, 3.0)]),
            LineString::from(vec![(0.0, -1.0), (10.0, -1.0)]),
        ]);
        let records = snap(&network, &stations_at(&[(5.0, 0.0)]), 5.0).unwrap();
        let snapped = records[0].snapped.as_ref().unwrap();
        assert_eq!(snapped.line_index, 1);
        assert!((snapped.distance - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let records = snap(&straight_network(), &stations_at(&[(5.0, 2.0)]), 2.0).unwrap();
        assert!(records[0].is_snapped());
    }

    #[test]
    fn test_order_and_attributes_preserved() {
        let points = [(1.0, 0.5), (5.0, 30.0), (9.0, -1.5), (-20.0, 0.0), (3.0, 0.0)];
        let stations = stations_at(&points);
        let records = snap(&straight_network(), &stations, 2.0).unwrap();

        assert_eq!(records.len(), points.len());
        let ids: Vec<i64> = records.iter().map(|r| r.station_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let snapped: Vec<bool> = records.iter().map(SnapRecord::is_snapped).collect();
        assert_eq!(snapped, vec![true, false, true, false, true]);

        for (record, station) in records.iter().zip(stations.iter()) {
            if let Some(point) = &record.snapped {
                assert_eq!(&point.station, station);
                assert!(point.distance <= 2.0);
            }
        }
    }

    #[test]
    fn test_projection_mismatch() {
        let stations = PlanarStations::from_planar(
            ProjectionId::utm(16, true).unwrap(),
            vec![Station::new(StationId(1), Coord { x: 5.0, y: 1.0 })],
        );
        let result = snap(&straight_network(), &stations, 2.0);
        assert!(matches!(result, Err(SnapError::ProjectionMismatch { .. })));
    }

    #[test]
    fn test_invalid_tolerance() {
        assert!(matches!(
            Snapper::new(-1.0),
            Err(SnapError::InvalidTolerance(_))
        ));
        assert!(Snapper::new(f64::NAN).is_err());
    }

    #[test]
    fn test_snap_point() {
        let snapper = Snapper::new(2.0).unwrap();
        let network = straight_network();
        let target = snapper
            .snap_point(&network, Coord { x: 12.0, y: 0.0 })
            .unwrap()
            .unwrap();
        assert_eq!(target.line_index, 0);
        assert!((target.distance - 2.0).abs() < 1e-12);
        assert_eq!(target.position, 10.0);
        assert_eq!(target.location, Coord { x: 10.0, y: 0.0 });
        assert!(snapper
            .snap_point(&network, Coord { x: 12.5, y: 0.0 })
            .unwrap()
            .is_none());
    }
}
