//! River Runner Library - Snapping Sampling Stations onto a River Network
//!
//! This library takes a downstream flow path (an ordered sequence of polylines) and a set of
//! water-chemistry sampling stations, and finds for every station the closest location that lies
//! on the river, within a maximum search radius. The snapped stations feed the downstream
//! chemistry-index computations.
//!
//! # Architecture
//!
//! - **[`Projection`]**: Geographic (lon/lat) to UTM conversion, so distances are metric
//! - **[`LineNetwork`]**: Indexed polylines with a bounding-box [`Quadtree`]
//! - **[`candidates`]**: Cheap bounding-box pre-filter around each station
//! - **[`Snapper`]**: Exact nearest-line search with deterministic tie-breaking
//! - **[`ResultAssembler`]**: Joins, filters and reprojects snapped stations into a table
//! - **[`RiverRunner`]**: High-level pipeline chaining all of the above
//!
//! # Example
//!
//! ```
//! use geo::{Coord, LineString};
//! use river_runner_lib::{LineNetwork, PlanarStations, ProjectionId, Snapper, Station, StationId};
//!
//! let projection = ProjectionId::utm(15, true).unwrap();
//! let river = LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]);
//! let network = LineNetwork::build(vec![river], projection).unwrap();
//!
//! let station = Station::new(StationId(7), Coord { x: 5.0, y: 1.0 });
//! let stations = PlanarStations::from_planar(projection, vec![station]);
//!
//! let records = Snapper::new(2.0).unwrap().snap(&network, &stations).unwrap();
//! let snapped = records[0].snapped.as_ref().unwrap();
//! assert_eq!(snapped.line_index, 0);
//! assert!((snapped.distance - 1.0).abs() < 1e-12);
//! ```
//!
//! # Performance Characteristics
//!
//! - **Build Time**: O(L log L) for L polylines
//! - **Query Time**: O(log D + K) per station where D=depth, K=candidates
//! - **Snap Time**: O(K × S) per station where S=segments per candidate line

mod assemble;
mod candidates;
mod config;
mod features;
mod network;
mod pipeline;
mod polyline;
mod projection;
mod quadtree;
mod snapper;
mod station;
pub mod utils;

// Public API exports
pub use assemble::{Aggregates, AssembledRow, Assembly, AssemblyReport, ResultAssembler, assemble};
pub use candidates::{CandidateSet, candidates, search_box};
pub use config::{DEFAULT_REQUIRED_FIELDS, DEFAULT_TOLERANCE, ProjectionChoice, SnapConfig};
pub use features::{features_from_lines, line_from_positions, lines_from_features};
pub use network::LineNetwork;
pub use pipeline::{NetworkInfo, RiverRunner, RunOutput};
pub use polyline::{NearestPoint, Polyline};
pub use projection::{Projection, ProjectionId, to_geographic, to_planar};
pub use quadtree::Quadtree;
pub use snapper::{SnapRecord, SnapSummary, SnapTarget, SnappedPoint, Snapper, snap};
pub use station::{Attributes, PlanarStations, Station, StationId};

/// Error types for the snapping pipeline
#[derive(Debug, thiserror::Error)]
pub enum SnapError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid tolerance: {0} (must be finite and >= 0)")]
    InvalidTolerance(f64),

    #[error("Invalid geographic coordinate: lon={lon}, lat={lat}")]
    InvalidCoordinate { lon: f64, lat: f64 },

    #[error("Invalid station identifier: {0}")]
    InvalidStationId(String),

    #[error("Invalid projection: {0}")]
    InvalidProjection(String),

    #[error("Projection mismatch: expected {expected}, found {found}")]
    ProjectionMismatch {
        expected: ProjectionId,
        found: ProjectionId,
    },

    #[error("Empty network")]
    EmptyNetwork,
}

pub type Result<T> = std::result::Result<T, SnapError>;
