//! High-level pipeline: geographic inputs in, assembled table out
//!
//! projection -> network build -> station projection -> snap -> assembly

use crate::{
    Aggregates, Assembly, LineNetwork, PlanarStations, Projection, ProjectionId,
    ResultAssembler, Result, SnapConfig, SnapSummary, Snapper, Station, utils,
};
use geo::{Coord, LineString, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Summary of the network a run snapped against
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkInfo {
    pub polyline_count: usize,
    /// Total length in planar units
    pub total_length: f64,
    pub projection: ProjectionId,
    /// Extent of the input lines in geographic coordinates
    pub bounding_box: Rect<f64>,
    /// Downstream end of the flow path in geographic coordinates
    pub terminus: Coord<f64>,
}

/// Everything a run produces
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunOutput {
    pub assembly: Assembly,
    pub summary: SnapSummary,
    pub network: NetworkInfo,
}

/// Snaps stations onto a river for a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct RiverRunner {
    config: SnapConfig,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RiverRunner {
    pub fn new(config: SnapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    /// Run the full pipeline
    ///
    /// # Arguments
    /// * `lines` - Geographic river polylines (x = lon, y = lat), in flow order
    /// * `stations` - Geographic stations with their carried attributes
    /// * `aggregates` - Auxiliary per-station values joined during assembly
    pub fn run(
        &self,
        lines: &[LineString<f64>],
        stations: &[Station],
        aggregates: &Aggregates,
    ) -> Result<RunOutput> {
        #[cfg(feature = "profiling")]
        profiling::scope!("RiverRunner::run");

        self.config.validate()?;
        let snapper = Snapper::new(self.config.tolerance)?;

        let network = LineNetwork::from_geographic(lines, self.config.projection)?;
        let planar = PlanarStations::project(stations, network.projection())?;
        let (records, summary) = snapper.snap_with_summary(&network, &planar)?;

        let assembler =
            ResultAssembler::new(self.config.required_fields.clone(), network.projection())?;
        let assembly = assembler.assemble(&records, aggregates)?;

        let network = network_info(lines, &network)?;

        tracing::info!(
            "Snapped {}/{} stations onto {} polylines ({:.1} km, {}); {} rows kept, {} dropped ({} unsnapped, {} missing attributes, {} duplicates)",
            summary.snapped,
            stations.len(),
            network.polyline_count,
            network.total_length / 1000.0,
            network.projection,
            assembly.rows.len(),
            assembly.report.dropped(),
            assembly.report.unsnapped,
            assembly.report.missing_attributes,
            assembly.report.duplicates
        );

        Ok(RunOutput {
            assembly,
            summary,
            network,
        })
    }
}

fn network_info(lines: &[LineString<f64>], network: &LineNetwork) -> Result<NetworkInfo> {
    let terminus = Projection::new(network.projection())?.inverse(network.terminus())?;
    Ok(NetworkInfo {
        polyline_count: network.len(),
        total_length: network.total_length(),
        projection: network.projection(),
        // `lines` is non-empty once the network is built
        bounding_box: utils::bounding_rect_of(lines.iter().flat_map(|l| l.0.iter().copied()))
            .unwrap_or_else(|| utils::point_rect(terminus)),
        terminus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attributes, ProjectionChoice, SnapError, StationId};

    /// A short reach of river running east then north-east near St. Louis
    fn river() -> Vec<LineString<f64>> {
        vec![
            LineString::from(vec![(-90.30, 38.60), (-90.25, 38.60)]),
            LineString::from(vec![(-90.25, 38.60), (-90.20, 38.62), (-90.15, 38.65)]),
        ]
    }

    fn station(id: i64, lon: f64, lat: f64, ph: Option<f64>) -> Station {
        let mut attributes = Attributes::new().with("dDICdTA", 0.9);
        attributes.set("pH", ph);
        Station::new(StationId(id), Coord { x: lon, y: lat }).with_attributes(attributes)
    }

    #[test]
    fn test_run_end_to_end() {
        let stations = vec![
            // ~110 m south of line 0
            station(1, -90.28, 38.599, Some(7.9)),
            // ~5.5 km north, beyond the default tolerance
            station(2, -90.28, 38.65, Some(8.1)),
            // On line 1, but without pH
            station(3, -90.20, 38.62, None),
            // Near line 1, pH comes from the aggregates
            station(4, -90.175, 38.636, None),
        ];
        let mut aggregates = Aggregates::new();
        aggregates.insert(StationId(4), Attributes::new().with("pH", 7.4));

        let runner = RiverRunner::new(SnapConfig::default());
        let output = runner.run(&river(), &stations, &aggregates).unwrap();

        assert_eq!(output.summary.snapped, 3);
        assert_eq!(output.summary.unsnapped(), 1);

        let rows = &output.assembly.rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].station_id, StationId(1));
        assert_eq!(rows[0].display_index, 1);
        assert_eq!(rows[0].line_index, 0);
        assert!(rows[0].snap_distance > 100.0 && rows[0].snap_distance < 120.0);
        assert!((rows[0].location.y - 38.60).abs() < 1e-4);
        assert!((rows[0].location.x + 90.28).abs() < 1e-3);

        assert_eq!(rows[1].station_id, StationId(4));
        assert_eq!(rows[1].display_index, 2);
        assert_eq!(rows[1].line_index, 1);
        assert_eq!(rows[1].attributes.get("pH"), Some(7.4));

        let report = output.assembly.report;
        assert_eq!(report.unsnapped, 1);
        assert_eq!(report.missing_attributes, 1);
        assert_eq!(report.input, stations.len());
    }

    #[test]
    fn test_network_info() {
        let runner = RiverRunner::default();
        let output = runner.run(&river(), &[], &Aggregates::new()).unwrap();
        let info = &output.network;
        assert_eq!(info.polyline_count, 2);
        assert_eq!(info.projection.epsg(), 32615);
        assert!((info.terminus.x + 90.15).abs() < 1e-6);
        assert!((info.terminus.y - 38.65).abs() < 1e-6);
        assert_eq!(info.bounding_box.min(), Coord { x: -90.30, y: 38.60 });
        assert_eq!(info.bounding_box.max(), Coord { x: -90.15, y: 38.65 });
        // Roughly 4.4 km + 4.9 km + 5.5 km
        assert!(info.total_length > 12_000.0 && info.total_length < 16_000.0);
        assert!(output.assembly.rows.is_empty());
    }

    #[test]
    fn test_fixed_projection() {
        let id = ProjectionId::utm(16, true).unwrap();
        let config = SnapConfig::default().with_projection(ProjectionChoice::Fixed(id));
        let output = RiverRunner::new(config)
            .run(&river(), &[station(1, -90.28, 38.6005, Some(7.0))], &Aggregates::new())
            .unwrap();
        assert_eq!(output.network.projection, id);
        assert_eq!(output.assembly.rows.len(), 1);
    }

    #[test]
    fn test_run_errors() {
        let runner = RiverRunner::new(SnapConfig::default().with_tolerance(-5.0));
        assert!(matches!(
            runner.run(&river(), &[], &Aggregates::new()),
            Err(SnapError::InvalidTolerance(_))
        ));

        let runner = RiverRunner::default();
        let bad_line = vec![LineString::from(vec![(-90.0, 38.0)])];
        assert!(matches!(
            runner.run(&bad_line, &[], &Aggregates::new()),
            Err(SnapError::InvalidGeometry(_))
        ));

        let bad_station = vec![station(1, -90.2, 123.0, Some(7.0))];
        assert!(matches!(
            runner.run(&river(), &bad_station, &Aggregates::new()),
            Err(SnapError::InvalidCoordinate { .. })
        ));
    }
}
