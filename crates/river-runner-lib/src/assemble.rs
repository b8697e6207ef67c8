//! Result assembler
//!
//! Turns per-station snap outcomes into the final table:
//! - unsnapped stations are dropped
//! - carried attributes are joined with auxiliary per-station aggregates
//! - rows missing a required attribute are dropped
//! - duplicate station identifiers are dropped, the first surviving row is kept
//! - the snapped coordinate is reprojected to geographic coordinates
//! - surviving rows get a dense 1-based display index in input order
//!
//! Every dropped row is counted in an [`AssemblyReport`], so
//! `report.input == rows.len() + report.dropped()`.

use crate::{
    Attributes, Projection, ProjectionId, Result, SnapRecord, SnappedPoint, Station, StationId,
};
use geo::Coord;
use std::collections::{HashMap, HashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Auxiliary per-station values (e.g. time-series means), keyed by station id
pub type Aggregates = HashMap<StationId, Attributes>;

/// One row of the assembled table
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AssembledRow {
    /// Dense 1-based position among surviving rows
    pub display_index: usize,
    pub station_id: StationId,
    /// Index of the polyline the station snapped to
    pub line_index: usize,
    /// Planar distance between the station and its snapped location
    pub snap_distance: f64,
    /// Snapped location in geographic coordinates (x = lon, y = lat)
    pub location: Coord<f64>,
    /// Snapped location in the planar projection
    pub planar_location: Coord<f64>,
    /// Arc-length position of the snapped location along its polyline
    pub position: f64,
    /// Station attributes after the auxiliary join
    pub attributes: Attributes,
}

/// Why rows were left out of the table
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AssemblyReport {
    /// Number of snap records handed in
    pub input: usize,
    /// Stations that did not snap within tolerance
    pub unsnapped: usize,
    /// Snapped stations lacking a required attribute after the join
    pub missing_attributes: usize,
    /// Rows whose station id was already in the table
    pub duplicates: usize,
}

impl AssemblyReport {
    /// Total number of rows left out
    #[inline]
    pub fn dropped(&self) -> usize {
        self.unsnapped + self.missing_attributes + self.duplicates
    }
}

/// The assembled table plus its drop report
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Assembly {
    pub rows: Vec<AssembledRow>,
    pub report: AssemblyReport,
    /// Planar projection the snap records were expressed in
    pub projection: ProjectionId,
}

impl Assembly {
    /// Convert the rows back into snap records
    ///
    /// Each record's station sits on its snapped location and carries the joined attributes,
    /// so assembling the records again reproduces the same rows.
    pub fn to_snap_records(&self) -> Vec<SnapRecord> {
        self.rows
            .iter()
            .map(|row| SnapRecord {
                station_id: row.station_id,
                snapped: Some(SnappedPoint {
                    station: Station {
                        id: row.station_id,
                        location: row.planar_location,
                        attributes: row.attributes.clone(),
                    },
                    line_index: row.line_index,
                    distance: row.snap_distance,
                    position: row.position,
                    location: row.planar_location,
                }),
            })
            .collect()
    }

    /// Union of attribute names across all rows, sorted
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rows
            .iter()
            .flat_map(|row| row.attributes.names().map(str::to_string))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Builds the output table from snap records
#[derive(Clone, Debug)]
pub struct ResultAssembler {
    required_fields: Vec<String>,
    projection: Projection,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ResultAssembler {
    /// # Arguments
    /// * `required_fields` - Attributes a row must carry after the join to be kept
    /// * `projection` - Planar projection the snap records are expressed in
    pub fn new(required_fields: Vec<String>, projection: ProjectionId) -> Result<Self> {
        Ok(Self {
            required_fields,
            projection: Projection::new(projection)?,
        })
    }

    #[inline]
    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    /// Assemble `records` (in input order) into a table
    pub fn assemble(&self, records: &[SnapRecord], aggregates: &Aggregates) -> Result<Assembly> {
        #[cfg(feature = "profiling")]
        profiling::scope!("assemble");

        let mut report = AssemblyReport {
            input: records.len(),
            ..Default::default()
        };
        let mut seen = HashSet::with_capacity(records.len());
        let mut rows = Vec::with_capacity(records.len());

        for record in records {
            let Some(snapped) = &record.snapped else {
                report.unsnapped += 1;
                continue;
            };

            let mut attributes = snapped.station.attributes.clone();
            if let Some(extra) = aggregates.get(&record.station_id) {
                attributes.fill_from(extra);
            }

            let missing = attributes.missing(&self.required_fields);
            if !missing.is_empty() {
                tracing::debug!(
                    "Station {} dropped, missing {}",
                    record.station_id,
                    missing.join(", ")
                );
                report.missing_attributes += 1;
                continue;
            }

            if !seen.insert(record.station_id) {
                tracing::warn!("Duplicate station {} dropped", record.station_id);
                report.duplicates += 1;
                continue;
            }

            rows.push(AssembledRow {
                display_index: rows.len() + 1,
                station_id: record.station_id,
                line_index: snapped.line_index,
                snap_distance: snapped.distance,
                location: self.projection.inverse(snapped.location)?,
                planar_location: snapped.location,
                position: snapped.position,
                attributes,
            });
        }

        tracing::debug!(
            "Assembled {} rows from {} records ({} unsnapped, {} missing attributes, {} duplicates)",
            rows.len(),
            report.input,
            report.unsnapped,
            report.missing_attributes,
            report.duplicates
        );

        Ok(Assembly {
            rows,
            report,
            projection: self.projection.id(),
        })
    }
}

/// Assemble snap records into the output table
///
/// See [`ResultAssembler::assemble`].
pub fn assemble(
    records: &[SnapRecord],
    required_fields: &[String],
    aggregates: &Aggregates,
    projection: ProjectionId,
) -> Result<Assembly> {
    ResultAssembler::new(required_fields.to_vec(), projection)?.assemble(records, aggregates)
}
