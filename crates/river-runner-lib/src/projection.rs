//! Planar projection adapter
//!
//! Converts geographic coordinates (longitude, latitude in degrees, WGS84) into UTM metres and
//! back. Every distance computed by the snapper is measured in these planar units, never in
//! raw degrees.
//!
//! The transforms themselves are delegated to `proj4rs`, which works in radians on the
//! geographic side; degrees are converted at this boundary.

use crate::{Result, SnapError, utils};
use geo::{Coord, LineString};
use proj4rs::{proj::Proj, transform::transform};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// PROJ.4 definition of the geographic source system (x = lon, y = lat, in radians for proj4rs)
const GEOGRAPHIC_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Identifier of a planar coordinate system
///
/// Opaque to the rest of the pipeline: it is only compared, displayed and handed back to
/// [`Projection::new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProjectionId {
    /// Universal Transverse Mercator on the WGS84 ellipsoid
    Utm { zone: u8, north: bool },
}

impl ProjectionId {
    /// Create a UTM identifier, `zone` must be in 1..=60
    pub fn utm(zone: u8, north: bool) -> Result<Self> {
        if !(1..=60).contains(&zone) {
            return Err(SnapError::InvalidProjection(format!(
                "UTM zone must be 1-60, got {zone}"
            )));
        }
        Ok(ProjectionId::Utm { zone, north })
    }

    /// UTM zone containing the given geographic coordinate
    pub fn utm_for(lon: f64, lat: f64) -> Self {
        let zone = (((lon + 180.0) / 6.0).floor() as i64 + 1).clamp(1, 60) as u8;
        ProjectionId::Utm {
            zone,
            north: lat >= 0.0,
        }
    }

    /// EPSG code of this coordinate system (326zz north, 327zz south)
    pub fn epsg(&self) -> u32 {
        match *self {
            ProjectionId::Utm { zone, north: true } => 32600 + zone as u32,
            ProjectionId::Utm { zone, north: false } => 32700 + zone as u32,
        }
    }

    /// PROJ.4 definition string understood by `proj4rs`
    pub fn proj_string(&self) -> String {
        match *self {
            ProjectionId::Utm { zone, north } => {
                let south = if north { "" } else { " +south" };
                format!("+proj=utm +zone={zone}{south} +datum=WGS84 +units=m +no_defs")
            }
        }
    }
}

impl fmt::Display for ProjectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// A ready-to-use pair of coordinate systems: WGS84 lon/lat and one planar projection
///
/// Cloning is cheap, the parsed definitions are shared.
#[derive(Clone)]
pub struct Projection {
    id: ProjectionId,
    geographic: Arc<Proj>,
    planar: Arc<Proj>,
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection").field("id", &self.id).finish()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Projection {
    pub fn new(id: ProjectionId) -> Result<Self> {
        Ok(Self {
            id,
            geographic: Arc::new(parse_proj4(GEOGRAPHIC_PROJ4)?),
            planar: Arc::new(parse_proj4(&id.proj_string())?),
        })
    }

    /// Projection for the UTM zone at the centre of a geographic extent
    pub fn for_extent(lines: &[LineString<f64>]) -> Result<Self> {
        let bbox = utils::bounding_rect_of(lines.iter().flat_map(|l| l.0.iter().copied()))
            .ok_or_else(|| SnapError::InvalidGeometry("No coordinates in input".to_string()))?;
        let center = bbox.center();
        validate_geographic(center)?;
        Self::new(ProjectionId::utm_for(center.x, center.y))
    }

    #[inline]
    pub fn id(&self) -> ProjectionId {
        self.id
    }

    /// Geographic (x = lon, y = lat in degrees) to planar (x = easting, y = northing in metres)
    pub fn forward(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        validate_geographic(coord)?;

        let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
        transform(&self.geographic, &self.planar, &mut point).map_err(|e| {
            SnapError::InvalidProjection(format!(
                "Cannot project ({}, {}) into {}: {e}",
                coord.x, coord.y, self.id
            ))
        })?;
        Ok(Coord {
            x: point.0,
            y: point.1,
        })
    }

    /// Planar (easting, northing) back to geographic (lon, lat)
    pub fn inverse(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = (coord.x, coord.y, 0.0);
        transform(&self.planar, &self.geographic, &mut point).map_err(|e| {
            SnapError::InvalidProjection(format!(
                "Cannot convert ({}, {}) from {} to lon/lat: {e}",
                coord.x, coord.y, self.id
            ))
        })?;
        Ok(Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        })
    }

    /// Project a polyline, validating it along the way
    pub fn forward_line(&self, line: &LineString<f64>) -> Result<LineString<f64>> {
        validate_line(line)?;
        line.0
            .iter()
            .map(|&c| self.forward(c))
            .collect::<Result<Vec<_>>>()
            .map(LineString::new)
    }

    pub fn inverse_line(&self, line: &LineString<f64>) -> Result<LineString<f64>> {
        line.0
            .iter()
            .map(|&c| self.inverse(c))
            .collect::<Result<Vec<_>>>()
            .map(LineString::new)
    }
}

fn parse_proj4(definition: &str) -> Result<Proj> {
    Proj::from_proj_string(definition)
        .map_err(|e| SnapError::InvalidProjection(format!("{definition}: {e}")))
}

/// Project geographic polylines into a planar system
///
/// With `id = None` the UTM zone at the centre of the lines' extent is used.
/// Fails with `InvalidGeometry` on an empty input or a line with fewer than 2 coordinates.
pub fn to_planar(
    lines: &[LineString<f64>],
    id: Option<ProjectionId>,
) -> Result<(Vec<LineString<f64>>, ProjectionId)> {
    #[cfg(feature = "profiling")]
    profiling::scope!("projection::to_planar");

    if lines.is_empty() {
        return Err(SnapError::InvalidGeometry("No lines in input".to_string()));
    }
    for line in lines {
        validate_line(line)?;
    }

    let projection = match id {
        Some(id) => Projection::new(id)?,
        None => Projection::for_extent(lines)?,
    };
    let planar = lines
        .iter()
        .map(|line| projection.forward_line(line))
        .collect::<Result<Vec<_>>>()?;

    Ok((planar, projection.id()))
}

/// Convert planar polylines back to geographic coordinates
pub fn to_geographic(lines: &[LineString<f64>], id: ProjectionId) -> Result<Vec<LineString<f64>>> {
    if lines.is_empty() {
        return Err(SnapError::InvalidGeometry("No lines in input".to_string()));
    }
    let projection = Projection::new(id)?;
    lines
        .iter()
        .map(|line| {
            validate_line(line)?;
            projection.inverse_line(line)
        })
        .collect()
}

fn validate_line(line: &LineString<f64>) -> Result<()> {
    if line.0.len() < 2 {
        return Err(SnapError::InvalidGeometry(format!(
            "Line needs at least 2 coordinates, got {}",
            line.0.len()
        )));
    }
    Ok(())
}

fn validate_geographic(coord: Coord<f64>) -> Result<()> {
    let valid = coord.x.is_finite()
        && coord.y.is_finite()
        && (-180.0..=180.0).contains(&coord.x)
        && (-90.0..=90.0).contains(&coord.y);
    if !valid {
        return Err(SnapError::InvalidCoordinate {
            lon: coord.x,
            lat: coord.y,
        });
    }
    Ok(())
}
