//! Sampling stations and their scalar attributes

use crate::{Projection, ProjectionId, Result, SnapError};
use geo::Coord;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique station identifier (`STAT_ID`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StationId(pub i64);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StationId {
    type Err = SnapError;

    /// Accepts integers and integral floats (`"42"`, `" 42.0 "`)
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Ok(StationId(id));
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                Ok(StationId(v as i64))
            }
            _ => Err(SnapError::InvalidStationId(s.to_string())),
        }
    }
}

/// Named numeric attributes of a station
///
/// An attribute is either present with a number, or absent. NaN is never stored: setting
/// one removes the attribute, so "missing" and "zero" stay distinct.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Attributes(BTreeMap<String, f64>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear an attribute (`None` and NaN both clear it)
    pub fn set(&mut self, name: impl Into<String>, value: Option<f64>) {
        let name = name.into();
        match value {
            Some(v) if !v.is_nan() => {
                self.0.insert(name, v);
            }
            _ => {
                self.0.remove(&name);
            }
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, Some(value));
        self
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Names from `required` that are absent
    pub fn missing<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|name| !self.contains(name))
            .map(String::as_str)
            .collect()
    }

    /// Copy every attribute of `other` whose name is not already present
    pub fn fill_from(&mut self, other: &Attributes) {
        for (name, value) in &other.0 {
            self.0.entry(name.clone()).or_insert(*value);
        }
    }

    /// Attributes sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.set(name, Some(value));
        }
        attributes
    }
}

/// A sampling station: identifier, location and attributes
///
/// The location is geographic (x = longitude, y = latitude) until the station is placed in a
/// [`PlanarStations`] batch, where it is expressed in that batch's projection.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Station {
    pub id: StationId,
    pub location: Coord<f64>,
    pub attributes: Attributes,
}

impl Station {
    pub fn new(id: StationId, location: Coord<f64>) -> Self {
        Self {
            id,
            location,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Stations whose locations are expressed in a known planar projection
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanarStations {
    projection: ProjectionId,
    stations: Vec<Station>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PlanarStations {
    /// Project geographic stations into `projection`
    ///
    /// Fails with `InvalidCoordinate` if a station lies outside the valid lon/lat range.
    pub fn project(stations: &[Station], projection: ProjectionId) -> Result<Self> {
        let transform = Projection::new(projection)?;
        let stations = stations
            .iter()
            .map(|station| {
                Ok(Station {
                    id: station.id,
                    location: transform.forward(station.location)?,
                    attributes: station.attributes.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            projection,
            stations,
        })
    }

    /// Wrap stations that are already in planar coordinates
    pub fn from_planar(projection: ProjectionId, stations: Vec<Station>) -> Self {
        Self {
            projection,
            stations,
        }
    }

    #[inline]
    pub fn projection(&self) -> ProjectionId {
        self.projection
    }

    #[inline]
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_id_parsing() {
        assert_eq!("42".parse::<StationId>().unwrap(), StationId(42));
        assert_eq!(" 42.0 ".parse::<StationId>().unwrap(), StationId(42));
        assert_eq!("-7".parse::<StationId>().unwrap(), StationId(-7));
        assert!("42.5".parse::<StationId>().is_err());
        assert!("abc".parse::<StationId>().is_err());
        assert!("NaN".parse::<StationId>().is_err());
        assert_eq!(StationId(1001).to_string(), "1001");
    }

    #[test]
    fn test_missing_is_distinct_from_zero() {
        let mut attributes = Attributes::new();
        attributes.set("pH", Some(0.0));
        attributes.set("dDICdTA", None);
        assert_eq!(attributes.get("pH"), Some(0.0));
        assert_eq!(attributes.get("dDICdTA"), None);
        assert!(attributes.contains("pH"));
        assert!(!attributes.contains("dDICdTA"));
    }

    #[test]
    fn test_nan_clears_attribute() {
        let mut attributes = Attributes::new().with("pH", 7.9);
        attributes.set("pH", Some(f64::NAN));
        assert!(attributes.is_empty());
    }

    #[test]
    fn test_missing_fields() {
        let attributes: Attributes = [("pH", 8.1)].into_iter().collect();
        let required = vec!["pH".to_string(), "dDICdTA".to_string()];
        assert_eq!(attributes.missing(&required), vec!["dDICdTA"]);
    }

    #[test]
    fn test_fill_from_keeps_own_values() {
        let mut own = Attributes::new().with("pH", 7.5);
        let aux = Attributes::new().with("pH", 9.9).with("dDICdTA", 0.93);
        own.fill_from(&aux);
        assert_eq!(own.get("pH"), Some(7.5));
        assert_eq!(own.get("dDICdTA"), Some(0.93));
        assert_eq!(own.names().collect::<Vec<_>>(), vec!["dDICdTA", "pH"]);
    }

    #[test]
    fn test_project_stations() {
        let stations = vec![
            Station::new(StationId(1), Coord { x: -93.0, y: 45.0 }),
            Station::new(StationId(2), Coord { x: -90.2, y: 38.6 })
                .with_attributes(Attributes::new().with("pH", 8.0)),
        ];
        let id = ProjectionId::utm(15, true).unwrap();
        let planar = PlanarStations::project(&stations, id).unwrap();
        assert_eq!(planar.len(), 2);
        assert_eq!(planar.projection(), id);
        assert!((planar.stations()[0].location.x - 500_000.0).abs() < 1e-6);
        assert_eq!(planar.stations()[1].attributes.get("pH"), Some(8.0));
        assert_eq!(planar.stations()[1].id, StationId(2));
    }

    #[test]
    fn test_project_rejects_bad_coordinate() {
        let stations = vec![Station::new(StationId(1), Coord { x: -93.0, y: 95.0 })];
        let id = ProjectionId::utm(15, true).unwrap();
        assert!(matches!(
            PlanarStations::project(&stations, id),
            Err(SnapError::InvalidCoordinate { .. })
        ));
    }
}
