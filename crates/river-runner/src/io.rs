//! File formats of the command line front end
//!
//! Inputs: a GeoJSON river network, a stations CSV and an optional aggregates CSV.
//! Outputs: the assembled table as CSV or as a GeoJSON FeatureCollection of points.

use anyhow::{Context, bail};
use geo::LineString;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use river_runner_lib::{Aggregates, Assembly, Attributes, Station, StationId, lines_from_features};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const STATION_ID_COLUMN: &str = "STAT_ID";
const LATITUDE_COLUMN: &str = "Latitude";
const LONGITUDE_COLUMN: &str = "Longitude";
const COUNTRY_COLUMN: &str = "Country";

/// Stations read from a CSV, plus how many rows were left out
#[derive(Debug, Default)]
pub struct StationTable {
    pub stations: Vec<Station>,
    /// Rows without a usable id or location
    pub unreadable: usize,
    /// Rows removed by the country filter
    pub filtered: usize,
}

pub fn read_network(path: &Path) -> anyhow::Result<Vec<LineString<f64>>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open network {}", path.display()))?;
    parse_network(BufReader::new(file))
        .with_context(|| format!("Failed to read network {}", path.display()))
}

/// Parse a GeoJSON FeatureCollection of LineStrings
pub fn parse_network<R: Read>(reader: R) -> anyhow::Result<Vec<LineString<f64>>> {
    let collection = match GeoJson::from_reader(reader)? {
        GeoJson::FeatureCollection(collection) => collection,
        GeoJson::Feature(_) => bail!("Expected a FeatureCollection, found a single Feature"),
        GeoJson::Geometry(_) => bail!("Expected a FeatureCollection, found a bare Geometry"),
    };
    let lines = lines_from_features(&collection)?;
    tracing::debug!("Read {} river lines", lines.len());
    Ok(lines)
}

pub fn read_stations(path: &Path, country: Option<&str>) -> anyhow::Result<StationTable> {
    let file =
        File::open(path).with_context(|| format!("Failed to open stations {}", path.display()))?;
    parse_stations(BufReader::new(file), country)
        .with_context(|| format!("Failed to read stations {}", path.display()))
}

/// Parse a stations CSV
///
/// `STAT_ID`, `Latitude` and `Longitude` are required columns. Every other column except
/// `Country` becomes a numeric attribute; cells that are empty or not a number are absent.
pub fn parse_stations<R: Read>(reader: R, country: Option<&str>) -> anyhow::Result<StationTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let id_col = column(&headers, STATION_ID_COLUMN)?;
    let lat_col = column(&headers, LATITUDE_COLUMN)?;
    let lon_col = column(&headers, LONGITUDE_COLUMN)?;
    let country_col = headers.iter().position(|h| h == COUNTRY_COLUMN);
    if country.is_some() && country_col.is_none() {
        tracing::warn!("No {} column in stations, country filter ignored", COUNTRY_COLUMN);
    }

    let attribute_cols: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != id_col && i != lat_col && i != lon_col && Some(i) != country_col)
        .collect();

    let mut table = StationTable::default();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;

        if let (Some(wanted), Some(col)) = (country, country_col) {
            if record.get(col) != Some(wanted) {
                table.filtered += 1;
                continue;
            }
        }

        let id = record.get(id_col).and_then(|s| s.parse::<StationId>().ok());
        let lat = record.get(lat_col).and_then(parse_number);
        let lon = record.get(lon_col).and_then(parse_number);
        let (Some(id), Some(lat), Some(lon)) = (id, lat, lon) else {
            tracing::warn!("Skipping station row {}: unusable id or location", row + 1);
            table.unreadable += 1;
            continue;
        };

        let mut attributes = Attributes::new();
        for &(col, name) in &attribute_cols {
            attributes.set(name, record.get(col).and_then(parse_number));
        }

        table.stations.push(
            Station::new(id, geo::Coord { x: lon, y: lat }).with_attributes(attributes),
        );
    }

    tracing::debug!(
        "Read {} stations ({} unreadable, {} filtered by country)",
        table.stations.len(),
        table.unreadable,
        table.filtered
    );
    Ok(table)
}

pub fn read_aggregates(path: &Path) -> anyhow::Result<Aggregates> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open aggregates {}", path.display()))?;
    parse_aggregates(BufReader::new(file))
        .with_context(|| format!("Failed to read aggregates {}", path.display()))
}

/// Parse an aggregates CSV: `STAT_ID` plus numeric columns, one row per station
pub fn parse_aggregates<R: Read>(reader: R) -> anyhow::Result<Aggregates> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let id_col = column(&headers, STATION_ID_COLUMN)?;

    let mut aggregates = Aggregates::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let Some(id) = record.get(id_col).and_then(|s| s.parse::<StationId>().ok()) else {
            tracing::warn!("Skipping aggregate row {}: unusable {}", row + 1, STATION_ID_COLUMN);
            continue;
        };

        let mut attributes = Attributes::new();
        for (col, name) in headers.iter().enumerate().filter(|&(i, _)| i != id_col) {
            attributes.set(name, record.get(col).and_then(parse_number));
        }
        if aggregates.insert(id, attributes).is_some() {
            tracing::warn!("Station {} appears twice in aggregates, keeping the last row", id);
        }
    }

    Ok(aggregates)
}

/// Writer for `path`, or stdout when no path is given
pub fn create_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    })
}

/// Write the table as CSV
///
/// Columns: `index, STAT_ID, line_i, snap_dist, Longitude, Latitude`, then every attribute
/// name in sorted order. Absent attributes are empty cells.
pub fn write_csv<W: Write>(writer: W, assembly: &Assembly) -> anyhow::Result<()> {
    let names = assembly.attribute_names();
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![
        "index",
        STATION_ID_COLUMN,
        "line_i",
        "snap_dist",
        LONGITUDE_COLUMN,
        LATITUDE_COLUMN,
    ];
    header.extend(names.iter().map(String::as_str));
    wtr.write_record(&header)?;

    for row in &assembly.rows {
        let mut record = vec![
            row.display_index.to_string(),
            row.station_id.to_string(),
            row.line_index.to_string(),
            row.snap_distance.to_string(),
            row.location.x.to_string(),
            row.location.y.to_string(),
        ];
        record.extend(
            names
                .iter()
                .map(|name| row.attributes.get(name).map_or(String::new(), |v| v.to_string())),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the table as a GeoJSON FeatureCollection of points
pub fn write_geojson<W: Write>(writer: W, assembly: &Assembly) -> anyhow::Result<()> {
    let features = assembly
        .rows
        .iter()
        .map(|row| {
            let mut properties = JsonObject::new();
            properties.insert("index".into(), row.display_index.into());
            properties.insert(STATION_ID_COLUMN.into(), row.station_id.0.into());
            properties.insert("line_i".into(), row.line_index.into());
            properties.insert("snap_dist".into(), row.snap_distance.into());
            for (name, value) in row.attributes.iter() {
                properties.insert(name.to_string(), value.into());
            }
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    row.location.x,
                    row.location.y,
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    });
    serde_json::to_writer_pretty(writer, &collection)?;
    Ok(())
}

fn column(headers: &csv::StringRecord, name: &str) -> anyhow::Result<usize> {
    match headers.iter().position(|h| h == name) {
        Some(i) => Ok(i),
        None => bail!("Missing required column {}", name),
    }
}

/// A finite number, `None` for empty, `NA`, `NaN` or unparsable cells
fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}
