use clap::{Parser, ValueEnum};
use river_runner_lib::{
    DEFAULT_REQUIRED_FIELDS, DEFAULT_TOLERANCE, ProjectionChoice, ProjectionId, SnapConfig,
};
use std::path::PathBuf;

/// Output table encoding
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    #[value(name = "geojson")]
    GeoJson,
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// River Runner - Snap water-chemistry sampling stations onto a river flow path
pub struct Settings {
    /// GeoJSON FeatureCollection of river LineStrings, in flow order
    #[clap(short, long, value_name = "FILE", env = "RIVER_RUNNER_NETWORK")]
    pub network: PathBuf,

    /// Stations CSV with STAT_ID, Latitude, Longitude and numeric attribute columns
    #[clap(short, long, value_name = "FILE", env = "RIVER_RUNNER_STATIONS")]
    pub stations: PathBuf,

    /// Per-station aggregates CSV (STAT_ID plus numeric columns) joined into the output
    #[clap(short, long, value_name = "FILE", env = "RIVER_RUNNER_AGGREGATES")]
    pub aggregates: Option<PathBuf>,

    /// Maximum snap distance in metres
    #[clap(short, long, default_value_t = DEFAULT_TOLERANCE, env = "RIVER_RUNNER_TOLERANCE")]
    pub tolerance: f64,

    /// Force a UTM zone (1-60) instead of picking one from the network extent
    #[clap(long, value_parser = clap::value_parser!(u8).range(1..=60), env = "RIVER_RUNNER_UTM_ZONE")]
    pub utm_zone: Option<u8>,

    /// Use the southern hemisphere variant of the forced UTM zone
    #[clap(long, requires = "utm_zone", env = "RIVER_RUNNER_SOUTH")]
    pub south: bool,

    /// Attribute a station must carry to be kept (repeatable)
    #[clap(
        short = 'r',
        long = "require",
        value_name = "FIELD",
        value_delimiter = ',',
        default_values_t = DEFAULT_REQUIRED_FIELDS.map(String::from),
        env = "RIVER_RUNNER_REQUIRE"
    )]
    pub required_fields: Vec<String>,

    /// Keep stations regardless of missing attributes
    #[clap(long, conflicts_with = "required_fields", env = "RIVER_RUNNER_KEEP_INCOMPLETE")]
    pub keep_incomplete: bool,

    /// Only keep station rows whose Country column equals this value
    #[clap(long, value_name = "CODE", env = "RIVER_RUNNER_COUNTRY")]
    pub country: Option<String>,

    /// Output file (stdout when omitted)
    #[clap(short, long, value_name = "FILE", env = "RIVER_RUNNER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output format
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Csv, env = "RIVER_RUNNER_FORMAT")]
    pub format: OutputFormat,
}

impl Settings {
    /// Library configuration described by these settings
    pub fn snap_config(&self) -> anyhow::Result<SnapConfig> {
        let projection = match self.utm_zone {
            Some(zone) => ProjectionChoice::Fixed(ProjectionId::utm(zone, !self.south)?),
            None => ProjectionChoice::Auto,
        };
        let required_fields = if self.keep_incomplete {
            Vec::new()
        } else {
            self.required_fields.clone()
        };

        let config = SnapConfig::default()
            .with_tolerance(self.tolerance)
            .with_projection(projection)
            .with_required_fields(required_fields);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Settings, clap::Error> {
        let mut argv = vec!["river-runner", "--network", "river.geojson", "--stations", "st.csv"];
        argv.extend_from_slice(args);
        Settings::try_parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]).unwrap();
        assert_eq!(settings.tolerance, 1000.0);
        assert_eq!(settings.required_fields, vec!["pH", "dDICdTA"]);
        assert_eq!(settings.format, OutputFormat::Csv);
        assert!(settings.output.is_none());

        let config = settings.snap_config().unwrap();
        assert_eq!(config.projection, ProjectionChoice::Auto);
        assert_eq!(config.required_fields, vec!["pH", "dDICdTA"]);
    }

    #[test]
    fn test_forced_zone() {
        let config = parse(&["--utm-zone", "19", "--south"])
            .unwrap()
            .snap_config()
            .unwrap();
        assert_eq!(
            config.projection,
            ProjectionChoice::Fixed(ProjectionId::utm(19, false).unwrap())
        );
        assert!(parse(&["--utm-zone", "61"]).is_err());
        assert!(parse(&["--south"]).is_err());
    }

    #[test]
    fn test_required_fields() {
        let settings = parse(&["--require", "pH", "-r", "alk,temp"]).unwrap();
        assert_eq!(settings.required_fields, vec!["pH", "alk", "temp"]);

        let config = parse(&["--keep-incomplete"]).unwrap().snap_config().unwrap();
        assert!(config.required_fields.is_empty());
    }

    #[test]
    fn test_format_and_tolerance() {
        let settings = parse(&["-f", "geojson", "-t", "250"]).unwrap();
        assert_eq!(settings.format, OutputFormat::GeoJson);
        assert_eq!(settings.snap_config().unwrap().tolerance, 250.0);

        assert!(parse(&["--tolerance=-3"]).unwrap().snap_config().is_err());
    }
}
