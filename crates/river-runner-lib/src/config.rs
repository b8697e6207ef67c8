//! Configuration for a snapping run

use crate::{ProjectionId, Result, SnapError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default search radius and snap tolerance, in planar units (metres)
pub const DEFAULT_TOLERANCE: f64 = 1000.0;

/// Attributes a station must carry to appear in the assembled table
pub const DEFAULT_REQUIRED_FIELDS: [&str; 2] = ["pH", "dDICdTA"];

/// How the planar projection is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProjectionChoice {
    /// UTM zone at the centre of the network's geographic extent
    #[default]
    Auto,
    /// A fixed projection, e.g. a regional UTM zone
    Fixed(ProjectionId),
}

impl ProjectionChoice {
    /// The forced projection, `None` for automatic selection
    #[inline]
    pub fn fixed_id(&self) -> Option<ProjectionId> {
        match self {
            ProjectionChoice::Auto => None,
            ProjectionChoice::Fixed(id) => Some(*id),
        }
    }
}

/// Configuration for a snapping run
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SnapConfig {
    /// Maximum snap distance, also used as the candidate search offset.
    /// Default: 1000
    pub tolerance: f64,
    /// Planar projection used for all distance computations.
    /// Default: automatic UTM zone
    pub projection: ProjectionChoice,
    /// Attributes that must be present (after the auxiliary join) for a row to be kept.
    /// Default: `pH` and `dDICdTA`
    pub required_fields: Vec<String>,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            projection: ProjectionChoice::Auto,
            required_fields: DEFAULT_REQUIRED_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

impl SnapConfig {
    /// Check the configuration before a run
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SnapError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_projection(mut self, projection: ProjectionChoice) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}
