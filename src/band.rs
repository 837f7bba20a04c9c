//! Symmetric fluctuation band around the central rate

use crate::error::{DashboardError, Result};
use crate::types::{Fraction, Rate};
use serde::{Deserialize, Serialize};

/// Widest band accepted (20%)
pub const MAX_BAND_FRACTION: Fraction = 0.20;

/// Lower and upper edge of the band for one observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lower: Rate,
    pub upper: Rate,
}

impl Band {
    /// `central * (1 - fraction)`, `central * (1 + fraction)`
    pub fn around(central: Rate, fraction: Fraction) -> Self {
        Self {
            lower: central * (1.0 - fraction),
            upper: central * (1.0 + fraction),
        }
    }

    pub fn contains(&self, rate: Rate) -> bool {
        self.lower <= rate && rate <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Check that `fraction` lies in `[0, MAX_BAND_FRACTION]`
pub fn validate_fraction(fraction: Fraction) -> Result<()> {
    if !(0.0..=MAX_BAND_FRACTION).contains(&fraction) {
        return Err(DashboardError::ParameterRange {
            name: "band_fraction",
            value: fraction,
            min: 0.0,
            max: MAX_BAND_FRACTION,
        });
    }
    Ok(())
}

/// Band for each central rate, same indexing
pub fn fluctuation_bands(central: &[Rate], fraction: Fraction) -> Result<Vec<Band>> {
    validate_fraction(fraction)?;
    Ok(central.iter().map(|&c| Band::around(c, fraction)).collect())
}
