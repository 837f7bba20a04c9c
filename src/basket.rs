//! What-if valuation of a two-currency basket built from adjusted rates
//!
//! Each adjusted rate is shocked by a percentage and the two are combined
//! with weights `w_a` and `w_b = 1 - w_a`. Rows are produced on a date axis
//! chosen by an explicit [`AlignmentPolicy`].

use crate::error::{DashboardError, Result};
use crate::types::{Fraction, Rate, ReferenceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Largest absolute shock accepted (10%)
pub const MAX_SHOCK: Fraction = 0.10;

/// How the two adjusted series and the reference axis are lined up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentPolicy {
    /// Keep dates present in A, B and the reference axis
    #[default]
    Inner,
    /// Pair rows by position, truncated to the shortest input and dated by the reference axis
    Positional,
}

impl FromStr for AlignmentPolicy {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "inner" => Ok(AlignmentPolicy::Inner),
            "positional" => Ok(AlignmentPolicy::Positional),
            other => Err(DashboardError::ConfigError(format!(
                "Unknown alignment policy '{}', expected inner or positional",
                other
            ))),
        }
    }
}

impl fmt::Display for AlignmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AlignmentPolicy::Inner => f.write_str("inner"),
            AlignmentPolicy::Positional => f.write_str("positional"),
        }
    }
}

/// Basket weights. Only `w_a` is stored; `w_b` is always `1 - w_a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasketWeights {
    weight_a: Fraction,
}

impl BasketWeights {
    pub fn new(weight_a: Fraction) -> Result<Self> {
        if !(0.0..=1.0).contains(&weight_a) {
            return Err(DashboardError::ParameterRange {
                name: "weight_a",
                value: weight_a,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self { weight_a })
    }

    pub fn a(&self) -> Fraction {
        self.weight_a
    }

    pub fn b(&self) -> Fraction {
        1.0 - self.weight_a
    }
}

/// Shocks and weights of one simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasketScenario {
    pub shock_a: Fraction,
    pub shock_b: Fraction,
    pub weights: BasketWeights,
}

impl BasketScenario {
    pub fn new(shock_a: Fraction, shock_b: Fraction, weight_a: Fraction) -> Result<Self> {
        validate_shock("shock_a", shock_a)?;
        validate_shock("shock_b", shock_b)?;
        Ok(Self {
            shock_a,
            shock_b,
            weights: BasketWeights::new(weight_a)?,
        })
    }

    /// `w_a * a * (1 + shock_a) + w_b * b * (1 + shock_b)`
    pub fn value(&self, adjusted_a: Rate, adjusted_b: Rate) -> (Rate, Rate, Rate) {
        let sim_a = adjusted_a * (1.0 + self.shock_a);
        let sim_b = adjusted_b * (1.0 + self.shock_b);
        let basket = self.weights.a() * sim_a + self.weights.b() * sim_b;
        (sim_a, sim_b, basket)
    }
}

fn validate_shock(name: &'static str, shock: Fraction) -> Result<()> {
    if !(-MAX_SHOCK..=MAX_SHOCK).contains(&shock) {
        return Err(DashboardError::ParameterRange {
            name,
            value: shock,
            min: -MAX_SHOCK,
            max: MAX_SHOCK,
        });
    }
    Ok(())
}

/// One dated row of the basket simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasketRow {
    pub date: NaiveDate,
    /// Reference cross rate on that date, when the reference sheet carries one
    pub reference_rate: Option<Rate>,
    pub simulated_a: Rate,
    pub simulated_b: Rate,
    pub basket_value: Rate,
}

/// Simulate the basket over the aligned dates of `adjusted_a`, `adjusted_b`
/// and `reference`. An empty reference falls back to the dates of A.
pub fn simulate_basket(
    adjusted_a: &[(NaiveDate, Rate)],
    adjusted_b: &[(NaiveDate, Rate)],
    reference: &ReferenceSeries,
    scenario: &BasketScenario,
    policy: AlignmentPolicy,
) -> Vec<BasketRow> {
    let axis: Vec<(NaiveDate, Option<Rate>)> = if reference.is_empty() {
        log::debug!("reference axis is empty, using the dates of series A");
        adjusted_a.iter().map(|&(d, _)| (d, None)).collect()
    } else {
        reference
            .observations()
            .iter()
            .map(|o| (o.date, o.cross_rate))
            .collect()
    };

    let rows: Vec<BasketRow> = match policy {
        AlignmentPolicy::Inner => {
            let by_date_a: BTreeMap<NaiveDate, Rate> = adjusted_a.iter().copied().collect();
            let by_date_b: BTreeMap<NaiveDate, Rate> = adjusted_b.iter().copied().collect();
            axis.iter()
                .filter_map(|&(date, reference_rate)| {
                    let a = by_date_a.get(&date)?;
                    let b = by_date_b.get(&date)?;
                    Some(make_row(date, reference_rate, *a, *b, scenario))
                })
                .collect()
        }
        AlignmentPolicy::Positional => {
            let n = adjusted_a.len().min(adjusted_b.len()).min(axis.len());
            if n < adjusted_a.len().max(adjusted_b.len()).max(axis.len()) {
                log::warn!(
                    "positional alignment truncates to {} rows (A={}, B={}, axis={})",
                    n,
                    adjusted_a.len(),
                    adjusted_b.len(),
                    axis.len()
                );
            }
            (0..n)
                .map(|i| {
                    let (date, reference_rate) = axis[i];
                    make_row(date, reference_rate, adjusted_a[i].1, adjusted_b[i].1, scenario)
                })
                .collect()
        }
    };

    log::info!("basket simulation: {} rows ({} alignment)", rows.len(), policy);
    rows
}

fn make_row(
    date: NaiveDate,
    reference_rate: Option<Rate>,
    a: Rate,
    b: Rate,
    scenario: &BasketScenario,
) -> BasketRow {
    let (simulated_a, simulated_b, basket_value) = scenario.value(a, b);
    BasketRow {
        date,
        reference_rate,
        simulated_a,
        simulated_b,
        basket_value,
    }
}
