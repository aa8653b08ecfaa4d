//! Emissions Calculator
//!
//! Turns the user's transport, diet and electricity inputs into per-category
//! subtotals, a total and an itemized breakdown, then packages them with
//! recommendations and the national average for the chosen country.
//!
//! Rounding order is part of the output contract: per-mode transport figures
//! are rounded for the breakdown, the transport subtotal is rounded from the
//! unrounded per-mode sum, and the total is rounded from the stored subtotals.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::sync::Arc;
use thiserror::Error;

use crate::factors::{FactorTable, Figure};
use crate::recommendations::get_recommendations;

/// National average reported when the country is not in the dataset
pub const GLOBAL_AVERAGE_FALLBACK: u64 = 4700;

/// Country assumed when the request names none
pub const DEFAULT_COUNTRY: &str = "USA";

pub(crate) fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

#[derive(Debug, Error)]
pub enum CalculationError {
    /// The value cannot be represented in a JSON response
    #[error("{category} emissions are out of range ({value})")]
    NonFinite { category: &'static str, value: f64 },
}

/// Annual miles per transport mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct TransportInput {
    #[serde(default)]
    pub car_miles: f64,
    #[serde(default)]
    pub flight_miles: f64,
    #[serde(default)]
    pub public_transit_miles: f64,
}

/// Annual household electricity usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct ElectricityInput {
    #[serde(default)]
    pub usage_kwh: f64,
}

/// One household's inputs. Absent sections contribute nothing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CalculationInput {
    #[serde(default)]
    pub transport: Option<TransportInput>,
    /// Free-form, matched case-insensitively
    #[serde(default)]
    pub diet: Option<String>,
    #[serde(default)]
    pub electricity: Option<ElectricityInput>,
    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for CalculationInput {
    fn default() -> Self {
        Self {
            transport: None,
            diet: None,
            electricity: None,
            country: default_country(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransportBreakdown {
    pub car: f64,
    pub flight: f64,
    pub public_transit: f64,
}

/// Itemized detail behind the subtotals
///
/// `diet` is only filled when the requested diet was found in the table;
/// the omnivore fallback leaves it empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdown {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diet: Option<Figure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electricity: Option<f64>,
}

/// kg CO2e per year, by category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalculationResult {
    pub transport: f64,
    /// Table value as written, not rounded
    pub diet: Figure,
    pub electricity: f64,
    pub total: f64,
    pub breakdown: Breakdown,
}

/// Full answer to a calculation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub results: CalculationResult,
    pub recommendations: Vec<String>,
    pub national_average: Number,
}

/// Round to 2 decimal places, half-to-even on the exact binary value.
///
/// Fixed-precision formatting rounds the exact decimal expansion of the
/// float, so 2.675 (stored as 2.67499...) becomes 2.67 and the tie 0.125
/// becomes 0.12.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Stateless calculator over a shared factor table
#[derive(Debug, Clone)]
pub struct EmissionsCalculator {
    factors: Arc<FactorTable>,
}

impl EmissionsCalculator {
    pub fn new(factors: Arc<FactorTable>) -> Self {
        Self { factors }
    }

    pub fn factors(&self) -> &FactorTable {
        &self.factors
    }

    /// Compute subtotals, total and breakdown for `input`
    pub fn calculate(&self, input: &CalculationInput) -> Result<CalculationResult, CalculationError> {
        let mut result = CalculationResult::default();

        if let Some(transport) = &input.transport {
            let factors = self.factors.transport();
            let car = transport.car_miles * factors.car;
            let flight = transport.flight_miles * factors.flight;
            let public_transit = transport.public_transit_miles * factors.public_transit;

            result.transport = round2(car + flight + public_transit);
            result.breakdown.transport = Some(TransportBreakdown {
                car: round2(car),
                flight: round2(flight),
                public_transit: round2(public_transit),
            });
        }

        if let Some(diet) = &input.diet {
            let diet = diet.to_lowercase();
            match self.factors.diet(&diet) {
                Some(per_year) => {
                    result.diet = per_year.clone();
                    result.breakdown.diet = Some(per_year.clone());
                }
                None => {
                    tracing::debug!("Unknown diet '{}', using {}", diet, crate::factors::FALLBACK_DIET);
                    result.diet = self.factors.fallback_diet().clone();
                }
            }
        }

        if let Some(electricity) = &input.electricity {
            result.electricity = round2(electricity.usage_kwh * self.factors.electricity_per_kwh());
            result.breakdown.electricity = Some(result.electricity);
        }

        result.total = round2(result.transport + result.diet.value() + result.electricity);

        for (category, value) in [
            ("transport", result.transport),
            ("diet", result.diet.value()),
            ("electricity", result.electricity),
            ("total", result.total),
        ] {
            if !value.is_finite() {
                return Err(CalculationError::NonFinite { category, value });
            }
        }

        Ok(result)
    }

    /// Dataset average for `country`, or the global fallback
    pub fn national_average(&self, country: &str) -> Number {
        self.factors
            .national_average(country)
            .cloned()
            .unwrap_or_else(|| Number::from(GLOBAL_AVERAGE_FALLBACK))
    }

    /// Calculate, recommend and compare in one step
    pub fn estimate(&self, input: &CalculationInput) -> Result<Estimate, CalculationError> {
        let results = self.calculate(input)?;
        let recommendations = get_recommendations(&results);
        let national_average = self.national_average(&input.country);

        Ok(Estimate {
            results,
            recommendations,
            national_average,
        })
    }
}
