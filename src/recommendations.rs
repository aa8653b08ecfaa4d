//! Rule-based recommendations
//!
//! Thresholds are checked independently against the three top-level
//! subtotals. Messages are appended transport → diet → electricity, and the
//! positive message is returned only when no rule fired.

use crate::calculator::CalculationResult;

/// kg CO2e per year above which each category gets advice
pub const TRANSPORT_THRESHOLD: f64 = 4000.0;
pub const DIET_THRESHOLD: f64 = 2000.0;
pub const ELECTRICITY_THRESHOLD: f64 = 3000.0;

pub const TRANSPORT_CARPOOL: &str =
    "🚗 Transport: Consider carpooling or switching to an EV to reduce driving emissions.";
pub const TRANSPORT_FLIGHT: &str =
    "✈️ Transport: Try to replace one long-haul flight with a local vacation or train trip.";
pub const DIET_MEAT: &str =
    "🍽️ Diet: Reducing meat consumption, even by one day a week (Meatless Mondays), can significantly lower your footprint.";
pub const ENERGY_LED: &str =
    "⚡ Energy: Switch to LED bulbs and unplug electronics when not in use.";
pub const ENERGY_GREEN: &str =
    "☀️ Energy: Determine if your utility provider offers a Green Energy option.";
pub const LOW_FOOTPRINT: &str =
    "🌟 Great job! Your carbon footprint is relatively low. Keep maintaining your sustainable habits.";

/// Advice for a calculated footprint. Never empty.
pub fn get_recommendations(result: &CalculationResult) -> Vec<String> {
    let mut recommendations: Vec<&str> = Vec::new();

    if result.transport > TRANSPORT_THRESHOLD {
        recommendations.extend([TRANSPORT_CARPOOL, TRANSPORT_FLIGHT]);
    }

    if result.diet.value() > DIET_THRESHOLD {
        recommendations.push(DIET_MEAT);
    }

    if result.electricity > ELECTRICITY_THRESHOLD {
        recommendations.extend([ENERGY_LED, ENERGY_GREEN]);
    }

    if recommendations.is_empty() {
        recommendations.push(LOW_FOOTPRINT);
    }

    recommendations.into_iter().map(String::from).collect()
}
