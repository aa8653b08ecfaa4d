//! Carbon Footprint Estimator
//!
//! Estimates a household's annual emissions from transport mileage, diet and
//! electricity usage against a static emissions-factor table.
//!
//! - `factors/`: Dataset loading and typed factor lookups
//! - `calculator/`: Subtotals, breakdown and totals
//! - `recommendations/`: Threshold-based advice
//! - `config/`: Server settings from the environment
//! - `api_server/`: Axum REST API (feature `api`)

pub mod factors;
pub mod calculator;
pub mod recommendations;
pub mod config;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use factors::{FactorTable, FactorTableError, Figure, TransportFactors};
pub use calculator::{
    round2, Breakdown, CalculationError, CalculationInput, CalculationResult, ElectricityInput,
    EmissionsCalculator, Estimate, TransportBreakdown, TransportInput,
};
pub use recommendations::get_recommendations;
pub use config::ServerConfig;

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
