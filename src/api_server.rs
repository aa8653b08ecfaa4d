// Axum API Server Module
//
// Purpose: REST API over the emissions calculator
// Endpoints: welcome, health, raw factor data, household calculation

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use anyhow::Context;

use crate::calculator::{
    default_country, CalculationError, CalculationInput, ElectricityInput, EmissionsCalculator,
    Estimate, TransportInput,
};
use crate::factors::FactorTable;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub calculator: Arc<EmissionsCalculator>,
}

impl AppState {
    /// Load the emissions dataset and build the calculator
    pub fn new(dataset_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = dataset_path.as_ref();
        let factors = FactorTable::load(path)
            .with_context(|| format!("Failed to load emissions dataset {}", path.display()))?;
        Ok(Self::from_factors(factors))
    }

    pub fn from_factors(factors: FactorTable) -> Self {
        Self {
            calculator: Arc::new(EmissionsCalculator::new(Arc::new(factors))),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        .route("/emissions-data", get(get_emissions_data))
        .route("/calculate", post(calculate_emissions))
        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new()) // gzip + brotli compression
        .layer(CorsLayer::permissive()) // Browser frontend runs on another origin
        .layer(TraceLayer::new_for_http()) // Request logging
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn welcome() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Welcome to the Carbon Footprint Estimator API"
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// The emissions dataset exactly as loaded
async fn get_emissions_data(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.calculator.factors().raw().clone())
}

async fn calculate_emissions(
    State(state): State<AppState>,
    Json(payload): Json<CalculationRequest>,
) -> Result<Json<Estimate>, AppError> {
    let input = CalculationInput::from(payload);

    let estimate = state.calculator.estimate(&input)?;

    tracing::info!(
        "Calculated footprint for {}: total {} (national average {})",
        input.country,
        estimate.results.total,
        estimate.national_average
    );

    Ok(Json(estimate))
}

/// Request body for `/calculate`. All three sections must be present;
/// fields inside them default to zero.
#[derive(Debug, serde::Deserialize)]
struct CalculationRequest {
    transport: TransportInput,
    diet: String,
    electricity: ElectricityInput,
    #[serde(default = "default_country")]
    country: String,
}

impl From<CalculationRequest> for CalculationInput {
    fn from(req: CalculationRequest) -> Self {
        Self {
            transport: Some(req.transport),
            diet: Some(req.diet),
            electricity: Some(req.electricity),
            country: req.country,
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum AppError {
    Internal(String),
}

impl From<CalculationError> for AppError {
    fn from(err: CalculationError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        tracing::warn!("Request failed: {}", message);

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
