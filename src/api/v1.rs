use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    api::error::ApiError,
    controller::AppState,
    domain::EnergySource,
    engine::ReuseRecycleInput,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/inputs", put(set_inputs))
        .route("/mix/:source", put(set_mix_slider))
        .route("/price", put(set_price))
        .route("/records", get(list_records).post(save_record).delete(clear_records))
        .route("/healthz", get(healthz))
        .with_state(state)
}

pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn get_status(State(st): State<AppState>) -> impl IntoResponse {
    Json(st.core.snapshot())
}

#[derive(Debug, Deserialize)]
pub struct InputsRequest {
    pub meter_reuse_pct: f64,
    pub housing_reman_pct: f64,
    pub impeller_reman_pct: f64,
    pub housing_recycle_pct: f64,
    pub impeller_recycle_pct: f64,
}

pub async fn set_inputs(
    State(st): State<AppState>,
    Json(req): Json<InputsRequest>,
) -> impl IntoResponse {
    let input = ReuseRecycleInput::clamped(
        req.meter_reuse_pct,
        req.housing_reman_pct,
        req.impeller_reman_pct,
        req.housing_recycle_pct,
        req.impeller_recycle_pct,
    );
    Json(st.core.set_inputs(input))
}

#[derive(Debug, Deserialize)]
pub struct SliderRequest {
    pub value_pct: f64,
}

pub async fn set_mix_slider(
    State(st): State<AppState>,
    Path(source): Path<String>,
    Json(req): Json<SliderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let source: EnergySource = source
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("unknown energy source: {source}")))?;
    Ok(Json(st.core.slider_change(source, req.value_pct)))
}

#[derive(Debug, Deserialize)]
pub struct PriceRequest {
    pub use_realtime: bool,
    /// Optional manual override of the realtime price.
    pub realtime_price_eur_per_kwh: Option<f64>,
}

pub async fn set_price(
    State(st): State<AppState>,
    Json(req): Json<PriceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(price) = req.realtime_price_eur_per_kwh {
        if !price.is_finite() || price < 0.0 {
            return Err(ApiError::BadRequest(format!(
                "price must be a non-negative number, got {price}"
            )));
        }
        st.core.set_realtime_price(price);
    }
    Ok(Json(st.core.set_realtime_enabled(req.use_realtime)))
}

pub async fn list_records(State(st): State<AppState>) -> impl IntoResponse {
    Json(st.core.records())
}

pub async fn save_record(State(st): State<AppState>) -> impl IntoResponse {
    (StatusCode::CREATED, Json(st.core.save_record()))
}

pub async fn clear_records(State(st): State<AppState>) -> impl IntoResponse {
    st.core.clear_records();
    StatusCode::NO_CONTENT
}
