use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use uuid::Uuid;

use mercado_core::promotion::{self, PromotionSelection};
use mercado_types::api::{
    PromotionAppliedResponse, PromotionQuoteResponse, PromotionRequest, PromotionSelectorResponse,
};
use mercado_types::promotion::CATALOG;

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};
use crate::extract::{JsonBody, PathParams};
use crate::middleware::Session;

/// GET /plans
pub async fn catalog() -> impl IntoResponse {
    Json(&CATALOG)
}

/// GET /listings/{id}/promotion: the owner's selector, rebuilt from the
/// persisted promotion state.
pub async fn get_selection(
    State(state): State<AppState>,
    PathParams(listing_id): PathParams<Uuid>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let selection = blocking(&state, move |db| {
        promotion::load_selection(db, &who, listing_id, chrono::Utc::now())
    })
    .await?;

    Ok(Json(PromotionSelectorResponse {
        total: selection.total(),
        plans: selection.plans,
        vip_days: selection.vip_days,
        premium_days: selection.premium_days,
        website_url: selection.website_url,
    }))
}

/// POST /listings/{id}/promotion/quote: tier and total for a selection,
/// nothing persisted.
pub async fn quote(JsonBody(req): JsonBody<PromotionRequest>) -> ApiResult<impl IntoResponse> {
    let selection = PromotionSelection::from_request(&req)?;
    let total = selection.total();
    Ok(Json(PromotionQuoteResponse {
        tier: selection.tier(),
        total,
        total_display: format!("R${}", total.to_string().replace('.', ",")),
    }))
}

/// POST /listings/{id}/promotion
pub async fn apply(
    State(state): State<AppState>,
    PathParams(listing_id): PathParams<Uuid>,
    Extension(session): Extension<Session>,
    JsonBody(req): JsonBody<PromotionRequest>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let selection = PromotionSelection::from_request(&req)?;
    let total = selection.total();

    let promotion = blocking(&state, move |db| {
        promotion::apply_promotion(db, &who, listing_id, &selection, chrono::Utc::now())
    })
    .await?;

    Ok(Json(PromotionAppliedResponse { promotion, total }))
}
