use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use uuid::Uuid;

use mercado_core::favorites;
use mercado_types::api::FavoriteResponse;

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};
use crate::extract::PathParams;
use crate::middleware::Session;

/// POST /listings/{id}/favorite: flips the favorite state.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    PathParams(listing_id): PathParams<Uuid>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let favorited = blocking(&state, move |db| favorites::toggle_favorite(db, &who, listing_id)).await?;
    Ok(Json(FavoriteResponse { favorited }))
}

pub async fn favorite_ids(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let ids = blocking(&state, move |db| favorites::get_favorite_ids(db, &who)).await?;
    Ok(Json(ids))
}

pub async fn favorite_listings(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let found = blocking(&state, move |db| favorites::get_favorite_listings(db, &who)).await?;
    Ok(Json(found))
}
