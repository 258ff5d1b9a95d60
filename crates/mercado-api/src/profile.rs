use axum::{
    Extension, Json,
    extract::{OriginalUri, State},
    response::IntoResponse,
};
use serde::Deserialize;

use mercado_core::profiles;
use mercado_types::api::{DashboardTab, UpdateProfileRequest};

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};
use crate::extract::{JsonBody, QueryParams};
use crate::middleware::Session;

#[derive(Debug, Deserialize)]
pub struct TabQuery {
    pub tab: Option<String>,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let profile = blocking(&state, move |db| profiles::get_profile(db, &who)).await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let profile = blocking(&state, move |db| {
        profiles::update_profile(db, &who, req.name.as_deref(), req.phone.as_deref())
    })
    .await?;
    Ok(Json(profile))
}

/// GET /me/overview?tab= (also mounted at /meus-anuncios, where the ads
/// tab is the default).
pub async fn overview(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    OriginalUri(uri): OriginalUri,
    QueryParams(query): QueryParams<TabQuery>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let tab = DashboardTab::resolve(query.tab.as_deref(), uri.path());
    let overview = blocking(&state, move |db| profiles::dashboard_overview(db, &who, tab)).await?;
    Ok(Json(overview))
}
