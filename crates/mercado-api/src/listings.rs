use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use mercado_core::analytics::{self, CounterOutcome};
use mercado_core::{MarketError, listings};
use mercado_types::api::{
    BrowseQuery, EmailContactRequest, NewListingRequest, SearchQuery, SetStatusRequest,
    UpdateListingRequest,
};
use mercado_types::models::{Category, CounterKind, Listing};

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};
use crate::extract::{JsonBody, PathParams, QueryParams};
use crate::middleware::Session;

#[derive(Serialize)]
pub struct CategoryPage {
    pub category: Category,
    pub listings: Vec<Listing>,
}

#[derive(Serialize)]
pub struct CounterResponse {
    pub outcome: CounterOutcome,
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let categories = blocking(&state, |db| listings::list_categories(db)).await?;
    Ok(Json(categories))
}

/// GET /categories/{slug}/listings
pub async fn browse_category(
    State(state): State<AppState>,
    PathParams(slug): PathParams<String>,
    QueryParams(query): QueryParams<BrowseQuery>,
) -> ApiResult<impl IntoResponse> {
    let (category, found) =
        blocking(&state, move |db| listings::browse_category(db, &slug, query.into())).await?;
    Ok(Json(CategoryPage {
        category,
        listings: found,
    }))
}

/// GET /listings
pub async fn search(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<BrowseQuery>,
) -> ApiResult<impl IntoResponse> {
    let query: SearchQuery = query.into();
    let found = blocking(&state, move |db| Ok(listings::search_listings(db, &query))).await?;
    Ok(Json(found))
}

/// POST /listings/search: same as GET /listings plus attribute filters.
pub async fn search_with_attrs(
    State(state): State<AppState>,
    JsonBody(query): JsonBody<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let found = blocking(&state, move |db| Ok(listings::search_listings(db, &query))).await?;
    Ok(Json(found))
}

pub async fn create_listing(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    JsonBody(req): JsonBody<NewListingRequest>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let listing = blocking(&state, move |db| {
        listings::create_listing(db, &who, req, chrono::Utc::now())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// GET /listings/{id}: the detail page; also counts a view.
pub async fn get_listing(
    State(state): State<AppState>,
    PathParams(listing_id): PathParams<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let listing = blocking(&state, move |db| {
        let listing = listings::get_listing(db, listing_id)?.ok_or(MarketError::NotFound("listing"))?;
        // A lost view must not fail the page.
        if let Err(e) = analytics::record_view(db, listing_id) {
            warn!("View not counted for {}: {}", listing_id, e);
        }
        Ok(listing)
    })
    .await?;
    Ok(Json(listings::listing_detail(listing, chrono::Utc::now())))
}

pub async fn update_listing(
    State(state): State<AppState>,
    PathParams(listing_id): PathParams<Uuid>,
    Extension(session): Extension<Session>,
    JsonBody(patch): JsonBody<UpdateListingRequest>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let listing = blocking(&state, move |db| listings::update_listing(db, &who, listing_id, patch)).await?;
    Ok(Json(listing))
}

pub async fn set_status(
    State(state): State<AppState>,
    PathParams(listing_id): PathParams<Uuid>,
    Extension(session): Extension<Session>,
    JsonBody(req): JsonBody<SetStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    blocking(&state, move |db| listings::set_listing_status(db, &who, listing_id, req.status)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /listings/{id}/clicks/{kind}: `kind` is `whatsapp` or `email`.
pub async fn record_click(
    State(state): State<AppState>,
    PathParams((listing_id, kind)): PathParams<(Uuid, String)>,
) -> ApiResult<impl IntoResponse> {
    let kind = CounterKind::parse(&kind)
        .ok_or_else(|| MarketError::Validation(format!("unknown click type '{}'", kind)))?;
    let outcome = blocking(&state, move |db| analytics::record_click(db, listing_id, kind)).await?;
    Ok(Json(CounterResponse { outcome }))
}

pub async fn contact_by_email(
    State(state): State<AppState>,
    PathParams(listing_id): PathParams<Uuid>,
    JsonBody(req): JsonBody<EmailContactRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = blocking(&state, move |db| {
        analytics::contact_by_email(db, listing_id, &req.email, req.robot_checked)
    })
    .await?;
    Ok(Json(CounterResponse { outcome }))
}

pub async fn my_listings(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let mine = blocking(&state, move |db| listings::get_my_listings(db, &who)).await?;
    Ok(Json(mine))
}
