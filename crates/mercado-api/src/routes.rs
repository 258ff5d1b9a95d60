use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::middleware::resolve_session;
use crate::{conversations, favorites, listings, profile, promotion};

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let listing_routes = Router::new()
        .route("/categories", get(listings::list_categories))
        .route("/categories/{slug}/listings", get(listings::browse_category))
        .route("/listings", get(listings::search).post(listings::create_listing))
        .route("/listings/search", post(listings::search_with_attrs))
        .route("/listings/{id}", get(listings::get_listing).patch(listings::update_listing))
        .route("/listings/{id}/status", put(listings::set_status))
        .route("/listings/{id}/clicks/{kind}", post(listings::record_click))
        .route("/listings/{id}/contact/email", post(listings::contact_by_email))
        .route("/listings/{id}/favorite", post(favorites::toggle_favorite));

    let promotion_routes = Router::new()
        .route("/plans", get(promotion::catalog))
        .route("/listings/{id}/promotion", get(promotion::get_selection).post(promotion::apply))
        .route("/listings/{id}/promotion/quote", post(promotion::quote));

    let chat_routes = Router::new()
        .route("/listings/{id}/conversations", post(conversations::start_conversation))
        .route("/conversations", get(conversations::my_conversations))
        .route(
            "/conversations/{id}/messages",
            get(conversations::get_messages).post(conversations::send_message),
        )
        .route("/conversations/{id}/read", post(conversations::mark_read));

    let me_routes = Router::new()
        .route("/me/listings", get(listings::my_listings))
        .route("/me/favorites", get(favorites::favorite_listings))
        .route("/me/favorites/ids", get(favorites::favorite_ids))
        .route("/me/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/me/overview", get(profile::overview))
        .route("/meus-anuncios", get(profile::overview));

    Router::new()
        .merge(auth_routes)
        .merge(listing_routes)
        .merge(promotion_routes)
        .merge(chat_routes)
        .merge(me_routes)
        .layer(middleware::from_fn_with_state(state.clone(), resolve_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
