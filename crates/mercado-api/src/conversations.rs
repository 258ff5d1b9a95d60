use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use mercado_core::conversations;
use mercado_types::api::{SendMessageRequest, StartConversationRequest, StartConversationResponse};

use crate::auth::AppState;
use crate::error::{ApiResult, blocking};
use crate::extract::{JsonBody, PathParams};
use crate::middleware::Session;

/// POST /listings/{id}/conversations: find or create the caller's
/// conversation with the seller, optionally posting a first message.
pub async fn start_conversation(
    State(state): State<AppState>,
    PathParams(listing_id): PathParams<Uuid>,
    Extension(session): Extension<Session>,
    JsonBody(req): JsonBody<StartConversationRequest>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let (conversation, message) = blocking(&state, move |db| {
        conversations::contact_seller(
            db,
            &who,
            listing_id,
            req.seller_id,
            req.message.as_deref(),
            chrono::Utc::now(),
        )
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(StartConversationResponse {
            conversation_id: conversation.id,
            message,
        }),
    ))
}

pub async fn my_conversations(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let list = blocking(&state, move |db| conversations::get_my_conversations(db, &who)).await?;
    Ok(Json(list))
}

pub async fn get_messages(
    State(state): State<AppState>,
    PathParams(conversation_id): PathParams<Uuid>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let messages = blocking(&state, move |db| conversations::get_messages(db, &who, conversation_id)).await?;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    PathParams(conversation_id): PathParams<Uuid>,
    Extension(session): Extension<Session>,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let message = blocking(&state, move |db| {
        conversations::send_message(db, &who, conversation_id, &req.body, chrono::Utc::now())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    PathParams(conversation_id): PathParams<Uuid>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let who = session.identity()?.clone();
    let marked = blocking(&state, move |db| {
        conversations::mark_read(db, &who, conversation_id, chrono::Utc::now())
    })
    .await?;
    Ok(Json(json!({ "marked": marked })))
}
