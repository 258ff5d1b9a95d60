//! Conversation / message adapter.
//!
//! One conversation per (listing, buyer); messages are append-only and read
//! back oldest first. Participation is enforced by the backend.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use mercado_types::models::{Conversation, ConversationSummary, Identity, Message};

use crate::backend::{ConversationBackend, ListingBackend};
use crate::convert;
use crate::error::{MarketError, Result};

/// Find or create the conversation between `who` (as buyer) and the seller
/// of `listing_id`. Calling it again returns the same conversation.
pub fn create_conversation<B>(
    backend: &B,
    who: &Identity,
    listing_id: Uuid,
    seller_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Conversation>
where
    B: ConversationBackend + ListingBackend,
{
    if seller_id == who.user_id {
        return Err(MarketError::validation("cannot start a conversation on your own listing"));
    }

    let listing = backend
        .get_listing(&listing_id.to_string())?
        .ok_or(MarketError::NotFound("listing"))?;
    if listing.owner_id != seller_id.to_string() {
        return Err(MarketError::validation("seller does not own this listing"));
    }

    let row = backend.find_or_create_conversation(
        &Uuid::new_v4().to_string(),
        &listing.id,
        &who.user_id.to_string(),
        &listing.owner_id,
        &mercado_db::timestamp(now),
    )?;

    Ok(convert::conversation(&row))
}

/// Append a message from `who`. The body is trimmed and must not be empty.
pub fn send_message(
    backend: &impl ConversationBackend,
    who: &Identity,
    conversation_id: Uuid,
    body: &str,
    now: DateTime<Utc>,
) -> Result<Message> {
    let body = validate_body(body)?;

    let message_id = Uuid::new_v4();
    let created_at = mercado_db::timestamp(now);
    let inserted = backend.insert_message(
        &message_id.to_string(),
        &conversation_id.to_string(),
        &who.user_id.to_string(),
        body,
        &created_at,
    )?;

    if !inserted {
        return Err(refusal(backend, conversation_id)?);
    }

    Ok(Message {
        id: message_id,
        conversation_id,
        sender_id: who.user_id,
        body: body.to_string(),
        created_at: convert::timestamp(&created_at),
        read_at: None,
    })
}

/// Snapshot of every message in the conversation, oldest first.
pub fn get_messages(
    backend: &impl ConversationBackend,
    who: &Identity,
    conversation_id: Uuid,
) -> Result<Vec<Message>> {
    match backend.get_messages(&conversation_id.to_string(), &who.user_id.to_string())? {
        Some(rows) => Ok(rows.into_iter().map(convert::message).collect()),
        None => Err(refusal(backend, conversation_id)?),
    }
}

/// Conversations where `who` is buyer or seller, with the listing title.
pub fn get_my_conversations(
    backend: &impl ConversationBackend,
    who: &Identity,
) -> Result<Vec<ConversationSummary>> {
    Ok(backend
        .conversations_for_user(&who.user_id.to_string())?
        .into_iter()
        .map(convert::conversation_summary)
        .collect())
}

/// Mark the other party's messages as read by `who`.
pub fn mark_read(
    backend: &impl ConversationBackend,
    who: &Identity,
    conversation_id: Uuid,
    now: DateTime<Utc>,
) -> Result<usize> {
    let conversation = fetch(backend, conversation_id)?;
    if !conversation.is_participant(who.user_id) {
        return Err(MarketError::Forbidden);
    }
    Ok(backend.mark_messages_read(
        &conversation_id.to_string(),
        &who.user_id.to_string(),
        &mercado_db::timestamp(now),
    )?)
}

/// Contact flow from a listing page: validate the first message, then find
/// or create the conversation and post the message into it.
pub fn contact_seller<B>(
    backend: &B,
    who: &Identity,
    listing_id: Uuid,
    seller_id: Uuid,
    first_message: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(Conversation, Option<Message>)>
where
    B: ConversationBackend + ListingBackend,
{
    if let Some(body) = first_message {
        validate_body(body)?;
    }

    let conversation = create_conversation(backend, who, listing_id, seller_id, now)?;
    let message = match first_message {
        Some(body) => Some(send_message(backend, who, conversation.id, body, now)?),
        None => None,
    };

    info!("User {} contacted seller {} about {}", who.user_id, seller_id, listing_id);
    Ok((conversation, message))
}

fn validate_body(body: &str) -> Result<&str> {
    let body = body.trim();
    if body.is_empty() {
        return Err(MarketError::validation("message body is empty"));
    }
    Ok(body)
}

fn fetch(backend: &impl ConversationBackend, conversation_id: Uuid) -> Result<Conversation> {
    backend
        .get_conversation(&conversation_id.to_string())?
        .map(|row| convert::conversation(&row))
        .ok_or(MarketError::NotFound("conversation"))
}

/// Why the backend refused: missing conversation or not a participant.
fn refusal(backend: &impl ConversationBackend, conversation_id: Uuid) -> Result<MarketError> {
    Ok(match backend.get_conversation(&conversation_id.to_string())? {
        Some(_) => MarketError::Forbidden,
        None => MarketError::NotFound("conversation"),
    })
}
