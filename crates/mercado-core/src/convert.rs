//! Row → model conversion. Corrupt stored values are logged and replaced
//! with defaults so one bad row does not fail a whole read.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use mercado_db::models::{
    AnalyticsRow, CategoryRow, ConversationRow, ListingRow, MessageRow, ProfileRow,
};
use mercado_types::models::{
    Analytics, Category, CategoryKind, Conversation, ConversationSummary, Listing, ListingStatus,
    Message, OwnerProfile, Profile,
};

pub(crate) fn id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no zone: "YYYY-MM-DD HH:MM:SS"
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

fn json_or_default<T: DeserializeOwned + Default>(raw: &str, what: &str, row_id: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt {} on listing '{}': {}", what, row_id, e);
        T::default()
    })
}

pub(crate) fn analytics(row: AnalyticsRow) -> Analytics {
    Analytics {
        views: row.views,
        whatsapp_clicks: row.whatsapp_clicks,
        email_clicks: row.email_clicks,
    }
}

pub(crate) fn analytics_row(a: &Analytics) -> AnalyticsRow {
    AnalyticsRow {
        views: a.views,
        whatsapp_clicks: a.whatsapp_clicks,
        email_clicks: a.email_clicks,
    }
}

pub(crate) fn category(row: CategoryRow) -> Category {
    let kind = CategoryKind::parse(&row.kind).unwrap_or_else(|| {
        warn!("Unknown kind '{}' on category '{}'", row.kind, row.id);
        CategoryKind::General
    });
    Category {
        id: id(&row.id, "category id"),
        name: row.name,
        slug: row.slug,
        kind,
    }
}

pub(crate) fn listing(row: ListingRow) -> Listing {
    let status = ListingStatus::parse(&row.status).unwrap_or_else(|| {
        warn!("Unknown status '{}' on listing '{}'", row.status, row.id);
        ListingStatus::Draft
    });

    Listing {
        id: id(&row.id, "listing id"),
        title: row.title,
        description: row.description,
        price: row.price,
        category_id: id(&row.category_id, "category_id"),
        listing_type: row.listing_type,
        city: row.city,
        state: row.state,
        status,
        owner_id: id(&row.owner_id, "owner_id"),
        attributes: json_or_default(&row.attributes, "attributes", &row.id),
        promotion: json_or_default(&row.promotion, "promotion", &row.id),
        images: json_or_default(&row.images, "images", &row.id),
        created_at: timestamp(&row.created_at),
        analytics: analytics(row.analytics),
        owner: Some(OwnerProfile {
            name: row.owner_name,
            phone: row.owner_phone,
            avatar_url: row.owner_avatar_url,
        }),
    }
}

pub(crate) fn conversation(row: &ConversationRow) -> Conversation {
    Conversation {
        id: id(&row.id, "conversation id"),
        listing_id: id(&row.listing_id, "listing_id"),
        buyer_id: id(&row.buyer_id, "buyer_id"),
        seller_id: id(&row.seller_id, "seller_id"),
        created_at: timestamp(&row.created_at),
    }
}

pub(crate) fn conversation_summary(row: ConversationRow) -> ConversationSummary {
    ConversationSummary {
        conversation: conversation(&row),
        listing_title: row.listing_title,
        buyer_name: row.buyer_name,
        seller_name: row.seller_name,
    }
}

pub(crate) fn message(row: MessageRow) -> Message {
    Message {
        id: id(&row.id, "message id"),
        conversation_id: id(&row.conversation_id, "conversation_id"),
        sender_id: id(&row.sender_id, "sender_id"),
        body: row.body,
        created_at: timestamp(&row.created_at),
        read_at: row.read_at.as_deref().map(timestamp),
    }
}

pub(crate) fn profile(row: ProfileRow) -> Profile {
    Profile {
        id: id(&row.id, "profile id"),
        name: row.name,
        phone: row.phone,
        avatar_url: row.avatar_url,
        created_at: timestamp(&row.created_at),
    }
}
