use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attributes::ListingAttributes;
use crate::promotion::PromotionState;

/// The caller on whose behalf an adapter operation runs.
/// Threaded explicitly through every call that needs a current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
    Active,
    Inactive,
}

impl ListingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// Which per-category attribute shape a category's listings carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Escort,
    RealEstate,
    General,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Escort => "escort",
            Self::RealEstate => "real_estate",
            Self::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "escort" => Some(Self::Escort),
            "real_estate" => Some(Self::RealEstate),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub kind: CategoryKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    pub views: i64,
    pub whatsapp_clicks: i64,
    pub email_clicks: i64,
}

/// Counter names accepted by the `increment_listing_counter` procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    View,
    Whatsapp,
    Email,
}

impl CounterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Whatsapp => "whatsapp",
            Self::Email => "email",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(Self::View),
            "whatsapp" => Some(Self::Whatsapp),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    /// Bump the matching key of an analytics bag by one.
    pub fn bump(self, analytics: &mut Analytics) {
        match self {
            Self::View => analytics.views += 1,
            Self::Whatsapp => analytics.whatsapp_clicks += 1,
            Self::Email => analytics.email_clicks += 1,
        }
    }
}

/// Display data joined onto a listing for its owner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: Uuid,
    /// produto | serviço | emprego
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub status: ListingStatus,
    pub owner_id: Uuid,
    pub attributes: ListingAttributes,
    pub promotion: PromotionState,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub analytics: Analytics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }
}

/// A conversation as listed on the dashboard: joined with the listing
/// title and both parties' display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub listing_title: Option<String>,
    pub buyer_name: Option<String>,
    pub seller_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}
