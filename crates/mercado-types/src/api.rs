use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::attributes::ListingAttributes;
use crate::models::{Listing, ListingStatus, Message};
use crate::promotion::{PlanId, PlanTier, Price, PromotionState};

// -- JWT Claims --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub token: String,
}

// -- Listings --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewListingRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: Uuid,
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub attributes: ListingAttributes,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Field-level patch of a listing. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub status: Option<ListingStatus>,
    pub attributes: Option<ListingAttributes>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetStatusRequest {
    pub status: ListingStatus,
}

/// A listing as shown on its detail page, with the values derived from it.
#[derive(Debug, Serialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub listing: Listing,
    /// The promotion tier in force now; an expired vip or premium is normal.
    pub effective_tier: PlanTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_square_meter: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// Body of `POST /listings/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub category_id: Option<Uuid>,
    pub city: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    /// Exact-match filters over listing attributes.
    #[serde(default)]
    pub attrs: Map<String, Value>,
}

/// Query-string form of a search, without attribute filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowseQuery {
    pub category_id: Option<Uuid>,
    pub city: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

impl From<BrowseQuery> for SearchQuery {
    fn from(q: BrowseQuery) -> Self {
        Self {
            category_id: q.category_id,
            city: q.city,
            price_min: q.price_min,
            price_max: q.price_max,
            attrs: Map::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailContactRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub robot_checked: bool,
}

// -- Favorites --

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteResponse {
    pub favorited: bool,
}

// -- Conversations --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartConversationRequest {
    pub seller_id: Uuid,
    /// Optional first message, sent right after the conversation is found or created.
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartConversationResponse {
    pub conversation_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: String,
}

// -- Promotion --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromotionRequest {
    pub plans: BTreeSet<PlanId>,
    #[serde(default)]
    pub vip_days: Option<u32>,
    #[serde(default)]
    pub premium_days: Option<u32>,
    #[serde(default)]
    pub website_url: String,
}

/// Selector state reconstructed from a listing's persisted promotion.
#[derive(Debug, Serialize, Deserialize)]
pub struct PromotionSelectorResponse {
    pub plans: BTreeSet<PlanId>,
    pub vip_days: u32,
    pub premium_days: u32,
    pub website_url: String,
    pub total: Price,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromotionQuoteResponse {
    pub tier: PlanTier,
    pub total: Price,
    pub total_display: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromotionAppliedResponse {
    pub promotion: PromotionState,
    pub total: Price,
}

// -- Profile / dashboard --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardTab {
    #[default]
    Overview,
    Ads,
    Chat,
    Favorites,
    Settings,
}

impl DashboardTab {
    /// Resolve the active tab from the `tab` query parameter, falling back to
    /// the ads tab on the "my ads" path and to the overview otherwise.
    pub fn resolve(tab: Option<&str>, path: &str) -> Self {
        let parsed = match tab {
            Some("overview") => Some(Self::Overview),
            Some("ads") => Some(Self::Ads),
            Some("chat") => Some(Self::Chat),
            Some("favorites") => Some(Self::Favorites),
            Some("settings") => Some(Self::Settings),
            _ => None,
        };
        match parsed {
            Some(tab) => tab,
            None if path == "/meus-anuncios" => Self::Ads,
            None => Self::Overview,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardOverview {
    pub tab: DashboardTab,
    pub ads_count: usize,
    pub conversations_count: usize,
    pub favorites_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_query_wins_over_path() {
        assert_eq!(DashboardTab::resolve(Some("chat"), "/meus-anuncios"), DashboardTab::Chat);
        assert_eq!(DashboardTab::resolve(Some("bogus"), "/meus-anuncios"), DashboardTab::Ads);
        assert_eq!(DashboardTab::resolve(None, "/painel"), DashboardTab::Overview);
    }

    #[test]
    fn promotion_request_rejects_unknown_plan() {
        let res: Result<PromotionRequest, _> =
            serde_json::from_str(r#"{"plans":["vip","gold"]}"#);
        assert!(res.is_err());
    }
}
