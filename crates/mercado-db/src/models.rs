/// Database row types. These map directly to SQLite rows.
/// Distinct from mercado-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct ProfileRow {
    pub id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub kind: String,
}

/// A listing joined with its owner's profile.
pub struct ListingRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: String,
    pub listing_type: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub status: String,
    pub owner_id: String,
    /// JSON object
    pub attributes: String,
    /// JSON object
    pub promotion: String,
    /// JSON array of URLs
    pub images: String,
    pub analytics: AnalyticsRow,
    pub created_at: String,
    pub owner_name: Option<String>,
    pub owner_phone: Option<String>,
    pub owner_avatar_url: Option<String>,
}

/// Columns written when a listing is created or edited.
pub struct ListingWrite {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: String,
    pub listing_type: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub status: String,
    pub owner_id: String,
    pub attributes: String,
    pub images: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyticsRow {
    pub views: i64,
    pub whatsapp_clicks: i64,
    pub email_clicks: i64,
}

pub struct ConversationRow {
    pub id: String,
    pub listing_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub created_at: String,
    pub listing_title: Option<String>,
    pub buyer_name: Option<String>,
    pub seller_name: Option<String>,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    pub created_at: String,
    pub read_at: Option<String>,
}

/// Arguments of the `search_listings` procedure.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub category_id: Option<String>,
    pub city: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub attrs: serde_json::Map<String, serde_json::Value>,
}
