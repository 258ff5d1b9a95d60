use mercado_types::api::{DashboardOverview, DashboardTab};
use mercado_types::models::{Identity, Profile};

use crate::backend::{Backend, ProfileBackend};
use crate::convert;
use crate::error::{MarketError, Result};

pub fn get_profile(backend: &impl ProfileBackend, who: &Identity) -> Result<Profile> {
    backend
        .get_profile(&who.user_id.to_string())?
        .map(convert::profile)
        .ok_or(MarketError::NotFound("profile"))
}

pub fn update_profile(
    backend: &impl ProfileBackend,
    who: &Identity,
    name: Option<&str>,
    phone: Option<&str>,
) -> Result<Profile> {
    let name = name.map(str::trim);
    if name.is_some_and(str::is_empty) {
        return Err(MarketError::validation("name cannot be blank"));
    }
    let phone = phone.map(str::trim);

    if !backend.update_profile(&who.user_id.to_string(), name, phone)? {
        return Err(MarketError::NotFound("profile"));
    }
    get_profile(backend, who)
}

/// Counters shown on the dashboard overview.
pub fn dashboard_overview(backend: &impl Backend, who: &Identity, tab: DashboardTab) -> Result<DashboardOverview> {
    let user_id = who.user_id.to_string();
    Ok(DashboardOverview {
        tab,
        ads_count: backend.listings_by_owner(&user_id)?.len(),
        conversations_count: backend.conversations_for_user(&user_id)?.len(),
        favorites_count: backend.favorite_listing_ids(&user_id)?.len(),
    })
}
