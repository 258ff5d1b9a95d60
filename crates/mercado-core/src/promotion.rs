//! Promotion / plan state derivation.
//!
//! The seller picks add-on plans and, for the timed tiers, a duration. The
//! listing's [`PromotionState`] is derived from that selection and written
//! back as one record. The total is computed and returned but no payment is
//! captured here.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use mercado_types::api::PromotionRequest;
use mercado_types::models::Identity;
use mercado_types::promotion::{
    DEFAULT_DURATION_DAYS, DURATION_OPTIONS, PlanId, PlanTier, Price, PromotionState,
};

use crate::backend::ListingBackend;
use crate::convert;
use crate::error::{MarketError, Result};
use crate::listings::{owned_by, owner_write_outcome};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// What the seller has selected on the promotion page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionSelection {
    pub plans: BTreeSet<PlanId>,
    pub vip_days: u32,
    pub premium_days: u32,
    pub website_url: String,
}

impl Default for PromotionSelection {
    fn default() -> Self {
        Self {
            plans: BTreeSet::new(),
            vip_days: DEFAULT_DURATION_DAYS,
            premium_days: DEFAULT_DURATION_DAYS,
            website_url: String::new(),
        }
    }
}

impl PromotionSelection {
    /// Rebuild the selection from a persisted state. A live timed tier
    /// pre-fills its duration with the whole days left until expiry.
    pub fn from_state(state: &PromotionState, now: DateTime<Utc>) -> Self {
        let mut selection = Self {
            plans: state.promotions.clone(),
            website_url: state.website_url.clone(),
            ..Self::default()
        };

        if let Some(days) = state.plan_expires_at.and_then(|exp| remaining_days(exp, now)) {
            match state.plan_tier {
                PlanTier::Vip => selection.vip_days = days,
                PlanTier::Premium => selection.premium_days = days,
                PlanTier::Normal => {}
            }
        }
        selection
    }

    pub fn from_request(req: &PromotionRequest) -> Result<Self> {
        let mut selection = Self {
            plans: req.plans.clone(),
            website_url: req.website_url.trim().to_string(),
            ..Self::default()
        };
        if let Some(days) = req.vip_days {
            selection.set_duration(PlanTier::Vip, days)?;
        }
        if let Some(days) = req.premium_days {
            selection.set_duration(PlanTier::Premium, days)?;
        }
        Ok(selection)
    }

    /// Set the duration of a timed tier. Accepts the offered options and any
    /// shorter carried-over remainder (1..=longest option), since a reloaded
    /// selection may hold e.g. 50 days left on a 60-day plan.
    pub fn set_duration(&mut self, tier: PlanTier, days: u32) -> Result<()> {
        let longest = DURATION_OPTIONS[DURATION_OPTIONS.len() - 1];
        if days == 0 || days > longest {
            return Err(MarketError::Validation(format!(
                "duration must be between 1 and {} days",
                longest
            )));
        }
        match tier {
            PlanTier::Vip => self.vip_days = days,
            PlanTier::Premium => self.premium_days = days,
            PlanTier::Normal => return Err(MarketError::validation("normal tier has no duration")),
        }
        Ok(())
    }

    /// vip beats premium beats normal.
    pub fn tier(&self) -> PlanTier {
        if self.plans.contains(&PlanId::Vip) {
            PlanTier::Vip
        } else if self.plans.contains(&PlanId::Premium) {
            PlanTier::Premium
        } else {
            PlanTier::Normal
        }
    }

    pub fn duration_days(&self) -> Option<u32> {
        match self.tier() {
            PlanTier::Vip => Some(self.vip_days),
            PlanTier::Premium => Some(self.premium_days),
            PlanTier::Normal => None,
        }
    }

    pub fn total(&self) -> Price {
        self.plans.iter().map(|p| p.plan().price).sum()
    }

    pub fn derive(&self, now: DateTime<Utc>) -> PromotionState {
        let website_url = if self.plans.contains(&PlanId::WebsiteLink) {
            self.website_url.clone()
        } else {
            String::new()
        };

        PromotionState {
            promotions: self.plans.clone(),
            plan_tier: self.tier(),
            plan_expires_at: self
                .duration_days()
                .map(|days| now + Duration::days(i64::from(days))),
            website_url,
        }
    }
}

/// Whole days left until `expires`, rounded up and at least 1.
/// `None` once the expiry has passed.
pub fn remaining_days(expires: DateTime<Utc>, now: DateTime<Utc>) -> Option<u32> {
    let left_ms = (expires - now).num_milliseconds();
    if left_ms <= 0 {
        return None;
    }
    let days = (left_ms + DAY_MS - 1) / DAY_MS;
    Some(u32::try_from(days.max(1)).unwrap_or(u32::MAX))
}

/// Selector state for the owner's promotion page.
pub fn load_selection(
    backend: &impl ListingBackend,
    who: &Identity,
    listing_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PromotionSelection> {
    let row = backend
        .get_listing(&listing_id.to_string())?
        .ok_or(MarketError::NotFound("listing"))?;
    if !owned_by(&row, who) {
        return Err(MarketError::Forbidden);
    }
    let listing = convert::listing(row);
    Ok(PromotionSelection::from_state(&listing.promotion, now))
}

/// Derive and persist the promotion state for `listing_id`, replacing the
/// previous record whole. Returns the new state.
pub fn apply_promotion(
    backend: &impl ListingBackend,
    who: &Identity,
    listing_id: Uuid,
    selection: &PromotionSelection,
    now: DateTime<Utc>,
) -> Result<PromotionState> {
    let state = selection.derive(now);
    let json = serde_json::to_string(&state).map_err(|e| MarketError::Backend(e.into()))?;

    let id = listing_id.to_string();
    let changed = backend.update_listing_promotion(&id, &who.user_id.to_string(), &json)?;
    owner_write_outcome(backend, &id, changed)?;

    info!(
        "Listing {} promoted: tier {:?}, total {}",
        listing_id,
        state.plan_tier,
        selection.total()
    );
    Ok(state)
}
