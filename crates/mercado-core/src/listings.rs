//! Listing repository adapter.

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use mercado_db::models::{ListingRow, ListingWrite, SearchParams};
use mercado_types::api::{ListingDetail, NewListingRequest, SearchQuery, UpdateListingRequest};
use mercado_types::attributes::ListingAttributes;
use mercado_types::models::{Category, Identity, Listing, ListingStatus};

use crate::backend::ListingBackend;
use crate::convert;
use crate::error::{MarketError, Result};

pub fn list_categories(backend: &impl ListingBackend) -> Result<Vec<Category>> {
    Ok(backend
        .list_categories()?
        .into_iter()
        .map(convert::category)
        .collect())
}

/// Create a draft listing owned by `who`.
pub fn create_listing(
    backend: &impl ListingBackend,
    who: &Identity,
    req: NewListingRequest,
    now: DateTime<Utc>,
) -> Result<Listing> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(MarketError::validation("title is required"));
    }
    validate_price(req.price)?;
    check_attributes(backend, &req.category_id.to_string(), &req.attributes)?;

    let id = Uuid::new_v4();
    backend.insert_listing(&ListingWrite {
        id: id.to_string(),
        title: title.to_string(),
        description: req.description,
        price: req.price,
        category_id: req.category_id.to_string(),
        listing_type: req.listing_type,
        city: req.city,
        state: req.state,
        status: ListingStatus::Draft.as_str().to_string(),
        owner_id: who.user_id.to_string(),
        attributes: to_json(&req.attributes)?,
        images: to_json(&req.images)?,
        created_at: mercado_db::timestamp(now),
    })?;

    info!("Listing {} created by {}", id, who.user_id);
    fetch(backend, &id.to_string())
}

/// Apply a field-level patch to one of `who`'s listings.
pub fn update_listing(
    backend: &impl ListingBackend,
    who: &Identity,
    listing_id: Uuid,
    patch: UpdateListingRequest,
) -> Result<Listing> {
    let current = backend
        .get_listing(&listing_id.to_string())?
        .ok_or(MarketError::NotFound("listing"))?;
    if current.owner_id != who.user_id.to_string() {
        return Err(MarketError::Forbidden);
    }

    let title = match patch.title {
        Some(t) if t.trim().is_empty() => return Err(MarketError::validation("title is required")),
        Some(t) => t.trim().to_string(),
        None => current.title.clone(),
    };
    validate_price(patch.price)?;

    let attributes = match &patch.attributes {
        Some(attrs) => {
            check_attributes(backend, &current.category_id, attrs)?;
            to_json(attrs)?
        }
        None => current.attributes.clone(),
    };
    let images = match &patch.images {
        Some(images) => to_json(images)?,
        None => current.images.clone(),
    };

    let write = ListingWrite {
        id: current.id.clone(),
        title,
        description: patch.description.or(current.description),
        price: patch.price.or(current.price),
        category_id: current.category_id,
        listing_type: patch.listing_type.or(current.listing_type),
        city: patch.city.or(current.city),
        state: patch.state.or(current.state),
        status: patch
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or(current.status),
        owner_id: current.owner_id,
        attributes,
        images,
        created_at: current.created_at,
    };

    if !backend.update_listing(&write)? {
        return Err(MarketError::Forbidden);
    }
    fetch(backend, &write.id)
}

pub fn set_listing_status(
    backend: &impl ListingBackend,
    who: &Identity,
    listing_id: Uuid,
    status: ListingStatus,
) -> Result<()> {
    let id = listing_id.to_string();
    let changed = backend.set_listing_status(&id, &who.user_id.to_string(), status.as_str())?;
    owner_write_outcome(backend, &id, changed)
}

pub fn get_listing(backend: &impl ListingBackend, listing_id: Uuid) -> Result<Option<Listing>> {
    Ok(backend
        .get_listing(&listing_id.to_string())?
        .map(convert::listing))
}

/// Detail-page view of a listing: the tier in force at `now`, the price per
/// square meter of a real-estate listing and its video, if any.
pub fn listing_detail(listing: Listing, now: DateTime<Utc>) -> ListingDetail {
    let price_per_square_meter = match (&listing.attributes, listing.price) {
        (ListingAttributes::RealEstate(attrs), Some(price)) => attrs.price_per_square_meter(price),
        _ => None,
    };
    ListingDetail {
        effective_tier: listing.promotion.effective_tier(now),
        price_per_square_meter,
        video_url: listing.attributes.video_url().map(str::to_string),
        listing,
    }
}

/// `who`'s listings, newest first.
pub fn get_my_listings(backend: &impl ListingBackend, who: &Identity) -> Result<Vec<Listing>> {
    Ok(backend
        .listings_by_owner(&who.user_id.to_string())?
        .into_iter()
        .map(convert::listing)
        .collect())
}

/// Run the `search_listings` procedure. A failed call is logged and
/// yields no results.
pub fn search_listings(backend: &impl ListingBackend, query: &SearchQuery) -> Vec<Listing> {
    let params = SearchParams {
        category_id: query.category_id.map(|id| id.to_string()),
        city: query.city.clone().filter(|c| !c.trim().is_empty()),
        price_min: query.price_min,
        price_max: query.price_max,
        attrs: query.attrs.clone(),
    };

    match backend.search_listings(&params) {
        Ok(rows) => rows.into_iter().map(convert::listing).collect(),
        Err(e) => {
            error!("search_listings failed: {}", e);
            Vec::new()
        }
    }
}

/// Resolve a category slug, then search within it.
pub fn browse_category(
    backend: &impl ListingBackend,
    slug: &str,
    query: SearchQuery,
) -> Result<(Category, Vec<Listing>)> {
    let category = backend
        .get_category_by_slug(slug)?
        .map(convert::category)
        .ok_or(MarketError::NotFound("category"))?;

    let query = SearchQuery {
        category_id: Some(category.id),
        ..query
    };
    let listings = search_listings(backend, &query);
    Ok((category, listings))
}

/// Tell apart "refused" from "absent" after an owner-only write returned false.
pub(crate) fn owner_write_outcome(backend: &impl ListingBackend, id: &str, changed: bool) -> Result<()> {
    if changed {
        return Ok(());
    }
    match backend.get_listing(id)? {
        Some(_) => Err(MarketError::Forbidden),
        None => Err(MarketError::NotFound("listing")),
    }
}

fn fetch(backend: &impl ListingBackend, id: &str) -> Result<Listing> {
    backend
        .get_listing(id)?
        .map(convert::listing)
        .ok_or(MarketError::NotFound("listing"))
}

fn validate_price(price: Option<f64>) -> Result<()> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => Err(MarketError::validation("price must be a non-negative number")),
        _ => Ok(()),
    }
}

/// The attribute shape must be the one the category calls for.
fn check_attributes(backend: &impl ListingBackend, category_id: &str, attrs: &ListingAttributes) -> Result<()> {
    let category = backend
        .get_category(category_id)?
        .map(convert::category)
        .ok_or(MarketError::NotFound("category"))?;

    if category.kind != attrs.kind() {
        return Err(MarketError::Validation(format!(
            "category '{}' takes {} attributes, got {}",
            category.slug,
            category.kind.as_str(),
            attrs.kind().as_str()
        )));
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| MarketError::Backend(e.into()))
}

/// Owner check against a raw row, for adapters that read before writing.
pub(crate) fn owned_by(row: &ListingRow, who: &Identity) -> bool {
    row.owner_id == who.user_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mercado_db::Database;
    use mercado_db::migrations::{ESCORT_CATEGORY_ID, REAL_ESTATE_CATEGORY_ID};
    use mercado_types::attributes::{EscortAttributes, RealEstateAttributes};

    fn user(db: &Database, name: &str) -> Identity {
        let id = Uuid::new_v4();
        db.create_user(&id.to_string(), &format!("{}@example.com", name), "hash", name)
            .unwrap();
        Identity { user_id: id, name: name.into() }
    }

    fn apartment() -> NewListingRequest {
        NewListingRequest {
            title: "  Apartamento 2 quartos  ".into(),
            description: Some("Perto da praia".into()),
            price: Some(2500.0),
            category_id: REAL_ESTATE_CATEGORY_ID.parse().unwrap(),
            listing_type: None,
            city: Some("Florianópolis".into()),
            state: Some("SC".into()),
            attributes: ListingAttributes::RealEstate(RealEstateAttributes {
                rooms: Some(2),
                ..Default::default()
            }),
            images: vec!["https://cdn.example.com/1.jpg".into()],
        }
    }

    #[test]
    fn create_makes_owned_draft() {
        let db = Database::open_in_memory().unwrap();
        let seller = user(&db, "seller");

        let listing = create_listing(&db, &seller, apartment(), Utc::now()).unwrap();
        assert_eq!(listing.title, "Apartamento 2 quartos");
        assert_eq!(listing.status, ListingStatus::Draft);
        assert_eq!(listing.owner_id, seller.user_id);
        assert_eq!(listing.images.len(), 1);
        assert_eq!(listing.owner.unwrap().name.as_deref(), Some("seller"));
    }

    #[test]
    fn attributes_must_match_category() {
        let db = Database::open_in_memory().unwrap();
        let seller = user(&db, "seller");

        let mut req = apartment();
        req.category_id = ESCORT_CATEGORY_ID.parse().unwrap();
        let err = create_listing(&db, &seller, req, Utc::now()).unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));

        let mut req = apartment();
        req.category_id = ESCORT_CATEGORY_ID.parse().unwrap();
        req.attributes = ListingAttributes::Escort(EscortAttributes::default());
        assert!(create_listing(&db, &seller, req, Utc::now()).is_ok());
    }

    #[test]
    fn rejects_blank_title_and_negative_price() {
        let db = Database::open_in_memory().unwrap();
        let seller = user(&db, "seller");

        let mut req = apartment();
        req.title = "   ".into();
        assert!(matches!(create_listing(&db, &seller, req, Utc::now()), Err(MarketError::Validation(_))));

        let mut req = apartment();
        req.price = Some(-1.0);
        assert!(matches!(create_listing(&db, &seller, req, Utc::now()), Err(MarketError::Validation(_))));
    }

    #[test]
    fn only_owner_edits() {
        let db = Database::open_in_memory().unwrap();
        let seller = user(&db, "seller");
        let intruder = user(&db, "intruder");
        let listing = create_listing(&db, &seller, apartment(), Utc::now()).unwrap();

        let patch = UpdateListingRequest {
            price: Some(2300.0),
            status: Some(ListingStatus::Active),
            ..Default::default()
        };
        assert!(matches!(
            update_listing(&db, &intruder, listing.id, patch.clone()),
            Err(MarketError::Forbidden)
        ));

        let updated = update_listing(&db, &seller, listing.id, patch).unwrap();
        assert_eq!(updated.price, Some(2300.0));
        assert_eq!(updated.status, ListingStatus::Active);
        assert_eq!(updated.description.as_deref(), Some("Perto da praia"));

        assert!(matches!(
            set_listing_status(&db, &intruder, listing.id, ListingStatus::Inactive),
            Err(MarketError::Forbidden)
        ));
        assert!(matches!(
            set_listing_status(&db, &seller, Uuid::new_v4(), ListingStatus::Inactive),
            Err(MarketError::NotFound(_))
        ));
    }

    #[test]
    fn search_sees_only_active_and_browse_resolves_slug() {
        let db = Database::open_in_memory().unwrap();
        let seller = user(&db, "seller");
        let draft = create_listing(&db, &seller, apartment(), Utc::now()).unwrap();
        let live = create_listing(&db, &seller, apartment(), Utc::now()).unwrap();
        set_listing_status(&db, &seller, live.id, ListingStatus::Active).unwrap();

        let found = search_listings(&db, &SearchQuery::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, live.id);
        assert_ne!(found[0].id, draft.id);

        let (category, found) = browse_category(&db, "alugar-casa-apartamento", SearchQuery::default()).unwrap();
        assert_eq!(category.id.to_string(), REAL_ESTATE_CATEGORY_ID);
        assert_eq!(found.len(), 1);

        let (_, found) = browse_category(&db, "veiculos", SearchQuery::default()).unwrap();
        assert!(found.is_empty());
        assert!(matches!(
            browse_category(&db, "nope", SearchQuery::default()),
            Err(MarketError::NotFound(_))
        ));
    }

    #[test]
    fn my_listings_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let seller = user(&db, "seller");
        let t0 = Utc::now();
        let older = create_listing(&db, &seller, apartment(), t0).unwrap();
        let newer = create_listing(&db, &seller, apartment(), t0 + chrono::Duration::seconds(5)).unwrap();

        let mine = get_my_listings(&db, &seller).unwrap();
        assert_eq!(mine.iter().map(|l| l.id).collect::<Vec<_>>(), [newer.id, older.id]);
    }

    #[test]
    fn detail_derives_tier_area_price_and_video() {
        use mercado_types::promotion::{PlanTier, PromotionState};

        let db = Database::open_in_memory().unwrap();
        let seller = user(&db, "seller");
        let mut req = apartment();
        req.attributes = ListingAttributes::RealEstate(RealEstateAttributes {
            size: Some(50.0),
            video_url: Some("https://cdn.example.com/tour.mp4".into()),
            ..Default::default()
        });
        let mut listing = create_listing(&db, &seller, req, Utc::now()).unwrap();

        let now = Utc::now();
        listing.promotion = PromotionState {
            plan_tier: PlanTier::Premium,
            plan_expires_at: Some(now + chrono::Duration::days(3)),
            ..Default::default()
        };
        let detail = listing_detail(listing.clone(), now);
        assert_eq!(detail.effective_tier, PlanTier::Premium);
        assert_eq!(detail.price_per_square_meter, Some(50));
        assert_eq!(detail.video_url.as_deref(), Some("https://cdn.example.com/tour.mp4"));

        let later = listing_detail(listing, now + chrono::Duration::days(4));
        assert_eq!(later.effective_tier, PlanTier::Normal);
    }

    /// A backend whose every call fails.
    struct Unreachable;

    fn down<T>() -> anyhow::Result<T> {
        Err(anyhow::anyhow!("connection refused"))
    }

    impl ListingBackend for Unreachable {
        fn list_categories(&self) -> anyhow::Result<Vec<mercado_db::models::CategoryRow>> {
            down()
        }
        fn get_category(&self, _: &str) -> anyhow::Result<Option<mercado_db::models::CategoryRow>> {
            down()
        }
        fn get_category_by_slug(&self, _: &str) -> anyhow::Result<Option<mercado_db::models::CategoryRow>> {
            down()
        }
        fn insert_listing(&self, _: &ListingWrite) -> anyhow::Result<()> {
            down()
        }
        fn update_listing(&self, _: &ListingWrite) -> anyhow::Result<bool> {
            down()
        }
        fn set_listing_status(&self, _: &str, _: &str, _: &str) -> anyhow::Result<bool> {
            down()
        }
        fn update_listing_promotion(&self, _: &str, _: &str, _: &str) -> anyhow::Result<bool> {
            down()
        }
        fn get_listing(&self, _: &str) -> anyhow::Result<Option<ListingRow>> {
            down()
        }
        fn listings_by_owner(&self, _: &str) -> anyhow::Result<Vec<ListingRow>> {
            down()
        }
        fn search_listings(&self, _: &SearchParams) -> anyhow::Result<Vec<ListingRow>> {
            down()
        }
    }

    #[test]
    fn failed_search_is_empty_not_an_error() {
        let query = SearchQuery {
            city: Some("Florianópolis".into()),
            ..Default::default()
        };
        assert!(search_listings(&Unreachable, &query).is_empty());

        // other reads still surface the failure
        assert!(matches!(
            get_listing(&Unreachable, Uuid::new_v4()),
            Err(MarketError::Backend(_))
        ));
    }
}
