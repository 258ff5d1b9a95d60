//! Favorites adapter: a (user, listing) pair whose existence is toggled.

use tracing::debug;
use uuid::Uuid;

use mercado_types::models::{Identity, Listing};

use crate::backend::{FavoriteBackend, ListingBackend};
use crate::convert;
use crate::error::{MarketError, Result};

/// Flip the favorite state of `listing_id` for `who`. Returns true when the
/// listing is now a favorite.
///
/// Check-then-write: two concurrent toggles by the same user can race. The
/// backend's UNIQUE(user_id, listing_id) is the only guard, so the losing
/// insert surfaces as a backend error.
pub fn toggle_favorite<B>(backend: &B, who: &Identity, listing_id: Uuid) -> Result<bool>
where
    B: FavoriteBackend + ListingBackend,
{
    let user_id = who.user_id.to_string();
    let listing_id = listing_id.to_string();

    if backend.get_listing(&listing_id)?.is_none() {
        return Err(MarketError::NotFound("listing"));
    }

    match backend.find_favorite(&user_id, &listing_id)? {
        Some(existing) => {
            backend.delete_favorite(&existing)?;
            debug!("User {} unfavorited {}", user_id, listing_id);
            Ok(false)
        }
        None => {
            backend.insert_favorite(&Uuid::new_v4().to_string(), &user_id, &listing_id)?;
            debug!("User {} favorited {}", user_id, listing_id);
            Ok(true)
        }
    }
}

pub fn get_favorite_ids(backend: &impl FavoriteBackend, who: &Identity) -> Result<Vec<Uuid>> {
    Ok(backend
        .favorite_listing_ids(&who.user_id.to_string())?
        .iter()
        .map(|id| convert::id(id, "favorite listing_id"))
        .collect())
}

pub fn get_favorite_listings(backend: &impl FavoriteBackend, who: &Identity) -> Result<Vec<Listing>> {
    Ok(backend
        .favorite_listings(&who.user_id.to_string())?
        .into_iter()
        .map(convert::listing)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mercado_db::Database;
    use mercado_db::migrations::VEHICLES_CATEGORY_ID;
    use mercado_types::api::NewListingRequest;

    use crate::listings::create_listing;

    fn setup() -> (Database, Identity, Listing) {
        let db = Database::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for name in ["seller", "buyer"] {
            let id = Uuid::new_v4();
            db.create_user(&id.to_string(), &format!("{}@example.com", name), "hash", name)
                .unwrap();
            ids.push(Identity { user_id: id, name: name.into() });
        }
        let listing = create_listing(
            &db,
            &ids[0],
            NewListingRequest {
                title: "Bicicleta".into(),
                description: None,
                price: Some(800.0),
                category_id: VEHICLES_CATEGORY_ID.parse().unwrap(),
                listing_type: Some("produto".into()),
                city: None,
                state: None,
                attributes: Default::default(),
                images: vec![],
            },
            Utc::now(),
        )
        .unwrap();
        (db, ids.remove(1), listing)
    }

    #[test]
    fn toggle_is_its_own_inverse() {
        let (db, buyer, listing) = setup();

        assert!(toggle_favorite(&db, &buyer, listing.id).unwrap());
        assert_eq!(get_favorite_ids(&db, &buyer).unwrap(), [listing.id]);
        assert_eq!(get_favorite_listings(&db, &buyer).unwrap()[0].title, "Bicicleta");

        assert!(!toggle_favorite(&db, &buyer, listing.id).unwrap());
        assert!(get_favorite_ids(&db, &buyer).unwrap().is_empty());
    }

    #[test]
    fn unknown_listing_is_not_found() {
        let (db, buyer, _) = setup();
        assert!(matches!(
            toggle_favorite(&db, &buyer, Uuid::new_v4()),
            Err(MarketError::NotFound(_))
        ));
    }
}
