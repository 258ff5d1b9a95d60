use crate::models::{
    AnalyticsRow, CategoryRow, ConversationRow, ListingRow, ListingWrite, MessageRow, ProfileRow,
    UserRow,
};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, Row};

/// Listing columns joined with the owner's profile. Callers append WHERE/ORDER.
pub(crate) const LISTING_SELECT: &str = "
    SELECT l.id, l.title, l.description, l.price, l.category_id, l.listing_type,
           l.city, l.state, l.status, l.owner_id, l.attributes, l.promotion, l.images,
           l.views, l.whatsapp_clicks, l.email_clicks, l.created_at,
           p.name, p.phone, p.avatar_url
    FROM listings l
    LEFT JOIN profiles p ON p.id = l.owner_id";

const CONVERSATION_SELECT: &str = "
    SELECT c.id, c.listing_id, c.buyer_id, c.seller_id, c.created_at,
           l.title, b.name, s.name
    FROM conversations c
    LEFT JOIN listings l ON l.id = c.listing_id
    LEFT JOIN profiles b ON b.id = c.buyer_id
    LEFT JOIN profiles s ON s.id = c.seller_id";

impl Database {
    // -- Users & profiles --

    /// Create a user and its (empty) profile in one transaction.
    /// Create a user and its profile. Returns false when the email is taken.
    pub fn create_user(&self, id: &str, email: &str, password_hash: &str, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let inserted = tx.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)
                 ON CONFLICT(email) DO NOTHING",
                (id, email, password_hash),
            )?;
            if inserted == 0 {
                return Ok(false);
            }
            tx.execute("INSERT INTO profiles (id, name) VALUES (?1, ?2)", (id, name))?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, password, created_at FROM users WHERE email = ?1",
                [email],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, phone, avatar_url, created_at FROM profiles WHERE id = ?1",
                [id],
                |row| {
                    Ok(ProfileRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        phone: row.get(2)?,
                        avatar_url: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Returns false when no profile exists for `id`.
    pub fn update_profile(&self, id: &str, name: Option<&str>, phone: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET name = COALESCE(?2, name), phone = COALESCE(?3, phone) WHERE id = ?1",
                rusqlite::params![id, name, phone],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Categories --

    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, slug, kind FROM categories ORDER BY name")?;
            let rows = stmt
                .query_map([], map_category_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_category(&self, id: &str) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, slug, kind FROM categories WHERE id = ?1",
                [id],
                map_category_row,
            )
            .optional()
        })
    }

    pub fn get_category_by_slug(&self, slug: &str) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, slug, kind FROM categories WHERE slug = ?1",
                [slug],
                map_category_row,
            )
            .optional()
        })
    }

    // -- Listings --

    pub fn insert_listing(&self, listing: &ListingWrite) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO listings (id, title, description, price, category_id, listing_type,
                                       city, state, status, owner_id, attributes, images, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    listing.id,
                    listing.title,
                    listing.description,
                    listing.price,
                    listing.category_id,
                    listing.listing_type,
                    listing.city,
                    listing.state,
                    listing.status,
                    listing.owner_id,
                    listing.attributes,
                    listing.images,
                    listing.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Rewrite a listing's editable columns. Only the owner's write lands;
    /// returns false otherwise.
    pub fn update_listing(&self, listing: &ListingWrite) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE listings
                 SET title = ?3, description = ?4, price = ?5, listing_type = ?6,
                     city = ?7, state = ?8, status = ?9, attributes = ?10, images = ?11
                 WHERE id = ?1 AND owner_id = ?2",
                rusqlite::params![
                    listing.id,
                    listing.owner_id,
                    listing.title,
                    listing.description,
                    listing.price,
                    listing.listing_type,
                    listing.city,
                    listing.state,
                    listing.status,
                    listing.attributes,
                    listing.images,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_listing_status(&self, id: &str, owner_id: &str, status: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE listings SET status = ?3 WHERE id = ?1 AND owner_id = ?2",
                (id, owner_id, status),
            )?;
            Ok(changed > 0)
        })
    }

    /// Replace the whole promotion record of a listing. Owner only.
    pub fn update_listing_promotion(&self, id: &str, owner_id: &str, promotion: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE listings SET promotion = ?3 WHERE id = ?1 AND owner_id = ?2",
                (id, owner_id, promotion),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_listing(&self, id: &str) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE l.id = ?1", LISTING_SELECT);
            conn.query_row(&sql, [id], map_listing_row).optional()
        })
    }

    pub fn listings_by_owner(&self, owner_id: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE l.owner_id = ?1 ORDER BY l.created_at DESC", LISTING_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], map_listing_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Analytics bag --

    pub fn get_listing_analytics(&self, id: &str) -> Result<Option<AnalyticsRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT views, whatsapp_clicks, email_clicks FROM listings WHERE id = ?1",
                [id],
                |row| {
                    Ok(AnalyticsRow {
                        views: row.get(0)?,
                        whatsapp_clicks: row.get(1)?,
                        email_clicks: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Write the whole analytics bag, but only if it still holds `expected`.
    /// Returns false when another writer got there first.
    pub fn compare_and_set_analytics(
        &self,
        id: &str,
        expected: AnalyticsRow,
        next: AnalyticsRow,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE listings
                 SET views = ?2, whatsapp_clicks = ?3, email_clicks = ?4
                 WHERE id = ?1 AND views = ?5 AND whatsapp_clicks = ?6 AND email_clicks = ?7",
                rusqlite::params![
                    id,
                    next.views,
                    next.whatsapp_clicks,
                    next.email_clicks,
                    expected.views,
                    expected.whatsapp_clicks,
                    expected.email_clicks,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Favorites --

    pub fn find_favorite(&self, user_id: &str, listing_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM favorites WHERE user_id = ?1 AND listing_id = ?2",
                (user_id, listing_id),
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn insert_favorite(&self, id: &str, user_id: &str, listing_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO favorites (id, user_id, listing_id) VALUES (?1, ?2, ?3)",
                (id, user_id, listing_id),
            )?;
            Ok(())
        })
    }

    pub fn delete_favorite(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM favorites WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn favorite_listing_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT listing_id FROM favorites WHERE user_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    pub fn favorite_listings(&self, user_id: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} JOIN favorites f ON f.listing_id = l.id WHERE f.user_id = ?1 ORDER BY f.created_at DESC",
                LISTING_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_listing_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Conversations --

    /// Find the conversation for (listing, buyer), creating it if absent.
    /// The UNIQUE(listing_id, buyer_id) constraint makes this safe under
    /// concurrent callers: losers of the race read the winner's row.
    pub fn find_or_create_conversation(
        &self,
        id: &str,
        listing_id: &str,
        buyer_id: &str,
        seller_id: &str,
        created_at: &str,
    ) -> Result<ConversationRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations (id, listing_id, buyer_id, seller_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(listing_id, buyer_id) DO NOTHING",
                (id, listing_id, buyer_id, seller_id, created_at),
            )?;

            let sql = format!("{} WHERE c.listing_id = ?1 AND c.buyer_id = ?2", CONVERSATION_SELECT);
            let row = conn.query_row(&sql, (listing_id, buyer_id), map_conversation_row)?;
            Ok(row)
        })
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.id = ?1", CONVERSATION_SELECT);
            conn.query_row(&sql, [id], map_conversation_row).optional()
        })
    }

    /// Conversations where the user is buyer or seller, newest first.
    pub fn conversations_for_user(&self, user_id: &str) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE c.buyer_id = ?1 OR c.seller_id = ?1 ORDER BY c.created_at DESC",
                CONVERSATION_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_conversation_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// Append a message. The insert only lands when `sender_id` is a
    /// participant of the conversation; returns false otherwise.
    pub fn insert_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        body: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, body, created_at)
                 SELECT ?1, c.id, ?3, ?4, ?5
                 FROM conversations c
                 WHERE c.id = ?2 AND (c.buyer_id = ?3 OR c.seller_id = ?3)",
                (id, conversation_id, sender_id, body, created_at),
            )?;
            Ok(changed > 0)
        })
    }

    /// All messages of a conversation, oldest first. `None` when the
    /// conversation does not exist or `viewer_id` is not a participant.
    pub fn get_messages(&self, conversation_id: &str, viewer_id: &str) -> Result<Option<Vec<MessageRow>>> {
        self.with_conn(|conn| {
            if !is_participant(conn, conversation_id, viewer_id)? {
                return Ok(None);
            }
            query_messages(conn, conversation_id).map(Some)
        })
    }

    /// Stamp `read_at` on the other party's unread messages. Returns how many were marked.
    pub fn mark_messages_read(&self, conversation_id: &str, reader_id: &str, read_at: &str) -> Result<usize> {
        self.with_conn(|conn| {
            if !is_participant(conn, conversation_id, reader_id)? {
                return Ok(0);
            }
            let changed = conn.execute(
                "UPDATE messages SET read_at = ?3
                 WHERE conversation_id = ?1 AND sender_id != ?2 AND read_at IS NULL",
                (conversation_id, reader_id, read_at),
            )?;
            Ok(changed)
        })
    }
}

fn is_participant(conn: &Connection, conversation_id: &str, user_id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM conversations WHERE id = ?1 AND (buyer_id = ?2 OR seller_id = ?2)",
            (conversation_id, user_id),
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn query_messages(conn: &Connection, conversation_id: &str) -> Result<Vec<MessageRow>> {
    // rowid breaks ties between messages stamped in the same microsecond
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, sender_id, body, created_at, read_at
         FROM messages
         WHERE conversation_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;

    let rows = stmt
        .query_map([conversation_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                sender_id: row.get(2)?,
                body: row.get(3)?,
                created_at: row.get(4)?,
                read_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_category_row(row: &Row<'_>) -> rusqlite::Result<CategoryRow> {
    Ok(CategoryRow {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        kind: row.get(3)?,
    })
}

pub(crate) fn map_listing_row(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        category_id: row.get(4)?,
        listing_type: row.get(5)?,
        city: row.get(6)?,
        state: row.get(7)?,
        status: row.get(8)?,
        owner_id: row.get(9)?,
        attributes: row.get(10)?,
        promotion: row.get(11)?,
        images: row.get(12)?,
        analytics: AnalyticsRow {
            views: row.get(13)?,
            whatsapp_clicks: row.get(14)?,
            email_clicks: row.get(15)?,
        },
        created_at: row.get(16)?,
        owner_name: row.get(17)?,
        owner_phone: row.get(18)?,
        owner_avatar_url: row.get(19)?,
    })
}

fn map_conversation_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        buyer_id: row.get(2)?,
        seller_id: row.get(3)?,
        created_at: row.get(4)?,
        listing_title: row.get(5)?,
        buyer_name: row.get(6)?,
        seller_name: row.get(7)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::VEHICLES_CATEGORY_ID;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("seller", "seller@example.com", "hash", "Seller").unwrap();
        db.create_user("buyer", "buyer@example.com", "hash", "Buyer").unwrap();
        db.create_user("other", "other@example.com", "hash", "Other").unwrap();
        db.insert_listing(&ListingWrite {
            id: "l1".into(),
            title: "Civic 2015".into(),
            description: Some("Bem conservado".into()),
            price: Some(55000.0),
            category_id: VEHICLES_CATEGORY_ID.into(),
            listing_type: Some("produto".into()),
            city: Some("Florianópolis".into()),
            state: Some("SC".into()),
            status: "active".into(),
            owner_id: "seller".into(),
            attributes: "{}".into(),
            images: "[]".into(),
            created_at: "2026-03-01T12:00:00.000000Z".into(),
        })
        .unwrap();
        db
    }

    #[test]
    fn duplicate_email_creates_nothing() {
        let db = seeded();
        assert!(!db.create_user("seller2", "seller@example.com", "hash", "Impostor").unwrap());
        assert!(db.get_profile("seller2").unwrap().is_none());
        assert_eq!(db.get_user_by_email("seller@example.com").unwrap().unwrap().id, "seller");
    }

    #[test]
    fn listing_joins_owner_profile() {
        let db = seeded();
        let row = db.get_listing("l1").unwrap().unwrap();
        assert_eq!(row.owner_name.as_deref(), Some("Seller"));
        assert_eq!(row.status, "active");
        assert!(db.get_listing("nope").unwrap().is_none());
    }

    #[test]
    fn only_owner_can_update_listing() {
        let db = seeded();
        assert!(!db.set_listing_status("l1", "buyer", "inactive").unwrap());
        assert!(!db.update_listing_promotion("l1", "buyer", "{}").unwrap());
        assert!(db.set_listing_status("l1", "seller", "inactive").unwrap());
        assert_eq!(db.get_listing("l1").unwrap().unwrap().status, "inactive");
    }

    #[test]
    fn conversation_is_unique_per_listing_and_buyer() {
        let db = seeded();
        let first = db
            .find_or_create_conversation("c1", "l1", "buyer", "seller", "2026-03-02T00:00:00.000000Z")
            .unwrap();
        let second = db
            .find_or_create_conversation("c2", "l1", "buyer", "seller", "2026-03-03T00:00:00.000000Z")
            .unwrap();

        assert_eq!(first.id, "c1");
        assert_eq!(second.id, "c1");
        assert_eq!(second.listing_title.as_deref(), Some("Civic 2015"));
        assert_eq!(db.conversations_for_user("seller").unwrap().len(), 1);
        assert_eq!(db.conversations_for_user("buyer").unwrap().len(), 1);
        assert!(db.conversations_for_user("other").unwrap().is_empty());
    }

    #[test]
    fn messages_require_participant_and_keep_order() {
        let db = seeded();
        db.find_or_create_conversation("c1", "l1", "buyer", "seller", "2026-03-02T00:00:00.000000Z")
            .unwrap();

        let ts = "2026-03-02T00:00:01.000000Z";
        assert!(db.insert_message("m1", "c1", "buyer", "Oi, ainda disponível?", ts).unwrap());
        assert!(db.insert_message("m2", "c1", "seller", "Sim!", ts).unwrap());
        assert!(!db.insert_message("m3", "c1", "other", "spam", ts).unwrap());
        assert!(!db.insert_message("m4", "missing", "buyer", "hello", ts).unwrap());

        let messages = db.get_messages("c1", "seller").unwrap().unwrap();
        assert_eq!(messages.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), ["m1", "m2"]);
        assert!(db.get_messages("c1", "other").unwrap().is_none());

        assert_eq!(db.mark_messages_read("c1", "seller", "2026-03-02T01:00:00.000000Z").unwrap(), 1);
        let messages = db.get_messages("c1", "buyer").unwrap().unwrap();
        assert!(messages[0].read_at.is_some());
        assert!(messages[1].read_at.is_none());
    }

    #[test]
    fn favorites_pair_is_unique() {
        let db = seeded();
        db.insert_favorite("f1", "buyer", "l1").unwrap();
        assert!(db.insert_favorite("f2", "buyer", "l1").is_err());
        assert_eq!(db.find_favorite("buyer", "l1").unwrap().as_deref(), Some("f1"));
        assert_eq!(db.favorite_listing_ids("buyer").unwrap(), ["l1"]);
        assert_eq!(db.favorite_listings("buyer").unwrap().len(), 1);

        db.delete_favorite("f1").unwrap();
        assert!(db.find_favorite("buyer", "l1").unwrap().is_none());
    }

    #[test]
    fn analytics_cas_detects_concurrent_writer() {
        let db = seeded();
        let read = db.get_listing_analytics("l1").unwrap().unwrap();
        db.increment_listing_counter("l1", "view").unwrap();

        let mut next = read;
        next.views += 1;
        assert!(!db.compare_and_set_analytics("l1", read, next).unwrap());

        let fresh = db.get_listing_analytics("l1").unwrap().unwrap();
        let mut next = fresh;
        next.views += 1;
        assert!(db.compare_and_set_analytics("l1", fresh, next).unwrap());
        assert_eq!(db.get_listing_analytics("l1").unwrap().unwrap().views, 2);
    }

    #[test]
    fn profile_update_keeps_unset_fields() {
        let db = seeded();
        assert!(db.update_profile("buyer", None, Some("+55 48 99999-0000")).unwrap());
        let profile = db.get_profile("buyer").unwrap().unwrap();
        assert_eq!(profile.name.as_deref(), Some("Buyer"));
        assert_eq!(profile.phone.as_deref(), Some("+55 48 99999-0000"));
        assert!(!db.update_profile("ghost", Some("x"), None).unwrap());
    }

    #[test]
    fn concurrent_contacts_share_one_conversation() {
        let db = seeded();

        let ids: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let db = &db;
                    scope.spawn(move || {
                        db.find_or_create_conversation(
                            &format!("c{}", i),
                            "l1",
                            "buyer",
                            "seller",
                            "2026-03-02T09:00:00.000000Z",
                        )
                        .unwrap()
                        .id
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(db.conversations_for_user("buyer").unwrap().len(), 1);
    }
}
