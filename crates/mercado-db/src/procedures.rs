//! Remote procedures exposed by the backend.

use anyhow::{Result, anyhow, bail};
use serde_json::Value;

use crate::Database;
use crate::models::{ListingRow, SearchParams};
use crate::queries::{LISTING_SELECT, map_listing_row};

impl Database {
    /// `increment_listing_counter(listing_id, counter_type)`: atomic `+1` on
    /// one analytics key. `counter_type` is one of `view`, `whatsapp`, `email`.
    pub fn increment_listing_counter(&self, listing_id: &str, counter_type: &str) -> Result<()> {
        let column = match counter_type {
            "view" => "views",
            "whatsapp" => "whatsapp_clicks",
            "email" => "email_clicks",
            other => bail!("unknown counter type: {}", other),
        };

        self.with_conn(|conn| {
            let sql = format!("UPDATE listings SET {col} = {col} + 1 WHERE id = ?1", col = column);
            let changed = conn.execute(&sql, [listing_id])?;
            if changed == 0 {
                return Err(anyhow!("Listing not found: {}", listing_id));
            }
            Ok(())
        })
    }

    /// `search_listings(category_id, city, price_min, price_max, attrs)`:
    /// active listings matching every given filter, newest first. `city`
    /// compares case-insensitively; each `attrs` entry must equal the
    /// listing's attribute of the same key.
    pub fn search_listings(&self, params: &SearchParams) -> Result<Vec<ListingRow>> {
        let rows = self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE l.status = 'active'
                   AND (?1 IS NULL OR l.category_id = ?1)
                   AND (?2 IS NULL OR l.price >= ?2)
                   AND (?3 IS NULL OR l.price <= ?3)
                 ORDER BY l.created_at DESC",
                LISTING_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![params.category_id, params.price_min, params.price_max],
                    map_listing_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        // SQLite's lower() only folds ASCII; city names carry accents.
        let city = params.city.as_deref().map(str::to_lowercase);

        Ok(rows
            .into_iter()
            .filter(|row| match &city {
                Some(city) => row.city.as_deref().map(str::to_lowercase).as_ref() == Some(city),
                None => true,
            })
            .filter(|row| params.attrs.is_empty() || attributes_match(&row.attributes, &params.attrs))
            .collect())
    }
}

fn attributes_match(stored: &str, wanted: &serde_json::Map<String, Value>) -> bool {
    let Ok(Value::Object(stored)) = serde_json::from_str::<Value>(stored) else {
        return false;
    };
    wanted
        .iter()
        .all(|(key, value)| stored.get(key).is_some_and(|have| same_value(have, value)))
}

/// JSON equality where `80` and `80.0` are the same number.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
