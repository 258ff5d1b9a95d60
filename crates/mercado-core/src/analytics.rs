//! View / click counters.
//!
//! The `increment_listing_counter` procedure is the primary path. When it
//! fails, the analytics bag is read, bumped and written back with a
//! conditional update on the values read; a conflicting writer forces a
//! re-read. After [`FALLBACK_ATTEMPTS`] conflicts the increment is dropped,
//! so the fallback can under-count but never overwrites a concurrent bump.

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use mercado_types::models::CounterKind;

use crate::backend::CounterBackend;
use crate::convert;
use crate::error::{MarketError, Result};

pub const FALLBACK_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterOutcome {
    /// Counted by the atomic procedure.
    Atomic,
    /// Counted by the read-modify-write fallback.
    Fallback,
    /// Lost to concurrent writers on every fallback attempt.
    Dropped,
}

pub fn record(backend: &impl CounterBackend, listing_id: Uuid, kind: CounterKind) -> Result<CounterOutcome> {
    let id = listing_id.to_string();

    match backend.increment_listing_counter(&id, kind.as_str()) {
        Ok(()) => {
            debug!("Counted {} on {}", kind.as_str(), id);
            return Ok(CounterOutcome::Atomic);
        }
        Err(e) => warn!("increment_listing_counter failed for {}, falling back: {}", id, e),
    }

    for _ in 0..FALLBACK_ATTEMPTS {
        let read = backend
            .get_listing_analytics(&id)?
            .ok_or(MarketError::NotFound("listing"))?;

        let mut bag = convert::analytics(read);
        kind.bump(&mut bag);

        if backend.compare_and_set_analytics(&id, read, convert::analytics_row(&bag))? {
            return Ok(CounterOutcome::Fallback);
        }
    }

    warn!(
        "Dropped {} increment on {} after {} conflicting writes",
        kind.as_str(),
        id,
        FALLBACK_ATTEMPTS
    );
    Ok(CounterOutcome::Dropped)
}

pub fn record_view(backend: &impl CounterBackend, listing_id: Uuid) -> Result<CounterOutcome> {
    record(backend, listing_id, CounterKind::View)
}

/// A contact click: `whatsapp` or `email`.
pub fn record_click(backend: &impl CounterBackend, listing_id: Uuid, kind: CounterKind) -> Result<CounterOutcome> {
    if kind == CounterKind::View {
        return Err(MarketError::validation("views are not clicks"));
    }
    record(backend, listing_id, kind)
}

/// E-mail contact form: needs an address and a ticked robot check before
/// the click is counted.
pub fn contact_by_email(
    backend: &impl CounterBackend,
    listing_id: Uuid,
    email: &str,
    robot_checked: bool,
) -> Result<CounterOutcome> {
    if email.trim().is_empty() {
        return Err(MarketError::validation("email is required"));
    }
    if !robot_checked {
        return Err(MarketError::validation("robot check is required"));
    }
    record(backend, listing_id, CounterKind::Email)
}
