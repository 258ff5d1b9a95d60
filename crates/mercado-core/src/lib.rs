//! Adapters over the marketplace backend.
//!
//! Every operation that acts on behalf of a user takes an explicit
//! [`Identity`]; nothing here reads an ambient session.

pub mod analytics;
pub mod backend;
mod convert;
pub mod conversations;
pub mod error;
pub mod favorites;
pub mod listings;
pub mod profiles;
pub mod promotion;

pub use backend::Backend;
pub use error::{MarketError, Result, require_identity};
pub use mercado_types::models::Identity;
