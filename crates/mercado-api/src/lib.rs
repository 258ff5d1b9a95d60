pub mod auth;
pub mod conversations;
pub mod error;
pub mod extract;
pub mod favorites;
pub mod listings;
pub mod middleware;
pub mod profile;
pub mod promotion;
pub mod routes;

pub use auth::{AppState, AppStateInner};
pub use routes::router;
