use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use mercado_types::api::Claims;
use mercado_types::models::Identity;

use crate::auth::AppState;

/// Who is calling, if anyone. Inserted into every request's extensions.
#[derive(Debug, Clone, Default)]
pub struct Session(pub Option<Identity>);

impl Session {
    pub fn identity(&self) -> mercado_core::Result<&Identity> {
        mercado_core::require_identity(self.0.as_ref())
    }
}

/// Resolve the bearer token, if any, into a [`Session`]. A missing or
/// invalid token yields an anonymous session; handlers that need a user
/// reject it themselves.
pub async fn resolve_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let identity = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .and_then(|auth| verify_token(&state.jwt_secret, auth.token()));

    req.extensions_mut().insert(Session(identity));
    next.run(req).await
}

pub fn verify_token(secret: &str, token: &str) -> Option<Identity> {
    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default()) {
        Ok(data) => Some(Identity {
            user_id: data.claims.sub,
            name: data.claims.name,
        }),
        Err(e) => {
            debug!("Rejected bearer token: {}", e);
            None
        }
    }
}
