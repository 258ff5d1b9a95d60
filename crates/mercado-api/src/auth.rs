use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};
use uuid::Uuid;

use mercado_core::MarketError;
use mercado_db::Database;
use mercado_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::{ApiError, ApiResult, blocking};
use crate::extract::JsonBody;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    let name = req.name.trim().to_string();

    // Validate input
    if !email.contains('@') {
        return Err(MarketError::validation("a valid email is required").into());
    }
    if req.password.len() < 8 {
        return Err(MarketError::validation("password must have at least 8 characters").into());
    }
    if name.is_empty() {
        return Err(MarketError::validation("name is required").into());
    }
    if name.chars().count() > 80 {
        return Err(MarketError::validation("name must have at most 80 characters").into());
    }

    let user_id = Uuid::new_v4();
    let taken = {
        let email = email.clone();
        blocking(&state, move |db| {
            // Hash password with Argon2id
            let salt = SaltString::generate(&mut OsRng);
            let password_hash = Argon2::default()
                .hash_password(req.password.as_bytes(), &salt)
                .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
                .to_string();

            // the UNIQUE(email) insert decides races between registrations
            let created = db.create_user(&user_id.to_string(), &email, &password_hash, &name)?;
            Ok(!created)
        })
        .await?
    };

    if taken {
        return Err(ApiError::new(StatusCode::CONFLICT, "EMAIL_TAKEN", "email already registered"));
    }

    let token = create_token(&state.jwt_secret, user_id, req.name.trim()).map_err(|e| {
        error!("Token creation failed: {}", e);
        ApiError::internal()
    })?;

    info!("Registered user {}", user_id);
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    let unauthorized = || ApiError::new(StatusCode::UNAUTHORIZED, "BAD_CREDENTIALS", "wrong email or password");

    let found = blocking(&state, move |db| {
        let Some(user) = db.get_user_by_email(&email)? else {
            return Ok(None);
        };

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored hash unreadable: {}", e))?;
        if Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Ok(None);
        }

        let name = db
            .get_profile(&user.id)?
            .and_then(|p| p.name)
            .unwrap_or_default();
        Ok(Some((user.id, name)))
    })
    .await?;

    let (raw_id, name) = found.ok_or_else(unauthorized)?;
    let user_id: Uuid = raw_id.parse().map_err(|_| ApiError::internal())?;

    let token = create_token(&state.jwt_secret, user_id, &name).map_err(|e| {
        error!("Token creation failed: {}", e);
        ApiError::internal()
    })?;

    Ok(Json(LoginResponse {
        user_id,
        name,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, name: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
