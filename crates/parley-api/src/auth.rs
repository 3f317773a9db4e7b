use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use parley_core::CoreError;
use parley_db::queries::users;
use parley_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use rand_core::OsRng;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::state::AppState;

const NAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;
const MIN_PASSWORD_LEN: usize = 8;
const TOKEN_TTL_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if !NAME_LEN.contains(&name.chars().count()) {
        return Err(ApiError::validation("name must be 3 to 32 characters"));
    }
    if !email.contains('@') {
        return Err(ApiError::validation("email is invalid"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation("password must be at least 8 characters"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .to_string();

    let user_id = Uuid::new_v4();
    let (user_name, user_email) = (name.clone(), email.clone());
    let created = state
        .run(move |core| {
            core.db().transaction(|conn| {
                if users::get_user_by_email(conn, &user_email)?.is_some() {
                    return Ok(false);
                }
                users::insert_user(conn, user_id, &user_name, &user_email, &password_hash)?;
                Ok::<_, CoreError>(true)
            })
        })
        .await?;
    if !created {
        return Err(ApiError::EmailTaken);
    }

    info!("User {} registered as {}", user_id, name);
    let token = create_token(&state.jwt_secret, user_id, &name)?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    let user = state
        .run(move |core| {
            core.db()
                .with_conn(|conn| users::get_user_by_email(conn, &email))
                .map_err(CoreError::from)
        })
        .await?
        .ok_or(ApiError::BadCredentials)?;

    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::BadCredentials)?;

    let token = create_token(&state.jwt_secret, user.id, &user.name)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        name: user.name,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, name: &str) -> Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.to_string()))
}
