use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use parley_core::Actor;
use parley_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Resolve the caller from an optional `Authorization: Bearer <jwt>` header
/// and store it as an [`Actor`] extension. Requests without the header run
/// as the anonymous actor; a present but invalid token is rejected.
pub async fn resolve_actor(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let actor = match req.headers().get(header::AUTHORIZATION) {
        None => Actor::anonymous(),
        Some(value) => {
            let token = value
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix("Bearer "))
                .ok_or(ApiError::AuthRequired)?;
            let claims = decode_claims(&state.jwt_secret, token).ok_or(ApiError::AuthRequired)?;
            Actor::user(claims.sub)
        }
    };

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

pub fn decode_claims(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::create_token;
    use uuid::Uuid;

    #[test]
    fn tokens_only_verify_with_their_secret() {
        let user_id = Uuid::new_v4();
        let token = create_token("s3cret", user_id, "ana").unwrap();

        let claims = decode_claims("s3cret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.name, "ana");
        assert!(decode_claims("other", &token).is_none());
    }
}
