use crate::config::JwtConfig;
use crate::utils::error::{AppError, AppResult};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use rocket_okapi::request::OpenApiFromRequest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32, // user_id
    pub role: Role,
    pub exp: usize,
}

// Any signed-in customer
#[derive(Debug, OpenApiFromRequest)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub role: Role,
}

// Signed-in user whose token carries the admin role
#[derive(Debug, OpenApiFromRequest)]
pub struct AdminUser {
    pub user_id: i32,
}

// Tokens are issued by the login service; this is used by that service and by tests
pub fn generate_token(
    user_id: i32,
    role: Role,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(config.expires_in_hours))
        .unwrap_or_else(chrono::Utc::now)
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

pub fn decode_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

fn bearer_claims(request: &Request<'_>) -> AppResult<Claims> {
    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or_else(|| AppError::AuthError("Missing bearer token".into()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::AuthError("Malformed authorization header".into()))?;

    let config = request
        .rocket()
        .state::<JwtConfig>()
        .ok_or_else(|| AppError::AuthError("Token verification is not configured".into()))?;

    decode_token(token, config).map_err(|_| AppError::AuthError("Invalid or expired token".into()))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AppError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match bearer_claims(request) {
            Ok(claims) => Outcome::Success(AuthenticatedUser {
                user_id: claims.sub,
                role: claims.role,
            }),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = AppError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let user = match request.guard::<AuthenticatedUser>().await {
            Outcome::Success(user) => user,
            Outcome::Error(failure) => return Outcome::Error(failure),
            Outcome::Forward(status) => return Outcome::Forward(status),
        };

        if user.role == Role::Admin {
            Outcome::Success(AdminUser { user_id: user.user_id })
        } else {
            let err = AppError::Forbidden("Admin role required".into());
            Outcome::Error((err.status(), err))
        }
    }
}
