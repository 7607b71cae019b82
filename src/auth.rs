use std::sync::Arc;

use actix_web::{dev::ServiceRequest, web, Error, HttpMessage};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{LoginField, Role, User, UserSummary},
    state::AppState,
    store::Store,
};

pub const TOKEN_TTL_HOURS: i64 = 24;

/// Authenticated caller, as carried by a verified token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
    pub name: String,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub role: Role,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Result of a successful login.
#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub user: UserSummary,
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = PasswordHash::new(password_hash);
    match parsed_hash {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

/// Signs and verifies HS256 session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::hours(TOKEN_TTL_HOURS))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, principal: &Principal) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            id: principal.id,
            role: principal.role,
            name: principal.name.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[derive(Clone)]
pub struct AuthGuard {
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
}

impl AuthGuard {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    /// Resolves `identifier` against email, then phone, then account name.
    pub async fn authenticate(&self, identifier: &str, secret: &str) -> AppResult<Session> {
        let identifier = identifier.trim();
        let user = self
            .resolve_identifier(identifier)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.is_blocked() {
            return Err(AppError::Forbidden("Account blocked".to_string()));
        }

        if !verify_password(secret, &user.password_hash) {
            log::info!("Rejected login for user {}: wrong password", user.id);
            return Err(AppError::InvalidCredential);
        }

        let principal = Principal::from(&user);
        let token = self
            .tokens
            .issue(&principal)
            .map_err(|err| AppError::Internal(format!("token signing failed: {err}")))?;
        let service_ids = self.store.assigned_service_ids(user.id).await?;

        log::info!("{} signed in as {}", user.account_name, user.role);
        Ok(Session {
            token,
            user: UserSummary { user, service_ids },
        })
    }

    /// First field that matches wins. A different user matching a later
    /// field is reported, never silently merged.
    async fn resolve_identifier(&self, identifier: &str) -> AppResult<Option<User>> {
        let mut matched: Option<(LoginField, User)> = None;

        for field in LoginField::LOOKUP_ORDER {
            let Some(candidate) = self.store.find_user_by_login(field, identifier).await? else {
                continue;
            };
            match &matched {
                None => matched = Some((field, candidate)),
                Some((first_field, first)) if first.id != candidate.id => {
                    log::warn!(
                        "Login identifier is ambiguous: user {} matches by {:?}, user {} by {:?}; using user {}",
                        first.id,
                        first_field,
                        candidate.id,
                        field,
                        first.id
                    );
                }
                Some(_) => {}
            }
        }

        Ok(matched.map(|(_, user)| user))
    }

    pub fn require_auth(&self, credential: Option<&str>) -> AppResult<Principal> {
        let token = credential
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthenticated("Missing token".to_string()))?;

        let claims = self.tokens.verify(token).map_err(|err| {
            log::debug!("Token rejected: {err}");
            AppError::Unauthenticated("Invalid or expired token".to_string())
        })?;

        Ok(Principal {
            id: claims.id,
            role: claims.role,
            name: claims.name,
        })
    }
}

pub fn require_role(principal: &Principal, role: Role) -> AppResult<()> {
    if principal.role != role {
        return Err(AppError::Forbidden(format!("{role} access required")));
    }
    Ok(())
}

fn authorize(
    req: &ServiceRequest,
    credentials: Option<&BearerAuth>,
    role: Option<Role>,
) -> AppResult<Principal> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state missing".to_string()))?;
    let principal = state.guard.require_auth(credentials.map(BearerAuth::token))?;
    if let Some(role) = role {
        require_role(&principal, role)?;
    }
    Ok(principal)
}

pub async fn bearer_validator(
    req: ServiceRequest,
    credentials: Option<BearerAuth>,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    match authorize(&req, credentials.as_ref(), None) {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            Ok(req)
        }
        Err(err) => Err((err.into(), req)),
    }
}

pub async fn admin_validator(
    req: ServiceRequest,
    credentials: Option<BearerAuth>,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    match authorize(&req, credentials.as_ref(), Some(Role::Admin)) {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            Ok(req)
        }
        Err(err) => Err((err.into(), req)),
    }
}
