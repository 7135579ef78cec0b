//! # Authentication
//!
//! Every catalog route expects a Firebase ID token as `Authorization: Bearer`.
//! Mutations additionally need the `admin: true` custom claim, which is
//! granted through `/admin/set-claim` (or the `grant-admin` CLI for the
//! first admin).
//!
//! The extractors only depend on [`TokenVerifier`], so tests swap in a
//! static verifier instead of talking to Google.
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use serde::Serialize;
use thiserror::Error;

pub mod firebase;

pub use firebase::{FirebaseAuth, ServiceAccount};

use crate::{error::AppError, state::State};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Admin privileges required")]
    NotAdmin,

    #[error("No user with uid {0}")]
    UnknownUser(String),

    #[error("Custom claims are not configured")]
    NotConfigured,

    #[error("Identity provider error: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub admin: bool,
}

/// A verified user carrying the admin claim.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Catalog reader. Anonymous only when public reads are enabled.
#[derive(Debug, Clone)]
pub struct Reader(pub Option<AuthUser>);

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

#[async_trait]
pub trait ClaimsAdmin: Send + Sync {
    async fn set_admin_claim(&self, uid: &str, admin: bool) -> Result<(), AuthError>;
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("header is not ASCII".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AuthError::InvalidToken("expected `Bearer <token>`".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::InvalidToken(
            "expected `Bearer <token>`".to_string(),
        ));
    }

    Ok(token.trim())
}

impl FromRequestParts<Arc<State>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<State>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        Ok(state.verifier.verify(token).await?)
    }
}

impl FromRequestParts<Arc<State>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<State>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        if !user.admin {
            return Err(AuthError::NotAdmin.into());
        }

        Ok(AdminUser(user))
    }
}

impl FromRequestParts<Arc<State>> for Reader {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<State>,
    ) -> Result<Self, Self::Rejection> {
        if state.config.public_reads && !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(Reader(None));
        }

        AuthUser::from_request_parts(parts, state)
            .await
            .map(|user| Reader(Some(user)))
    }
}
