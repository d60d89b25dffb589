//! Request accountability
//!
//! A middleware resolves the `Authorization: Bearer <token>` header into an
//! `Accountability` and stores it on the request. Handlers read it back with
//! the `RequestAccountability` extractor. Requests without the header are
//! anonymous; an unknown token is rejected outright.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::core::{Accountability, CoreError, CoreResult};

use super::errors::ApiError;

/// Maps bearer tokens to accountability
pub trait AccountabilityResolver: Send + Sync {
    fn resolve(&self, token: &str) -> CoreResult<Accountability>;
}

/// Fixed token table, typically loaded from config
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, Accountability>,
}

impl StaticTokenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, accountability: Accountability) -> Self {
        self.tokens.insert(token.into(), accountability);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl AccountabilityResolver for StaticTokenResolver {
    fn resolve(&self, token: &str) -> CoreResult<Accountability> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(CoreError::Unauthorized)
    }
}

/// Accountability attached to the current request; `None` when anonymous
#[derive(Debug, Clone, Default)]
pub struct RequestAccountability(pub Option<Accountability>);

impl RequestAccountability {
    /// The caller's accountability, or a 401 if there is no user
    pub fn require_user(&self) -> Result<&Accountability, ApiError> {
        match &self.0 {
            Some(acc) if acc.is_authenticated() => Ok(acc),
            _ => Err(ApiError::unauthorized()),
        }
    }

    /// The caller's accountability, anonymous when absent
    pub fn or_anonymous(&self) -> Accountability {
        self.0.clone().unwrap_or_else(Accountability::anonymous)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestAccountability
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestAccountability>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Middleware resolving the bearer token of every request
pub async fn resolve_accountability(
    State(resolver): State<Arc<dyn AccountabilityResolver>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let accountability = match request.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => {
            let token = value
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(ApiError::unauthorized)?;
            Some(resolver.resolve(token)?)
        }
    };

    request
        .extensions_mut()
        .insert(RequestAccountability(accountability));
    Ok(next.run(request).await)
}
