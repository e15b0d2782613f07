//! # Principal Extraction
//!
//! Authentication lives upstream: a gateway verifies credentials and
//! forwards the resolved identity in request headers. The extractors here
//! parse those headers and enforce the one authorization rule this core
//! owns: staff-only access to moderation routes. Anything beyond that
//! (ownership checks, session handling) is the gateway's business.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use domains::{AccountStatus, AccountType, Principal};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-auth-user-id";
pub const USERNAME_HEADER: &str = "x-auth-username";
pub const ACCOUNT_TYPE_HEADER: &str = "x-auth-account-type";
pub const STATUS_HEADER: &str = "x-auth-status";

/// Any authenticated principal.
pub struct Authenticated(pub Principal);

/// An authenticated Admin or Moderator; everyone else gets 403.
pub struct Staff(pub Principal);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

fn parse_principal(headers: &HeaderMap) -> Option<Principal> {
    let id = header(headers, USER_ID_HEADER)?.parse().ok()?;
    let username = header(headers, USERNAME_HEADER)?.to_string();
    let account_type = match header(headers, ACCOUNT_TYPE_HEADER)? {
        "Admin" => AccountType::Admin,
        "Moderator" => AccountType::Moderator,
        "Commenter" => AccountType::Commenter,
        "Blogger" => AccountType::Blogger,
        _ => return None,
    };
    let status = match header(headers, STATUS_HEADER)? {
        "Good" => AccountStatus::Good,
        "Restricted" => AccountStatus::Restricted,
        "Banned" => AccountStatus::Banned,
        _ => return None,
    };
    Some(Principal {
        id,
        username,
        account_type,
        status,
    })
}

impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_principal(&parts.headers)
            .map(Authenticated)
            .ok_or(ApiError::Unauthorized)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Staff {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Authenticated(principal) = Authenticated::from_request_parts(parts, state).await?;
        if !principal.is_staff() {
            return Err(ApiError::Forbidden);
        }
        Ok(Staff(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn headers(account_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, Uuid::now_v7().to_string().parse().unwrap());
        headers.insert(USERNAME_HEADER, "someone".parse().unwrap());
        headers.insert(ACCOUNT_TYPE_HEADER, account_type.parse().unwrap());
        headers.insert(STATUS_HEADER, "Good".parse().unwrap());
        headers
    }

    #[test]
    fn gateway_headers_resolve_to_a_principal() {
        let principal = parse_principal(&headers("Moderator")).unwrap();
        assert_eq!(principal.account_type, AccountType::Moderator);
        assert!(principal.is_staff());
    }

    #[test]
    fn unknown_account_type_is_rejected() {
        assert!(parse_principal(&headers("Superuser")).is_none());
    }

    #[test]
    fn missing_headers_are_rejected() {
        assert!(parse_principal(&HeaderMap::new()).is_none());
    }
}
