//! Authentication service: register, login, refresh and profile flows.

use newsdesk_core::auth::AuthError;
use newsdesk_core::auth::cipher::SecretCipher;
use newsdesk_core::auth::jwt::TokenService;
use newsdesk_core::auth::password::{CredentialCheck, check_credential, hash_password};
use newsdesk_core::models::auth::{NewPrincipal, Principal, Role};
use newsdesk_core::store::Store;
use newsdesk_core::validation::{validate_login, validate_registration};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{AccessTokenPayload, AuthPayload, LoginRequest, RegisterRequest};

fn issue_pair(tokens: &TokenService, principal: Principal) -> AppResult<AuthPayload> {
    Ok(AuthPayload {
        access_token: tokens.issue_access_token(principal.id)?,
        refresh_token: tokens.issue_refresh_token(principal.id)?,
        user: principal,
    })
}

/// Register a new principal. The first principal ever becomes Admin; every
/// later one is a User regardless of what the client asks for.
pub async fn register(
    store: &dyn Store,
    tokens: &TokenService,
    req: &RegisterRequest,
) -> AppResult<AuthPayload> {
    let reg = validate_registration(&req.name, &req.email, &req.password)?;

    if store.find_principal_by_email(&reg.email).await?.is_some() {
        return Err(AppError::Validation("Email is already registered".into()));
    }

    let principal = store
        .register_principal(NewPrincipal {
            name: reg.name,
            email: reg.email,
            password_hash: hash_password(&reg.password)?,
            role: Role::User,
        })
        .await?;

    if principal.role == Role::Admin {
        info!(principal_id = %principal.id, "first principal granted Admin role");
    } else {
        info!(principal_id = %principal.id, "principal registered");
    }
    issue_pair(tokens, principal)
}

/// Authenticate with email and password.
///
/// Unknown email and wrong password fail identically. A matching legacy
/// record is re-hashed with bcrypt before the tokens are issued.
pub async fn login(
    store: &dyn Store,
    tokens: &TokenService,
    cipher: Option<&SecretCipher>,
    req: &LoginRequest,
) -> AppResult<AuthPayload> {
    let email = validate_login(&req.email, &req.password)?;

    let Some(record) = store.find_principal_by_email(&email).await? else {
        debug!("login for unknown email");
        return Err(AuthError::CredentialError.into());
    };

    match check_credential(&req.password, &record.password_hash, cipher)? {
        CredentialCheck::Valid => {}
        CredentialCheck::ValidLegacy => {
            let hash = hash_password(&req.password)?;
            store
                .update_password_hash(record.principal.id, &hash)
                .await?;
            info!(principal_id = %record.principal.id, "legacy credential upgraded to bcrypt");
        }
        CredentialCheck::Invalid => {
            debug!(principal_id = %record.principal.id, "login with wrong password");
            return Err(AuthError::CredentialError.into());
        }
    }

    issue_pair(tokens, record.principal)
}

/// Exchange a refresh token for a new access token.
///
/// Tokens carry no flavor, so any unexpired token signed by this server is
/// accepted here.
pub async fn refresh(
    store: &dyn Store,
    tokens: &TokenService,
    refresh_token: &str,
) -> AppResult<AccessTokenPayload> {
    let refresh_token = refresh_token.trim();
    if refresh_token.is_empty() {
        return Err(AppError::Unauthorized("Refresh token is required".into()));
    }
    let principal_id = tokens.verify(refresh_token)?;

    if store.find_principal(principal_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }

    Ok(AccessTokenPayload {
        access_token: tokens.issue_access_token(principal_id)?,
    })
}

/// The caller's own record.
pub async fn profile(store: &dyn Store, principal_id: Uuid) -> AppResult<Principal> {
    store
        .find_principal(principal_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}
