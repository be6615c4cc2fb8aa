//! Available backend algorithms.
//!
//! The backend codifies the requirements from the [RFC 6749] into types and functions as safely
//! as possible. Each grant is a small state machine with a single state, evaluate and terminate:
//! every precondition is checked in order and the first one failing produces a [`NisoError`].
//! Nothing is persisted before all checks have passed, so no failure ever needs to be
//! compensated.
//!
//! ## Usage
//!
//! For all purposes you should have a look at the [`Server`] in [`endpoint`] instead, which
//! dispatches requests to the functions in this module. They are public so that hosts with
//! unusual requirements can assemble their own endpoint around the [`Endpoint`] trait.
//!
//! [RFC 6749]: https://tools.ietf.org/html/rfc6749
//! [`NisoError`]: error/struct.NisoError.html
//! [`Server`]: ../endpoint/struct.Server.html
//! [`endpoint`]: ../endpoint/index.html
//! [`Endpoint`]: trait.Endpoint.html
use chrono::Utc;
use serde_json::Value;

use crate::endpoint::ServerConfig;
use crate::primitives::generator::{TokenGenerator, TokenKind};
use crate::primitives::grant::{AccessData, AuthorizationData, ClientData, RefreshTokenData};
use crate::primitives::scope::Scope;
use crate::primitives::storage::{Context, Storage, StorageError};

use self::error::{ErrorCode, NisoError};

pub mod accesstoken;
pub mod authorization;
pub mod client_credentials;
pub mod error;
pub mod extension;
pub mod password;
pub mod refresh;

/// Required functionality shared by all grant flows.
///
/// The engine holds no state of its own besides these three, so any implementation can be shared
/// between concurrent requests as long as its storage can.
pub trait Endpoint {
    /// The immutable configuration of the server.
    fn config(&self) -> &ServerConfig;

    /// The persistence backend.
    fn storage(&self) -> &dyn Storage;

    /// The source of codes and tokens.
    fn generator(&self) -> &dyn TokenGenerator;
}

/// Storage adapter checking the context before every operation.
///
/// A cancelled request or one past its deadline never reaches the backend, even if the backend
/// itself ignores the context.
pub(crate) struct Checked<'a>(pub &'a dyn Storage);

impl Storage for Checked<'_> {
    fn get_client_data(&self, ctx: &Context, client_id: &str) -> Result<ClientData, StorageError> {
        ctx.check()?;
        self.0.get_client_data(ctx, client_id)
    }

    fn save_authorize_data(&self, ctx: &Context, data: &AuthorizationData) -> Result<(), StorageError> {
        ctx.check()?;
        self.0.save_authorize_data(ctx, data)
    }

    fn get_authorize_data(&self, ctx: &Context, code: &str) -> Result<AuthorizationData, StorageError> {
        ctx.check()?;
        self.0.get_authorize_data(ctx, code)
    }

    fn delete_authorize_data(&self, ctx: &Context, code: &str) -> Result<bool, StorageError> {
        ctx.check()?;
        self.0.delete_authorize_data(ctx, code)
    }

    fn save_access_data(&self, ctx: &Context, data: &AccessData) -> Result<(), StorageError> {
        ctx.check()?;
        self.0.save_access_data(ctx, data)
    }

    fn get_refresh_token_data(&self, ctx: &Context, token: &str) -> Result<RefreshTokenData, StorageError> {
        ctx.check()?;
        self.0.get_refresh_token_data(ctx, token)
    }

    fn save_refresh_token_data(&self, ctx: &Context, data: &RefreshTokenData) -> Result<(), StorageError> {
        ctx.check()?;
        self.0.save_refresh_token_data(ctx, data)
    }

    fn delete_refresh_token_data(&self, ctx: &Context, token: &str) -> Result<bool, StorageError> {
        ctx.check()?;
        self.0.delete_refresh_token_data(ctx, token)
    }
}

pub(crate) fn storage(endpoint: &dyn Endpoint) -> Checked<'_> {
    Checked(endpoint.storage())
}

/// Reclassify a storage failure at the point of use.
///
/// An absent record becomes the client facing `not_found` code. Anything else is an internal
/// failure whose cause is logged and never shown to the client.
pub(crate) fn storage_error(error: StorageError, not_found: ErrorCode, message: &'static str) -> NisoError {
    match error {
        StorageError::NotFound => NisoError::new(not_found, message),
        other @ StorageError::Cancelled
        | other @ StorageError::DeadlineExceeded
        | other @ StorageError::Backend(_) => {
            log::warn!("Storage failure reported as server_error: {}", other);
            NisoError::wrap(ErrorCode::ServerError, other, "internal server error")
        }
    }
}

/// Storage failure of an operation where the record must exist, such as saving.
pub(crate) fn server_error(error: StorageError) -> NisoError {
    storage_error(error, ErrorCode::ServerError, "internal server error")
}

pub(crate) fn generate(endpoint: &dyn Endpoint, kind: TokenKind) -> Result<String, NisoError> {
    endpoint.generator().generate(kind).map_err(|()| {
        log::warn!("Token generator failed for {:?}", kind);
        NisoError::new(ErrorCode::ServerError, "internal server error")
    })
}

/// Parse the scope parameter of a request, treating an empty one as absent.
pub(crate) fn requested_scope(scope: Option<&str>) -> Result<Option<Scope>, NisoError> {
    match scope {
        None => Ok(None),
        Some(scope) if scope.trim().is_empty() => Ok(None),
        Some(scope) => scope
            .parse()
            .map(Some)
            .map_err(|err| NisoError::wrap(ErrorCode::InvalidScope, err, "malformed scope")),
    }
}

/// Restrict a requested scope to the one originally granted.
///
/// An absent request inherits the original scope, a present one must be a subset of it.
pub(crate) fn narrow_scope(requested: Option<&Scope>, granted: &Scope) -> Result<Scope, NisoError> {
    match requested {
        None => Ok(granted.clone()),
        Some(scope) if scope.is_subset_of(granted) => Ok(scope.clone()),
        Some(_) => Err(NisoError::new(
            ErrorCode::InvalidScope,
            "requested scope exceeds the granted scope",
        )),
    }
}

/// Determine the scope for grants without an earlier authorization.
///
/// The client's registered scope is both the default and the upper bound, a client without one is
/// unrestricted. The result must additionally satisfy the server wide scope policy, if any.
pub(crate) fn client_scope(
    config: &ServerConfig, client: &ClientData, requested: Option<&Scope>,
) -> Result<Scope, NisoError> {
    let scope = match &client.scope {
        Some(registered) => narrow_scope(requested, registered)?,
        None => requested.cloned().unwrap_or_default(),
    };

    match &config.allowed_scopes {
        Some(policy) if !scope.is_subset_of(policy) => Err(NisoError::new(
            ErrorCode::InvalidScope,
            "requested scope is not allowed by this server",
        )),
        _ => Ok(scope),
    }
}

/// Parameters of a token about to be issued.
pub(crate) struct Issue<'a> {
    pub client_id: &'a str,
    pub authorization_code: Option<String>,
    pub scope: Scope,
    pub redirect_uri: String,
    pub user_data: Option<Value>,
    pub refresh: bool,
}

/// Mint and persist an access token and, if requested, a refresh token linked to it.
pub(crate) fn issue(
    endpoint: &dyn Endpoint, ctx: &Context, issue: Issue,
) -> Result<(AccessData, Option<RefreshTokenData>), NisoError> {
    let config = endpoint.config();
    let now = Utc::now();

    let access = AccessData {
        access_token: generate(endpoint, TokenKind::AccessToken)?,
        client_id: issue.client_id.to_string(),
        authorization_code: issue.authorization_code,
        created_at: now,
        expires_in: config.access_expiration,
        scope: issue.scope,
        redirect_uri: issue.redirect_uri,
        user_data: issue.user_data,
    };

    let refresh = if issue.refresh {
        Some(RefreshTokenData {
            refresh_token: generate(endpoint, TokenKind::RefreshToken)?,
            client_id: access.client_id.clone(),
            access_token: access.access_token.clone(),
            created_at: now,
            expires_in: config.refresh_expiration,
            scope: access.scope.clone(),
            redirect_uri: access.redirect_uri.clone(),
            user_data: access.user_data.clone(),
        })
    } else {
        None
    };

    // The access token last, so a failed save never leaves a usable token behind.
    if let Some(refresh) = &refresh {
        storage(endpoint)
            .save_refresh_token_data(ctx, refresh)
            .map_err(server_error)?;
    }

    storage(endpoint)
        .save_access_data(ctx, &access)
        .map_err(server_error)?;

    Ok((access, refresh))
}
