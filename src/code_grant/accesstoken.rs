//! Provides the handling for Access Token Requests.
//!
//! Every request to the token endpoint passes the same gate before it is dispatched on its grant
//! type: the grant type must be enabled, the client must authenticate, and the client must be
//! registered for the grant. The exchange of an authorization code is implemented here, the other
//! grants live in their own modules.
use std::collections::HashMap;

use chrono::Utc;
use ring::constant_time::verify_slices_are_equal;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use crate::code_grant::error::{BoxError, ErrorCode, NisoError};
use crate::code_grant::{self, client_credentials, extension, password, refresh, Endpoint, Issue};
use crate::endpoint::Response;
use crate::primitives::grant::{AccessData, ClientData, GrantType, RefreshTokenData};
use crate::primitives::scope::Scope;
use crate::primitives::storage::{Context, Storage};

/// A parsed request to the token endpoint.
///
/// Client credentials have already been extracted from either the `Authorization` header or the
/// body, the engine does not care which. Which of the optional fields are required depends on the
/// grant type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccessRequest {
    /// The raw `grant_type` parameter.
    pub grant_type: String,

    /// The authenticating client.
    pub client_id: String,

    /// The secret of the client, absent for public clients.
    pub client_secret: Option<String>,

    /// The authorization code, for `authorization_code`.
    pub code: Option<String>,

    /// The redirect uri used to obtain the code, for `authorization_code`.
    pub redirect_uri: Option<String>,

    /// The refresh token, for `refresh_token`.
    pub refresh_token: Option<String>,

    /// The resource owner name, for `password`.
    pub username: Option<String>,

    /// The resource owner password, for `password`.
    pub password: Option<String>,

    /// The requested scope.
    pub scope: Option<String>,

    /// All parameters not understood by the engine, available to extension grants.
    pub extensions: HashMap<String, String>,

    /// Data the approval callback wants stored with the issued token.
    pub user_data: Option<Value>,
}

/// The successful result of a token request.
///
/// Serializes to the json body of an [Access Token Response].
///
/// [Access Token Response]: https://tools.ietf.org/html/rfc6749#section-5.1
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token issued.
    pub access_token: String,

    /// The type of the token, always `Bearer`.
    pub token_type: String,

    /// The lifetime of the access token in seconds.
    pub expires_in: i64,

    /// A refresh token for obtaining new access tokens, if one was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// The granted scope, only present when it differs from the one requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// The `token_type` of every issued token.
    pub const BEARER: &'static str = "Bearer";

    pub(crate) fn new(
        access: &AccessData, refresh: Option<&RefreshTokenData>, requested: Option<&Scope>,
    ) -> Self {
        let scope = if access.scope.is_empty() || requested == Some(&access.scope) {
            None
        } else {
            Some(access.scope.to_string())
        };

        TokenResponse {
            access_token: access.access_token.clone(),
            token_type: TokenResponse::BEARER.to_string(),
            expires_in: access.expires_in,
            refresh_token: refresh.map(|refresh| refresh.refresh_token.clone()),
            scope,
        }
    }

    /// The response as key value pairs, for delivery in a redirect fragment.
    pub fn into_pairs(self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("access_token".to_string(), self.access_token),
            ("token_type".to_string(), self.token_type),
            ("expires_in".to_string(), self.expires_in.to_string()),
        ];

        if let Some(refresh_token) = self.refresh_token {
            pairs.push(("refresh_token".to_string(), refresh_token));
        }

        if let Some(scope) = self.scope {
            pairs.push(("scope".to_string(), scope));
        }

        pairs
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// The value of a required parameter, `invalid_request` if it is absent or empty.
pub(crate) fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, NisoError> {
    non_empty(value).ok_or_else(|| NisoError::new(ErrorCode::InvalidRequest, format!("missing {}", name)))
}

fn grant_type(endpoint: &dyn Endpoint, request: &AccessRequest) -> Result<GrantType, NisoError> {
    if request.grant_type.is_empty() {
        return Err(NisoError::new(ErrorCode::InvalidRequest, "missing grant_type"));
    }

    match GrantType::from(request.grant_type.as_str()) {
        GrantType::Implicit => Err(NisoError::new(
            ErrorCode::UnsupportedGrantType,
            "the implicit grant is not available at the token endpoint",
        )),
        grant if endpoint.config().allows_access_type(&grant) => Ok(grant),
        _ => Err(NisoError::new(
            ErrorCode::UnsupportedGrantType,
            "grant_type is not supported",
        )),
    }
}

/// Authenticate the client of a token request.
///
/// A public client must not present a secret, a confidential one must present its exact secret.
/// Unknown clients and wrong secrets are indistinguishable to the caller.
pub fn authenticate(endpoint: &dyn Endpoint, ctx: &Context, request: &AccessRequest) -> Result<ClientData, NisoError> {
    let invalid = || NisoError::new(ErrorCode::InvalidClient, "client authentication failed");

    if request.client_id.is_empty() {
        return Err(invalid());
    }

    let client = code_grant::storage(endpoint)
        .get_client_data(ctx, &request.client_id)
        .map_err(|err| code_grant::storage_error(err, ErrorCode::InvalidClient, "client authentication failed"))?;

    let passed = match (client.is_public(), non_empty(&request.client_secret)) {
        (true, None) => true,
        (true, Some(_)) | (false, None) => false,
        (false, Some(secret)) => {
            verify_slices_are_equal(secret.as_bytes(), client.client_secret.as_bytes()).is_ok()
        }
    };

    if passed {
        Ok(client)
    } else {
        Err(invalid())
    }
}

/// Ask the host to approve a token request that passed all checks.
///
/// A refusal becomes `denied`. A callback error which already is a `NisoError` is passed on as is,
/// any other error is an internal failure.
pub(crate) fn approval<F>(approve: F, request: &mut AccessRequest, denied: ErrorCode) -> Result<(), NisoError>
where
    F: FnOnce(&mut AccessRequest) -> Result<bool, BoxError>,
{
    match approve(request) {
        Ok(true) => Ok(()),
        Ok(false) => Err(NisoError::new(denied, "the request was not approved")),
        Err(err) => match err.downcast::<NisoError>() {
            Ok(err) => Err(*err),
            Err(err) => {
                log::warn!("Approval of a token request failed: {}", err);
                Err(NisoError::wrap(ErrorCode::ServerError, err, "internal server error"))
            }
        },
    }
}

/// Run a token request to completion.
///
/// Dispatches on the grant type once the client has been authenticated. Nothing is persisted
/// unless every check of the grant passed and the callback approved.
pub fn access_token<F>(
    endpoint: &dyn Endpoint, ctx: &Context, request: &mut AccessRequest, approve: F,
) -> Result<Response, NisoError>
where
    F: FnOnce(&mut AccessRequest) -> Result<bool, BoxError>,
{
    let grant = grant_type(endpoint, request)?;
    let client = authenticate(endpoint, ctx, request)?;

    if !client.permits(&grant) {
        return Err(NisoError::new(
            ErrorCode::UnauthorizedClient,
            "client may not use this grant_type",
        ));
    }

    let token = match grant {
        GrantType::AuthorizationCode => authorization_code(endpoint, ctx, &client, request, approve),
        GrantType::RefreshToken => refresh::refresh(endpoint, ctx, &client, request, approve),
        GrantType::Password => password::password(endpoint, ctx, &client, request, approve),
        GrantType::ClientCredentials => {
            client_credentials::client_credentials(endpoint, ctx, &client, request, approve)
        }
        GrantType::Extension(_) => extension::extension(endpoint, ctx, &client, request, approve),
        GrantType::Implicit => Err(NisoError::new(
            ErrorCode::UnsupportedGrantType,
            "grant_type is not supported",
        )),
    }?;

    Ok(Response::Token(token))
}

/// Exchange an authorization code for an access token.
///
/// The code is consumed atomically: of two concurrent exchanges of the same code only the one
/// that actually deleted it receives tokens.
pub fn authorization_code<F>(
    endpoint: &dyn Endpoint, ctx: &Context, client: &ClientData, request: &mut AccessRequest, approve: F,
) -> Result<TokenResponse, NisoError>
where
    F: FnOnce(&mut AccessRequest) -> Result<bool, BoxError>,
{
    let code = required(&request.code, "code")?.to_string();
    let storage = code_grant::storage(endpoint);

    let data = storage
        .get_authorize_data(ctx, &code)
        .map_err(|err| code_grant::storage_error(err, ErrorCode::InvalidGrant, "invalid authorization code"))?;

    if data.client_id != client.client_id {
        return Err(NisoError::new(
            ErrorCode::InvalidGrant,
            "authorization code was issued to another client",
        ));
    }

    if data.is_expired_at(Utc::now()) {
        return Err(NisoError::new(ErrorCode::InvalidGrant, "authorization code expired"));
    }

    let redirect_uri = non_empty(&request.redirect_uri).unwrap_or(client.redirect_uri.as_str());
    if redirect_uri != data.redirect_uri {
        return Err(NisoError::new(
            ErrorCode::InvalidGrant,
            "redirect_uri does not match the authorization request",
        ));
    }

    let requested = code_grant::requested_scope(request.scope.as_deref())?;
    let scope = code_grant::narrow_scope(requested.as_ref(), &data.scope)?;

    request.redirect_uri = Some(data.redirect_uri.clone());
    request.scope = Some(scope.to_string());
    if request.user_data.is_none() {
        request.user_data = data.user_data.clone();
    }

    approval(approve, request, ErrorCode::AccessDenied)?;

    let consumed = storage
        .delete_authorize_data(ctx, &code)
        .map_err(code_grant::server_error)?;
    if !consumed {
        return Err(NisoError::new(
            ErrorCode::InvalidGrant,
            "authorization code was already used",
        ));
    }

    let (access, refresh) = code_grant::issue(
        endpoint,
        ctx,
        Issue {
            client_id: &client.client_id,
            authorization_code: Some(code),
            scope,
            redirect_uri: data.redirect_uri,
            user_data: request.user_data.clone(),
            refresh: endpoint.config().issues_refresh_tokens(),
        },
    )?;

    Ok(TokenResponse::new(&access, refresh.as_ref(), requested.as_ref()))
}
