//! Provides the handling for Authorization Requests.
//!
//! Validation resolves the client and its redirect uri first. Until the redirect uri has been
//! verified against the registration, errors are never redirected: sending the user agent to an
//! unverified uri is exactly the open redirect the exact match guards against. Every later error
//! is delivered to the client by redirect.
use chrono::Utc;
use serde_json::Value;
use url::Url;

use crate::code_grant::accesstoken::TokenResponse;
use crate::code_grant::error::{BoxError, ErrorCode, NisoError};
use crate::code_grant::{self, Endpoint, Issue};
use crate::endpoint::{Redirect, Response};
use crate::primitives::generator::TokenKind;
use crate::primitives::grant::{AuthorizationData, ClientData, ResponseType};
use crate::primitives::scope::Scope;
use crate::primitives::storage::{Context, Storage};

/// A parsed request to the authorization endpoint.
///
/// Fields hold the raw parameter values. After validation, and before the approval callback is
/// invoked, `redirect_uri` and `scope` are replaced by the resolved values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthorizationRequest {
    /// The requested `response_type`, `code` or `token`.
    pub response_type: String,

    /// Identity of the client trying to gain authorization.
    pub client_id: String,

    /// The redirect uri, defaulted to the registered one when absent.
    pub redirect_uri: Option<String>,

    /// The requested scope, defaulted to the client scope when absent.
    pub scope: Option<String>,

    /// Opaque value of the client, echoed in every response.
    pub state: String,

    /// Data the approval callback wants stored with the issued code or token.
    pub user_data: Option<Value>,
}

/// A request whose client and redirect uri passed validation.
#[derive(Clone, Debug)]
pub struct ValidAuthorization {
    /// The registered client.
    pub client: ClientData,

    /// The requested response type.
    pub response_type: ResponseType,

    /// The exact redirect uri to deliver the result to.
    pub redirect_uri: String,

    /// The scope the request will be granted, if approved.
    pub scope: Scope,

    /// The scope the client requested, `None` if it inherited the default.
    pub requested_scope: Option<Scope>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// Validate an authorization request against the client registration and configuration.
///
/// Errors carry the state of the request and, once verified, the redirect uri.
pub fn validate(
    endpoint: &dyn Endpoint, ctx: &Context, request: &AuthorizationRequest,
) -> Result<ValidAuthorization, NisoError> {
    let state = request.state.as_str();

    if request.client_id.is_empty() {
        return Err(NisoError::new(ErrorCode::InvalidRequest, "missing client_id").with_state(state));
    }

    let client = code_grant::storage(endpoint)
        .get_client_data(ctx, &request.client_id)
        .map_err(|err| {
            code_grant::storage_error(err, ErrorCode::InvalidClient, "unknown client").with_state(state)
        })?;

    let redirect_uri = match non_empty(&request.redirect_uri) {
        None => client.redirect_uri.clone(),
        Some(uri) if uri == client.redirect_uri => uri.to_string(),
        Some(_) => {
            return Err(NisoError::new(
                ErrorCode::InvalidRequest,
                "redirect_uri does not match the registered redirect uri",
            )
            .with_state(state))
        }
    };

    if redirect_uri.is_empty() {
        return Err(NisoError::new(ErrorCode::InvalidRequest, "client has no redirect uri").with_state(state));
    }

    // A registration that can not be redirected to must fail before anything is persisted.
    if let Err(err) = Url::parse(&redirect_uri) {
        log::warn!(
            "Client {:?} is registered with a malformed redirect uri: {}",
            client.client_id,
            err
        );
        return Err(
            NisoError::wrap(ErrorCode::InvalidRequest, err, "client has no valid redirect uri").with_state(state),
        );
    }

    let redirected = |err: NisoError| err.with_redirect_uri(redirect_uri.as_str()).with_state(state);

    let response_type = match request.response_type.parse::<ResponseType>() {
        Ok(response_type) if endpoint.config().allows_authorize_type(response_type) => response_type,
        _ => {
            return Err(redirected(NisoError::new(
                ErrorCode::UnsupportedResponseType,
                "response_type is not supported",
            )))
        }
    };

    if !client.permits(&response_type.grant_type()) {
        return Err(redirected(NisoError::new(
            ErrorCode::UnauthorizedClient,
            "client may not use this response_type",
        )));
    }

    let requested_scope = code_grant::requested_scope(request.scope.as_deref()).map_err(&redirected)?;
    let scope = code_grant::client_scope(endpoint.config(), &client, requested_scope.as_ref())
        .map_err(&redirected)?;

    Ok(ValidAuthorization {
        client,
        response_type,
        redirect_uri,
        scope,
        requested_scope,
    })
}

/// Run an authorization request to completion.
///
/// On approval a code is issued for `response_type=code`, or an access token for the implicit
/// `response_type=token`. Denial and callback errors are both reported as `access_denied`.
pub fn authorize<F>(
    endpoint: &dyn Endpoint, ctx: &Context, request: &mut AuthorizationRequest, approve: F,
) -> Result<Response, NisoError>
where
    F: FnOnce(&mut AuthorizationRequest) -> Result<bool, BoxError>,
{
    let valid = validate(endpoint, ctx, request)?;
    let state = request.state.clone();
    let redirected = |err: NisoError| err.with_redirect_uri(valid.redirect_uri.as_str()).with_state(state.as_str());

    request.redirect_uri = Some(valid.redirect_uri.clone());
    request.scope = Some(valid.scope.to_string());

    match approve(request) {
        Ok(true) => (),
        Ok(false) => {
            return Err(redirected(NisoError::new(
                ErrorCode::AccessDenied,
                "the resource owner denied the request",
            )))
        }
        Err(err) => {
            return Err(redirected(NisoError::wrap(
                ErrorCode::AccessDenied,
                err,
                "the resource owner denied the request",
            )))
        }
    }

    match valid.response_type {
        ResponseType::Code => issue_code(endpoint, ctx, request, &valid, &state),
        ResponseType::Token => issue_implicit(endpoint, ctx, request, &valid, &state),
    }
    .map_err(redirected)
}

/// `state` is the value received from the client, unaffected by the approval callback.
fn issue_code(
    endpoint: &dyn Endpoint, ctx: &Context, request: &AuthorizationRequest, valid: &ValidAuthorization,
    state: &str,
) -> Result<Response, NisoError> {
    let data = AuthorizationData {
        code: code_grant::generate(endpoint, TokenKind::AuthorizationCode)?,
        client_id: valid.client.client_id.clone(),
        created_at: Utc::now(),
        expires_in: endpoint.config().authorization_expiration,
        redirect_uri: valid.redirect_uri.clone(),
        state: state.to_string(),
        scope: valid.scope.clone(),
        user_data: request.user_data.clone(),
    };

    code_grant::storage(endpoint)
        .save_authorize_data(ctx, &data)
        .map_err(code_grant::server_error)?;

    let mut parameters = vec![("code".to_string(), data.code)];
    if !state.is_empty() {
        parameters.push(("state".to_string(), state.to_string()));
    }

    Ok(Response::Redirect(Redirect::query(valid.redirect_uri.clone(), parameters)))
}

fn issue_implicit(
    endpoint: &dyn Endpoint, ctx: &Context, request: &AuthorizationRequest, valid: &ValidAuthorization,
    state: &str,
) -> Result<Response, NisoError> {
    let (access, _) = code_grant::issue(
        endpoint,
        ctx,
        Issue {
            client_id: &valid.client.client_id,
            authorization_code: None,
            scope: valid.scope.clone(),
            redirect_uri: valid.redirect_uri.clone(),
            user_data: request.user_data.clone(),
            refresh: false,
        },
    )?;

    let token = TokenResponse::new(&access, None, valid.requested_scope.as_ref());
    let mut parameters = token.into_pairs();
    if !state.is_empty() {
        parameters.push(("state".to_string(), state.to_string()));
    }

    Ok(Response::Redirect(Redirect::fragment(valid.redirect_uri.clone(), parameters)))
}
