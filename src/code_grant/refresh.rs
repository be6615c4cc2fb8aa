//! Retrieve a refreshed access token.
//!
//! See [Refreshing an Access Token] in the rfc.
//!
//! [Refreshing an Access Token]: https://tools.ietf.org/html/rfc6749#section-6
use chrono::Utc;

use crate::code_grant::accesstoken::{approval, required, AccessRequest, TokenResponse};
use crate::code_grant::error::{BoxError, ErrorCode, NisoError};
use crate::code_grant::{self, Endpoint, Issue};
use crate::primitives::grant::ClientData;
use crate::primitives::storage::{Context, Storage};

/// Issue a new access token for a refresh token.
///
/// By default the refresh token is rotated: it is consumed atomically and a new one is issued
/// along with the access token. When the server retains refresh tokens, only a new access token
/// is issued and the response carries no refresh token.
pub fn refresh<F>(
    endpoint: &dyn Endpoint, ctx: &Context, client: &ClientData, request: &mut AccessRequest, approve: F,
) -> Result<TokenResponse, NisoError>
where
    F: FnOnce(&mut AccessRequest) -> Result<bool, BoxError>,
{
    let token = required(&request.refresh_token, "refresh_token")?.to_string();
    let storage = code_grant::storage(endpoint);

    let data = storage
        .get_refresh_token_data(ctx, &token)
        .map_err(|err| code_grant::storage_error(err, ErrorCode::InvalidGrant, "invalid refresh token"))?;

    if data.client_id != client.client_id {
        return Err(NisoError::new(
            ErrorCode::InvalidGrant,
            "refresh token was issued to another client",
        ));
    }

    if data.is_expired_at(Utc::now()) {
        return Err(NisoError::new(ErrorCode::InvalidGrant, "refresh token expired"));
    }

    let requested = code_grant::requested_scope(request.scope.as_deref())?;
    let scope = code_grant::narrow_scope(requested.as_ref(), &data.scope)?;

    request.scope = Some(scope.to_string());
    if request.user_data.is_none() {
        request.user_data = data.user_data.clone();
    }

    approval(approve, request, ErrorCode::AccessDenied)?;

    let rotate = !endpoint.config().retain_refresh_token_after_refresh;
    if rotate {
        let consumed = storage
            .delete_refresh_token_data(ctx, &token)
            .map_err(code_grant::server_error)?;
        if !consumed {
            return Err(NisoError::new(
                ErrorCode::InvalidGrant,
                "refresh token was already used",
            ));
        }
    }

    let (access, refresh) = code_grant::issue(
        endpoint,
        ctx,
        Issue {
            client_id: &client.client_id,
            authorization_code: None,
            scope,
            redirect_uri: data.redirect_uri,
            user_data: request.user_data.clone(),
            refresh: rotate,
        },
    )?;

    Ok(TokenResponse::new(&access, refresh.as_ref(), requested.as_ref()))
}
