//! The resource owner password credentials grant.
//!
//! The engine does not know about resource owners. It only checks that both credentials are
//! present, verifying them is the job of the approval callback. A callback returning `false`
//! rejects the credentials with `invalid_grant`.
use crate::code_grant::accesstoken::{approval, required, AccessRequest, TokenResponse};
use crate::code_grant::error::{BoxError, ErrorCode, NisoError};
use crate::code_grant::{self, Endpoint, Issue};
use crate::primitives::grant::ClientData;
use crate::primitives::storage::Context;

/// Issue tokens for resource owner credentials.
pub fn password<F>(
    endpoint: &dyn Endpoint, ctx: &Context, client: &ClientData, request: &mut AccessRequest, approve: F,
) -> Result<TokenResponse, NisoError>
where
    F: FnOnce(&mut AccessRequest) -> Result<bool, BoxError>,
{
    required(&request.username, "username")?;
    required(&request.password, "password")?;

    let requested = code_grant::requested_scope(request.scope.as_deref())?;
    let scope = code_grant::client_scope(endpoint.config(), client, requested.as_ref())?;
    request.scope = Some(scope.to_string());

    approval(approve, request, ErrorCode::InvalidGrant)?;

    let (access, refresh) = code_grant::issue(
        endpoint,
        ctx,
        Issue {
            client_id: &client.client_id,
            authorization_code: None,
            scope,
            redirect_uri: client.redirect_uri.clone(),
            user_data: request.user_data.clone(),
            refresh: endpoint.config().issues_refresh_tokens(),
        },
    )?;

    Ok(TokenResponse::new(&access, refresh.as_ref(), requested.as_ref()))
}
