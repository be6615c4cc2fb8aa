//! The client credentials grant.
//!
//! The client acts on its own behalf, so only confidential clients can use it. No refresh token
//! is issued, the client can always authenticate again.
use crate::code_grant::accesstoken::{approval, AccessRequest, TokenResponse};
use crate::code_grant::error::{BoxError, ErrorCode, NisoError};
use crate::code_grant::{self, Endpoint, Issue};
use crate::primitives::grant::ClientData;
use crate::primitives::storage::Context;

/// Issue an access token to an authenticated, confidential client.
pub fn client_credentials<F>(
    endpoint: &dyn Endpoint, ctx: &Context, client: &ClientData, request: &mut AccessRequest, approve: F,
) -> Result<TokenResponse, NisoError>
where
    F: FnOnce(&mut AccessRequest) -> Result<bool, BoxError>,
{
    if client.is_public() {
        return Err(NisoError::new(
            ErrorCode::UnauthorizedClient,
            "public clients may not use client_credentials",
        ));
    }

    let requested = code_grant::requested_scope(request.scope.as_deref())?;
    let scope = code_grant::client_scope(endpoint.config(), client, requested.as_ref())?;
    request.scope = Some(scope.to_string());

    approval(approve, request, ErrorCode::AccessDenied)?;

    let (access, _) = code_grant::issue(
        endpoint,
        ctx,
        Issue {
            client_id: &client.client_id,
            authorization_code: None,
            scope,
            redirect_uri: String::new(),
            user_data: request.user_data.clone(),
            refresh: false,
        },
    )?;

    Ok(TokenResponse::new(&access, None, requested.as_ref()))
}
