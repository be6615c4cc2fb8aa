//! Grants defined outside of the rfc.
//!
//! An extension grant is identified by a `grant_type` the engine does not know. It must be
//! enabled in the configuration like any other grant. All of its parameters are passed through in
//! [`AccessRequest::extensions`] and the approval callback alone decides whether to issue a token.
//!
//! [`AccessRequest::extensions`]: ../accesstoken/struct.AccessRequest.html#structfield.extensions
use crate::code_grant::accesstoken::{approval, AccessRequest, TokenResponse};
use crate::code_grant::error::{BoxError, ErrorCode, NisoError};
use crate::code_grant::{self, Endpoint, Issue};
use crate::primitives::grant::ClientData;
use crate::primitives::storage::Context;

/// Issue an access token for an extension grant approved by the host.
pub fn extension<F>(
    endpoint: &dyn Endpoint, ctx: &Context, client: &ClientData, request: &mut AccessRequest, approve: F,
) -> Result<TokenResponse, NisoError>
where
    F: FnOnce(&mut AccessRequest) -> Result<bool, BoxError>,
{
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
