//! Parsing of urlencoded requests.
//!
//! Every parameter may appear at most once, a repeated parameter makes the whole request
//! `invalid_request`. Parameters without a value are treated as absent by the engine.
use std::collections::HashMap;

use crate::code_grant::accesstoken::AccessRequest;
use crate::code_grant::authorization::AuthorizationRequest;
use crate::code_grant::error::{ErrorCode, NisoError};

fn parameters(encoded: &str) -> Result<HashMap<String, String>, NisoError> {
    let encoded = encoded.trim_start_matches('?');
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(encoded)
        .map_err(|err| NisoError::wrap(ErrorCode::InvalidRequest, err, "malformed request parameters"))?;

    let mut parameters = HashMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        if parameters.contains_key(&key) {
            return Err(NisoError::new(
                ErrorCode::InvalidRequest,
                format!("parameter {} appears more than once", key),
            ));
        }
        parameters.insert(key, value);
    }

    Ok(parameters)
}

/// Parse the query of a request to the authorization endpoint.
///
/// A leading `?` is ignored.
pub fn parse_authorization(query: &str) -> Result<AuthorizationRequest, NisoError> {
    let mut parameters = parameters(query)?;

    Ok(AuthorizationRequest {
        response_type: parameters.remove("response_type").unwrap_or_default(),
        client_id: parameters.remove("client_id").unwrap_or_default(),
        redirect_uri: parameters.remove("redirect_uri"),
        scope: parameters.remove("scope"),
        state: parameters.remove("state").unwrap_or_default(),
        user_data: None,
    })
}

/// Decode the client credentials of an HTTP Basic `Authorization` header.
fn basic_credentials(header: &str) -> Result<(String, String), NisoError> {
    let invalid = || NisoError::new(ErrorCode::InvalidClient, "malformed authorization header");

    if !header.starts_with("Basic ") {
        return Err(invalid());
    }

    let combined = base64::decode(header[6..].trim()).map_err(|_| invalid())?;
    let combined = String::from_utf8(combined).map_err(|_| invalid())?;

    let mut split = combined.splitn(2, ':');
    match (split.next(), split.next()) {
        (Some(client_id), Some(secret)) if !client_id.is_empty() => {
            Ok((client_id.to_string(), secret.to_string()))
        }
        _ => Err(invalid()),
    }
}

/// Parse the body and `Authorization` header of a request to the token endpoint.
///
/// Client credentials are taken from an HTTP Basic header if one is present. Otherwise the body
/// may carry `client_id` and, for confidential clients, `client_secret`. Using both methods in
/// one request is `invalid_request`. Parameters not used by the engine are collected into
/// `extensions`.
pub fn parse_access(body: &str, authorization: Option<&str>) -> Result<AccessRequest, NisoError> {
    let mut parameters = parameters(body)?;
    let body_id = parameters.remove("client_id");
    let body_secret = parameters.remove("client_secret");

    let (client_id, client_secret) = match authorization {
        Some(header) => {
            let (client_id, secret) = basic_credentials(header)?;
            if body_secret.is_some() || body_id.map_or(false, |id| id != client_id) {
                return Err(NisoError::new(
                    ErrorCode::InvalidRequest,
                    "client credentials in both the header and the body",
                ));
            }
            (client_id, Some(secret))
        }
        None => (body_id.unwrap_or_default(), body_secret),
    };

    let mut request = AccessRequest {
        grant_type: parameters.remove("grant_type").unwrap_or_default(),
        client_id,
        client_secret,
        code: parameters.remove("code"),
        redirect_uri: parameters.remove("redirect_uri"),
        refresh_token: parameters.remove("refresh_token"),
        username: parameters.remove("username"),
        password: parameters.remove("password"),
        scope: parameters.remove("scope"),
        ..AccessRequest::default()
    };

    request.extensions = parameters;
    Ok(request)
}
