//! Simple, owning response type.
use std::collections::BTreeMap;

use url::Url;

use crate::code_grant::error::{ErrorCode, NisoError};
use crate::endpoint::Response;

/// A rendered response, ready to be written by an http server.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WebResponse {
    /// HTTP status code.
    pub status: Status,

    /// A location header, for example for redirects.
    pub location: Option<Url>,

    /// Indicates how the client should have authenticated.
    ///
    /// Only set with `Unauthorized` status.
    pub www_authenticate: Option<String>,

    /// Encoded body of the response.
    pub body: Option<Body>,
}

/// The http status codes a response can have.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Status {
    /// Http status code 200.
    Ok,

    /// Http status code 302.
    Redirect,

    /// Http status code 400.
    BadRequest,

    /// Http status code 401.
    Unauthorized,

    /// Http status code 500.
    InternalServerError,

    /// Http status code 503.
    ServiceUnavailable,
}

/// Models the necessary body contents.
///
/// Real HTTP protocols should set a content type header for each of the body variants, and
/// `Cache-Control: no-store` on every response carrying tokens.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// A json encoded body, `application/json`.
    Json(String),
}

/// A result that could not be rendered.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    /// The redirect uri of the client does not parse, the client registration is broken.
    #[error("invalid redirect uri: {0}")]
    Redirect(#[from] url::ParseError),

    /// The body could not be encoded.
    #[error("failed to encode response body: {0}")]
    Json(#[from] serde_json::Error),
}

impl Status {
    /// The numeric status code.
    pub fn as_u16(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Redirect => 302,
            Status::BadRequest => 400,
            Status::Unauthorized => 401,
            Status::InternalServerError => 500,
            Status::ServiceUnavailable => 503,
        }
    }

    fn of_error(code: ErrorCode) -> Self {
        match code {
            ErrorCode::InvalidClient => Status::Unauthorized,
            ErrorCode::ServerError => Status::InternalServerError,
            ErrorCode::TemporarilyUnavailable => Status::ServiceUnavailable,
            _ => Status::BadRequest,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Ok
    }
}

impl WebResponse {
    fn redirect(url: Url) -> Self {
        WebResponse {
            status: Status::Redirect,
            location: Some(url),
            ..WebResponse::default()
        }
    }

    fn json(status: Status, body: String) -> Self {
        WebResponse {
            status,
            body: Some(Body::Json(body)),
            ..WebResponse::default()
        }
    }

    fn error(error: &NisoError) -> Result<Self, ResponseError> {
        if let Some(url) = error.redirect_url()? {
            return Ok(WebResponse::redirect(url));
        }

        let dict = error.response_dict().into_iter().collect::<BTreeMap<_, _>>();
        let mut response = WebResponse::json(Status::of_error(error.code()), serde_json::to_string(&dict)?);
        if response.status == Status::Unauthorized {
            response.www_authenticate = Some("Basic".to_string());
        }

        Ok(response)
    }
}

/// Render the outcome of a request.
///
/// Tokens become a json body, redirects and redirectable errors a `302`. Any other error is a
/// json body with the status its code demands.
pub fn respond(result: Result<Response, NisoError>) -> Result<WebResponse, ResponseError> {
    match result {
        Ok(Response::Token(token)) => Ok(WebResponse::json(Status::Ok, serde_json::to_string(&token)?)),
        Ok(Response::Redirect(redirect)) => Ok(WebResponse::redirect(redirect.url()?)),
        Err(error) => WebResponse::error(&error),
    }
}
