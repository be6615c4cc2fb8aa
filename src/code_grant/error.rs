//! Errors defined in [rfc6749].
//!
//! Every failure of the engine is classified into exactly one [`ErrorCode`] and carried by a
//! [`NisoError`]. The error optionally knows the redirect uri of the client and the state of the
//! request, so that it can be rendered either as a json body or as a redirect.
//!
//! [rfc6749]: https://tools.ietf.org/html/rfc6749#section-5.2
//! [`ErrorCode`]: enum.ErrorCode.html
//! [`NisoError`]: struct.NisoError.html
use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use serde::{Serialize, Serializer};
use url::Url;

/// Boxed error type accepted as the cause of a `NisoError`.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// All error codes defined for authorization and access token responses.
///
/// Details found in <https://tools.ietf.org/html/rfc6749#section-4.1.2.1> and
/// <https://tools.ietf.org/html/rfc6749#section-5.2>.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorCode {
    /// The request is missing a required parameter, includes an invalid parameter value, includes
    /// a parameter more than once, or is otherwise malformed.
    InvalidRequest,

    /// The client is not authorized to request an authorization code or use this grant type.
    UnauthorizedClient,

    /// The resource owner or authorization server denied the request.
    AccessDenied,

    /// The authorization server does not support obtaining an authorization code using this method.
    UnsupportedResponseType,

    /// The requested scope is invalid, unknown, malformed, or exceeds the scope granted by the
    /// resource owner.
    InvalidScope,

    /// The authorization server encountered an unexpected condition that prevented it from
    /// fulfilling the request.
    ServerError,

    /// The authorization server is currently unable to handle the request due to a temporary
    /// overloading or maintenance of the server.
    TemporarilyUnavailable,

    /// The authorization grant type is not supported by the authorization server.
    UnsupportedGrantType,

    /// The provided authorization grant (e.g., authorization code, resource owner credentials) or
    /// refresh token is invalid, expired, revoked, does not match the redirection URI used in the
    /// authorization request, or was issued to another client.
    InvalidGrant,

    /// Client authentication failed (e.g., unknown client, no client authentication included, or
    /// unsupported authentication method).
    InvalidClient,
}

impl ErrorCode {
    /// The code as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::UnauthorizedClient => "unauthorized_client",
            ErrorCode::AccessDenied => "access_denied",
            ErrorCode::UnsupportedResponseType => "unsupported_response_type",
            ErrorCode::InvalidScope => "invalid_scope",
            ErrorCode::ServerError => "server_error",
            ErrorCode::TemporarilyUnavailable => "temporarily_unavailable",
            ErrorCode::UnsupportedGrantType => "unsupported_grant_type",
            ErrorCode::InvalidGrant => "invalid_grant",
            ErrorCode::InvalidClient => "invalid_client",
        }
    }
}

impl AsRef<str> for ErrorCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A classified failure, ready to be rendered to the client.
///
/// The optional cause is only ever used for diagnostics. It is reachable through
/// `Error::source` and the `Display` implementation but never part of a rendered response, which
/// only contains the code, the sanctioned message, and the state.
#[derive(Debug)]
pub struct NisoError {
    code: ErrorCode,
    message: Cow<'static, str>,
    cause: Option<BoxError>,
    redirect_uri: Option<String>,
    state: Option<String>,
}

impl NisoError {
    /// Create an error with a description for the client.
    pub fn new<M: Into<Cow<'static, str>>>(code: ErrorCode, message: M) -> Self {
        NisoError {
            code,
            message: message.into(),
            cause: None,
            redirect_uri: None,
            state: None,
        }
    }

    /// Create an error that retains the original failure for logging.
    ///
    /// Only `message` is presented to the client.
    pub fn wrap<E, M>(code: ErrorCode, cause: E, message: M) -> Self
    where
        E: Into<BoxError>,
        M: Into<Cow<'static, str>>,
    {
        NisoError {
            cause: Some(cause.into()),
            ..NisoError::new(code, message)
        }
    }

    /// The formal kind of error.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The description presented to the client.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The redirect uri the error will be delivered to, if any.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// The state echoed back to the client, if any.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Deliver this error by redirecting to `redirect_uri`.
    pub fn set_redirect_uri<U: Into<String>>(&mut self, redirect_uri: U) {
        self.redirect_uri = Some(redirect_uri.into());
    }

    /// Echo `state` when this error is rendered.
    pub fn set_state<S: Into<String>>(&mut self, state: S) {
        self.state = Some(state.into());
    }

    /// Builder variant of `set_redirect_uri`.
    pub fn with_redirect_uri<U: Into<String>>(mut self, redirect_uri: U) -> Self {
        self.set_redirect_uri(redirect_uri);
        self
    }

    /// Builder variant of `set_state`.
    pub fn with_state<S: Into<String>>(mut self, state: S) -> Self {
        self.set_state(state);
        self
    }

    /// The key value pairs of an [Error Response], empty values omitted.
    ///
    /// [Error Response]: https://tools.ietf.org/html/rfc6749#section-4.2.2.1
    pub fn response_dict(&self) -> Vec<(&'static str, String)> {
        let pairs = vec![
            ("error", self.code.as_str()),
            ("error_description", self.message.as_ref()),
            ("state", self.state.as_deref().unwrap_or("")),
        ];

        pairs
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key, value.to_string()))
            .collect()
    }

    /// The location the user agent should be sent to, `Ok(None)` without a redirect uri.
    ///
    /// The error parameters are merged into the query of the redirect uri, replacing parameters
    /// of the same name, and any fragment is removed. A redirect uri that does not parse is an
    /// error in the client registration and is returned as such.
    pub fn redirect_url(&self) -> Result<Option<Url>, url::ParseError> {
        let redirect_uri = match &self.redirect_uri {
            None => return Ok(None),
            Some(uri) if uri.is_empty() => return Ok(None),
            Some(uri) => uri,
        };

        let mut url = Url::parse(redirect_uri)?;
        merge_query(&mut url, self.response_dict());
        url.set_fragment(None);
        Ok(Some(url))
    }
}

/// Set the parameters on the query of `url`, replacing existing ones of the same name.
pub(crate) fn merge_query<K, V>(url: &mut Url, parameters: Vec<(K, V)>)
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let retained = url
        .query_pairs()
        .filter(|(key, _)| !parameters.iter().any(|(name, _)| name.as_ref() == key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect::<Vec<_>>();

    if retained.is_empty() && parameters.is_empty() {
        url.set_query(None);
        return;
    }

    let mut query = url.query_pairs_mut();
    query.clear();
    for (key, value) in &retained {
        query.append_pair(key, value);
    }
    for (key, value) in &parameters {
        query.append_pair(key.as_ref(), value.as_ref());
    }
}

impl fmt::Display for NisoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}) {}", self.code, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl Error for NisoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_ref().map(|cause| &**cause as &(dyn Error + 'static))
    }
}
