//! The records exchanged with a storage backend.
//!
//! All of these are owning, serializable structs. They can be stored in a database without
//! worrying about lifetimes or shared across thread boundaries. The `user_data` attached to each
//! record is opaque to the engine, it is filled by the host's approval callbacks and carried along
//! from authorization code to access token to refresh token.
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use super::scope::Scope;
use super::Time;

/// The method requested at the authorization endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Request an authorization code, to be exchanged at the token endpoint.
    Code,

    /// Request an access token directly, the implicit grant.
    Token,
}

/// Grant types accepted at the token endpoint.
///
/// Any grant type that is not defined by the rfc is an extension grant, identified by its
/// absolute URI or registered name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GrantType {
    /// `authorization_code`
    AuthorizationCode,

    /// `implicit`, only ever requested through `response_type=token`.
    Implicit,

    /// `password`, the resource owner password credentials grant.
    Password,

    /// `client_credentials`
    ClientCredentials,

    /// `refresh_token`
    RefreshToken,

    /// A grant defined outside of the rfc.
    Extension(String),
}

impl ResponseType {
    /// The parameter value of this response type.
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Code => "code",
            ResponseType::Token => "token",
        }
    }

    /// The grant a client must be permitted to request this response type.
    pub fn grant_type(self) -> GrantType {
        match self {
            ResponseType::Code => GrantType::AuthorizationCode,
            ResponseType::Token => GrantType::Implicit,
        }
    }
}

impl FromStr for ResponseType {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, ()> {
        match string {
            "code" => Ok(ResponseType::Code),
            "token" => Ok(ResponseType::Token),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GrantType {
    /// The parameter value of this grant type.
    pub fn as_str(&self) -> &str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::Implicit => "implicit",
            GrantType::Password => "password",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
            GrantType::Extension(name) => name,
        }
    }
}

impl<'a> From<Cow<'a, str>> for GrantType {
    fn from(string: Cow<'a, str>) -> Self {
        match string.as_ref() {
            "authorization_code" => GrantType::AuthorizationCode,
            "implicit" => GrantType::Implicit,
            "password" => GrantType::Password,
            "client_credentials" => GrantType::ClientCredentials,
            "refresh_token" => GrantType::RefreshToken,
            _ => GrantType::Extension(string.into_owned()),
        }
    }
}

impl From<String> for GrantType {
    fn from(string: String) -> Self {
        GrantType::from(Cow::Owned(string))
    }
}

impl From<&'_ str> for GrantType {
    fn from(string: &str) -> Self {
        GrantType::from(Cow::Borrowed(string))
    }
}

impl From<GrantType> for String {
    fn from(grant: GrantType) -> String {
        match grant {
            GrantType::Extension(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered client, provisioned outside of the engine.
///
/// There are two types of clients, public and confidential. A client registered without a secret
/// is public: it identifies itself by id alone and is never allowed to use grants that rely on
/// the client's own identity, such as `client_credentials`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientData {
    /// The identifier of this client.
    pub client_id: String,

    /// The shared secret, empty for public clients.
    #[serde(default)]
    pub client_secret: String,

    /// The registered redirect uri, matched verbatim.
    pub redirect_uri: String,

    /// The scope the client gets if none was requested, and the upper bound of what it may
    /// request. `None` places no restriction on the client.
    #[serde(default)]
    pub scope: Option<Scope>,

    /// The grants this client may use. Empty permits every grant allowed by the server.
    #[serde(default)]
    pub grant_types: Vec<GrantType>,

    /// Data attached by the application.
    #[serde(default)]
    pub user_data: Option<Value>,
}

/// An issued authorization code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationData {
    /// The code handed to the client.
    pub code: String,

    /// The client the code was issued to.
    pub client_id: String,

    /// Issuance time of the code.
    pub created_at: Time,

    /// Lifetime of the code in seconds.
    pub expires_in: i64,

    /// The redirect uri the code was delivered to.
    pub redirect_uri: String,

    /// The state of the originating request.
    pub state: String,

    /// The scope granted by the resource owner.
    pub scope: Scope,

    /// Data attached by the application when approving.
    pub user_data: Option<Value>,
}

/// An issued access token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessData {
    /// The bearer token.
    pub access_token: String,

    /// The client the token was issued to.
    pub client_id: String,

    /// The authorization code this token was exchanged for, if any.
    pub authorization_code: Option<String>,

    /// Issuance time of the token.
    pub created_at: Time,

    /// Lifetime of the token in seconds.
    pub expires_in: i64,

    /// The scope of the token.
    pub scope: Scope,

    /// The redirect uri associated with the grant, empty if the grant had none.
    pub redirect_uri: String,

    /// Data attached by the application.
    pub user_data: Option<Value>,
}

/// An issued refresh token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenData {
    /// The refresh token.
    pub refresh_token: String,

    /// The client the token was issued to.
    pub client_id: String,

    /// The access token issued together with this refresh token.
    pub access_token: String,

    /// Issuance time of the token.
    pub created_at: Time,

    /// Lifetime of the token in seconds, `0` for a token that never expires.
    pub expires_in: i64,

    /// The scope that refreshed access tokens may at most receive.
    pub scope: Scope,

    /// The redirect uri associated with the grant, empty if the grant had none.
    pub redirect_uri: String,

    /// Data attached by the application.
    pub user_data: Option<Value>,
}

impl ClientData {
    /// Create a client with a secret and a registered redirect uri.
    ///
    /// An empty secret creates a public client.
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        ClientData {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scope: None,
            grant_types: Vec::new(),
            user_data: None,
        }
    }

    /// Create a client without a secret.
    pub fn public(client_id: &str, redirect_uri: &str) -> Self {
        ClientData::new(client_id, "", redirect_uri)
    }

    /// Set the default and maximum scope of the client.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Restrict the grants the client may use.
    pub fn with_grant_types<I: IntoIterator<Item = GrantType>>(mut self, grants: I) -> Self {
        self.grant_types = grants.into_iter().collect();
        self
    }

    /// Whether the client was registered without a secret.
    pub fn is_public(&self) -> bool {
        self.client_secret.is_empty()
    }

    /// Whether the client was registered for this grant.
    pub fn permits(&self, grant: &GrantType) -> bool {
        self.grant_types.is_empty() || self.grant_types.contains(grant)
    }
}

/// The end of a lifetime, `None` when it lies outside the representable range.
///
/// Lifetimes come from stored records as well as the configuration, so arbitrary values must not
/// panic.
fn lifetime_end(created_at: Time, expires_in: i64) -> Option<Time> {
    Duration::try_seconds(expires_in).and_then(|lifetime| created_at.checked_add_signed(lifetime))
}

fn expired(created_at: Time, expires_in: i64, now: Time) -> bool {
    match lifetime_end(created_at, expires_in) {
        Some(until) => until < now,
        // Out of range in either direction.
        None => expires_in < 0,
    }
}

impl AuthorizationData {
    /// The point in time after which the code is no longer valid.
    ///
    /// `None` if the lifetime reaches beyond the range of representable time.
    pub fn expire_at(&self) -> Option<Time> {
        lifetime_end(self.created_at, self.expires_in)
    }

    /// Whether the code is expired at `now`.
    pub fn is_expired_at(&self, now: Time) -> bool {
        expired(self.created_at, self.expires_in, now)
    }
}

impl AccessData {
    /// The point in time after which the token is no longer valid.
    ///
    /// `None` if the lifetime reaches beyond the range of representable time.
    pub fn expire_at(&self) -> Option<Time> {
        lifetime_end(self.created_at, self.expires_in)
    }

    /// Whether the token is expired at `now`.
    pub fn is_expired_at(&self, now: Time) -> bool {
        expired(self.created_at, self.expires_in, now)
    }
}

impl RefreshTokenData {
    /// The point in time after which the token is no longer valid, `None` if it never expires.
    pub fn expire_at(&self) -> Option<Time> {
        match self.expires_in {
            0 => None,
            secs => lifetime_end(self.created_at, secs),
        }
    }

    /// Whether the token is expired at `now`.
    pub fn is_expired_at(&self, now: Time) -> bool {
        match self.expires_in {
            0 => false,
            secs => expired(self.created_at, secs, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn refresh(expires_in: i64, age: i64) -> RefreshTokenData {
        RefreshTokenData {
            refresh_token: "refresh".into(),
            client_id: "client".into(),
            access_token: "access".into(),
            created_at: Utc::now() - Duration::seconds(age),
            expires_in,
            scope: Scope::empty(),
            redirect_uri: String::new(),
            user_data: None,
        }
    }

    #[test]
    fn refresh_expiry() {
        let now = Utc::now();
        assert!(!refresh(0, 1_000_000).is_expired_at(now));
        assert!(!refresh(3600, 60).is_expired_at(now));
        assert!(refresh(60, 3600).is_expired_at(now));
    }

    #[test]
    fn unrepresentable_lifetimes() {
        let now = Utc::now();
        let distant = refresh(i64::MAX, 0);
        assert_eq!(distant.expire_at(), None);
        assert!(!distant.is_expired_at(now));
        assert!(!refresh(i64::MAX / 2, 0).is_expired_at(now));
        assert!(refresh(i64::MIN, 0).is_expired_at(now));

        let code = AuthorizationData {
            code: "code".into(),
            client_id: "client".into(),
            created_at: now,
            expires_in: i64::MAX,
            redirect_uri: String::new(),
            state: String::new(),
            scope: Scope::empty(),
            user_data: None,
        };
        assert!(!code.is_expired_at(now));
        let code = AuthorizationData {
            expires_in: -i64::MAX,
            ..code
        };
        assert!(code.is_expired_at(now));
    }

    #[test]
    fn grant_type_names() {
        assert_eq!(GrantType::from("password"), GrantType::Password);
        assert_eq!(
            GrantType::from("urn:ietf:params:oauth:grant-type:saml2-bearer"),
            GrantType::Extension("urn:ietf:params:oauth:grant-type:saml2-bearer".into())
        );
        assert_eq!(String::from(GrantType::RefreshToken), "refresh_token");

        let parsed: Vec<GrantType> =
            serde_json::from_str(r#"["client_credentials", "custom"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![GrantType::ClientCredentials, GrantType::Extension("custom".into())]
        );
    }

    #[test]
    fn client_permissions() {
        let client = ClientData::new("c", "s", "https://client.example/cb");
        assert!(!client.is_public());
        assert!(client.permits(&GrantType::Password));

        let client = ClientData::public("c", "https://client.example/cb")
            .with_grant_types(vec![GrantType::AuthorizationCode]);
        assert!(client.is_public());
        assert!(client.permits(&GrantType::AuthorizationCode));
        assert!(!client.permits(&GrantType::Implicit));
    }
}
