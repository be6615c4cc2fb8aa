//! Configuration of a `Server`.
//!
//! The configuration is an immutable value, constructed once and then moved into the server. It
//! can be deserialized, every missing field takes its default:
//!
//! ```
//! # use niso::endpoint::ServerConfig;
//! let config = ServerConfig::from_json(r#"{
//!     "allowed_authorize_types": ["code", "token"],
//!     "access_expiration": 600
//! }"#).unwrap();
//! assert_eq!(config.authorization_expiration, 250);
//! ```
use std::collections::HashSet;

use serde_derive::{Deserialize, Serialize};

use crate::primitives::grant::{GrantType, ResponseType};
use crate::primitives::scope::Scope;

/// The recognized server options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The `response_type` values accepted at the authorization endpoint.
    pub allowed_authorize_types: HashSet<ResponseType>,

    /// The `grant_type` values accepted at the token endpoint.
    ///
    /// Refresh tokens are only issued while `refresh_token` is allowed.
    pub allowed_access_types: HashSet<GrantType>,

    /// Lifetime of authorization codes, in seconds.
    pub authorization_expiration: i64,

    /// Lifetime of access tokens, in seconds.
    pub access_expiration: i64,

    /// Lifetime of refresh tokens, in seconds. `0` issues refresh tokens that never expire.
    pub refresh_expiration: i64,

    /// Keep a refresh token valid after it was used instead of rotating it.
    pub retain_refresh_token_after_refresh: bool,

    /// The scope tokens the server knows about. `None` accepts any requested scope.
    pub allowed_scopes: Option<Scope>,
}

/// A configuration that could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration was not valid json for this structure.
    #[error("malformed server configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A lifetime outside of its allowed range.
    #[error("invalid {field}: {value} seconds")]
    InvalidExpiration {
        /// The offending field.
        field: &'static str,
        /// The configured value.
        value: i64,
    },
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            allowed_authorize_types: vec![ResponseType::Code].into_iter().collect(),
            allowed_access_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken]
                .into_iter()
                .collect(),
            authorization_expiration: 250,
            access_expiration: 3600,
            refresh_expiration: 0,
            retain_refresh_token_after_refresh: false,
            allowed_scopes: None,
        }
    }
}

impl ServerConfig {
    /// Parse and validate a json encoded configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Upper bound of every configured lifetime, ten years in seconds.
    pub const MAX_EXPIRATION: i64 = 10 * 365 * 24 * 60 * 60;

    /// Check the lifetimes.
    ///
    /// Codes and access tokens need a positive lifetime, refresh tokens a non-negative one. None
    /// may exceed `MAX_EXPIRATION`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("authorization_expiration", self.authorization_expiration),
            ("access_expiration", self.access_expiration),
        ];

        for &(field, value) in positive.iter() {
            if value <= 0 || value > Self::MAX_EXPIRATION {
                return Err(ConfigError::InvalidExpiration { field, value });
            }
        }

        if self.refresh_expiration < 0 || self.refresh_expiration > Self::MAX_EXPIRATION {
            return Err(ConfigError::InvalidExpiration {
                field: "refresh_expiration",
                value: self.refresh_expiration,
            });
        }

        Ok(())
    }

    /// Accept an additional `response_type`.
    pub fn allow_authorize_type(mut self, response_type: ResponseType) -> Self {
        self.allowed_authorize_types.insert(response_type);
        self
    }

    /// Accept an additional `grant_type`.
    pub fn allow_access_type<G: Into<GrantType>>(mut self, grant_type: G) -> Self {
        self.allowed_access_types.insert(grant_type.into());
        self
    }

    /// Set the lifetime of authorization codes, in seconds.
    pub fn authorization_expiration(mut self, seconds: i64) -> Self {
        self.authorization_expiration = seconds;
        self
    }

    /// Set the lifetime of access tokens, in seconds.
    pub fn access_expiration(mut self, seconds: i64) -> Self {
        self.access_expiration = seconds;
        self
    }

    /// Set the lifetime of refresh tokens, in seconds.
    pub fn refresh_expiration(mut self, seconds: i64) -> Self {
        self.refresh_expiration = seconds;
        self
    }

    /// Keep refresh tokens valid after use.
    pub fn retain_refresh_token_after_refresh(mut self, retain: bool) -> Self {
        self.retain_refresh_token_after_refresh = retain;
        self
    }

    /// Restrict the scope tokens the server accepts.
    pub fn allowed_scopes(mut self, scope: Scope) -> Self {
        self.allowed_scopes = Some(scope);
        self
    }

    /// Whether `response_type` is accepted.
    pub fn allows_authorize_type(&self, response_type: ResponseType) -> bool {
        self.allowed_authorize_types.contains(&response_type)
    }

    /// Whether `grant_type` is accepted.
    pub fn allows_access_type(&self, grant_type: &GrantType) -> bool {
        self.allowed_access_types.contains(grant_type)
    }

    /// Whether refresh tokens are issued at all.
    pub fn issues_refresh_tokens(&self) -> bool {
        self.allows_access_type(&GrantType::RefreshToken)
    }
}
