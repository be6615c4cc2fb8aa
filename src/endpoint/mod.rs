//! Polymorphic OAuth2 endpoint entry points.
//!
//! The [`Server`] is the orchestrator of the engine. It holds an immutable [`ServerConfig`], a
//! [`Storage`] backend, and a [`TokenGenerator`], and exposes one entry point for each of the two
//! OAuth2 endpoints:
//!
//! * [`handle_authorize`] for the authorization endpoint, producing a redirect with a code or,
//!   for the implicit grant, a token.
//! * [`handle_access`] for the token endpoint, dispatching on the grant type.
//!
//! Both take typed requests and produce a [`Response`] or a classified [`NisoError`]. Translating
//! a concrete web request into the typed request, and the result back into a web response, is
//! the job of a transport adapter such as [`frontends::simple`].
//!
//! The application decides about approval through a callback. It receives the validated request
//! and may attach opaque `user_data` which is stored with the issued code or token.
//!
//! ```
//! # use niso::endpoint::{Server, ServerConfig, Response};
//! # use niso::code_grant::authorization::AuthorizationRequest;
//! # use niso::primitives::prelude::*;
//! let storage = MemoryStorage::new();
//! storage.register_client(ClientData::new("1234", "aabbccdd", "http://localhost/appauth"));
//! let server = Server::new(ServerConfig::default(), storage);
//!
//! let request = AuthorizationRequest {
//!     response_type: "code".into(),
//!     client_id: "1234".into(),
//!     state: "xyz".into(),
//!     ..AuthorizationRequest::default()
//! };
//!
//! let response = server
//!     .handle_authorize(&Context::background(), request, |_| Ok(true))
//!     .unwrap();
//! match response {
//!     Response::Redirect(redirect) => assert!(redirect.url().unwrap().as_str()
//!         .starts_with("http://localhost/appauth?code=")),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! [`Server`]: struct.Server.html
//! [`ServerConfig`]: config/struct.ServerConfig.html
//! [`Storage`]: ../primitives/storage/trait.Storage.html
//! [`TokenGenerator`]: ../primitives/generator/trait.TokenGenerator.html
//! [`handle_authorize`]: struct.Server.html#method.handle_authorize
//! [`handle_access`]: struct.Server.html#method.handle_access
//! [`Response`]: enum.Response.html
//! [`NisoError`]: ../code_grant/error/struct.NisoError.html
//! [`frontends::simple`]: ../frontends/simple/index.html
use url::form_urlencoded;
use url::Url;

use crate::code_grant::accesstoken::{self, AccessRequest, TokenResponse};
use crate::code_grant::authorization::{self, AuthorizationRequest};
use crate::code_grant::error::{merge_query, BoxError, NisoError};
use crate::code_grant::Endpoint;
use crate::primitives::generator::{RandomGenerator, TokenGenerator};
use crate::primitives::storage::{Context, Storage};

pub mod config;

pub use self::config::{ConfigError, ServerConfig};

#[cfg(test)]
mod tests;

/// The successful outcome of a request.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    /// A token response, delivered as a json body.
    Token(TokenResponse),

    /// Send the user agent back to the client.
    Redirect(Redirect),
}

/// A redirect back to the client carrying response parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Redirect {
    /// The validated redirect uri of the client.
    pub redirect_uri: String,

    /// Parameters for the client, for example the `code` and `state`.
    pub parameters: Vec<(String, String)>,

    /// Deliver the parameters in the fragment instead of the query, used by the implicit grant.
    pub fragment: bool,
}

impl Redirect {
    pub(crate) fn query(redirect_uri: String, parameters: Vec<(String, String)>) -> Self {
        Redirect {
            redirect_uri,
            parameters,
            fragment: false,
        }
    }

    pub(crate) fn fragment(redirect_uri: String, parameters: Vec<(String, String)>) -> Self {
        Redirect {
            redirect_uri,
            parameters,
            fragment: true,
        }
    }

    /// The value of a response parameter.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Assemble the location the user agent is sent to.
    ///
    /// A registered redirect uri which does not parse is a configuration error and is reported.
    pub fn url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.redirect_uri)?;
        if self.fragment {
            let fragment = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.parameters.iter())
                .finish();
            url.set_fragment(Some(&fragment));
        } else {
            merge_query(&mut url, self.parameters.clone());
            url.set_fragment(None);
        }
        Ok(url)
    }
}

/// The orchestrator of all grant flows.
///
/// A server is stateless beyond its configuration, generator, and storage handle. When the
/// storage is `Send + Sync` so is the server, and one instance can serve all requests of a
/// process concurrently.
pub struct Server<S> {
    config: ServerConfig,
    storage: S,
    generator: Box<dyn TokenGenerator + Send + Sync>,
}

impl<S: Storage> Server<S> {
    /// Create a server issuing random tokens.
    pub fn new(config: ServerConfig, storage: S) -> Self {
        Server {
            config,
            storage,
            generator: Box::new(RandomGenerator::default()),
        }
    }

    /// Replace the token generator.
    pub fn with_generator<G>(mut self, generator: G) -> Self
    where
        G: TokenGenerator + Send + Sync + 'static,
    {
        self.generator = Box::new(generator);
        self
    }

    /// The configuration of this server.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The storage backend of this server.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Handle a request to the authorization endpoint.
    ///
    /// `approve` is called once the request has been validated and decides whether the resource
    /// owner grants it. Denial or an error both lead to an `access_denied` redirect.
    pub fn handle_authorize<F>(
        &self, ctx: &Context, mut request: AuthorizationRequest, approve: F,
    ) -> Result<Response, NisoError>
    where
        F: FnOnce(&mut AuthorizationRequest) -> Result<bool, BoxError>,
    {
        let result = authorization::authorize(self, ctx, &mut request, approve);
        if let Err(err) = &result {
            log::debug!(
                "Rejected authorization request of client {:?}: {}",
                request.client_id,
                err
            );
        }
        result
    }

    /// Handle a request to the token endpoint.
    ///
    /// `approve` is called after all checks of the grant have passed, right before tokens are
    /// issued. For the password grant it is responsible for verifying the resource owner
    /// credentials, for extension grants it decides alone.
    pub fn handle_access<F>(
        &self, ctx: &Context, mut request: AccessRequest, approve: F,
    ) -> Result<Response, NisoError>
    where
        F: FnOnce(&mut AccessRequest) -> Result<bool, BoxError>,
    {
        let result = accesstoken::access_token(self, ctx, &mut request, approve);
        if let Err(err) = &result {
            log::debug!(
                "Rejected {:?} token request of client {:?}: {}",
                request.grant_type,
                request.client_id,
                err
            );
        }
        result
    }
}

impl<S: Storage> Endpoint for Server<S> {
    fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn storage(&self) -> &dyn Storage {
        &self.storage
    }

    fn generator(&self) -> &dyn TokenGenerator {
        &self.generator
    }
}
