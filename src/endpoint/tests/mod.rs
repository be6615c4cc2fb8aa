use crate::code_grant::accesstoken::{AccessRequest, TokenResponse};
use crate::code_grant::authorization::AuthorizationRequest;
use crate::code_grant::error::{ErrorCode, NisoError};
use crate::endpoint::*;
use crate::primitives::generator::{TokenGenerator, TokenKind};
use crate::primitives::grant::{AccessData, AuthorizationData, ClientData, RefreshTokenData};
use crate::primitives::memory::MemoryStorage;
use crate::primitives::storage::{Context, Storage, StorageError};

use std::sync::atomic::{AtomicUsize, Ordering};

/// Predictable tokens, `code-1`, `access-2` and so on.
#[derive(Default)]
struct TestGenerator(AtomicUsize);

impl TokenGenerator for TestGenerator {
    fn generate(&self, kind: TokenKind) -> Result<String, ()> {
        let prefix = match kind {
            TokenKind::AuthorizationCode => "code",
            TokenKind::AccessToken => "access",
            TokenKind::RefreshToken => "refresh",
        };
        let count = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{}-{}", prefix, count))
    }
}

struct BrokenGenerator;

impl TokenGenerator for BrokenGenerator {
    fn generate(&self, _: TokenKind) -> Result<String, ()> {
        Err(())
    }
}

/// Which operations of a `FaultyStorage` misbehave.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Fault {
    /// Every lookup fails with a backend error.
    Lookup,
    /// Every save fails with a backend error.
    Save,
    /// Only saving a refresh token fails.
    SaveRefresh,
    /// Deletes report that another request consumed the record first.
    LostRace,
}

/// A memory storage with injected failures.
struct FaultyStorage {
    inner: MemoryStorage,
    fault: Fault,
}

const BACKEND_FAILURE: &str = "pq: could not connect to server at 10.1.2.3:5432";

impl FaultyStorage {
    fn fail(&self, fault: Fault) -> Result<(), StorageError> {
        if self.fault == fault {
            Err(StorageError::backend(BACKEND_FAILURE))
        } else {
            Ok(())
        }
    }
}

impl Storage for FaultyStorage {
    fn get_client_data(&self, ctx: &Context, client_id: &str) -> Result<ClientData, StorageError> {
        self.fail(Fault::Lookup)?;
        self.inner.get_client_data(ctx, client_id)
    }

    fn save_authorize_data(&self, ctx: &Context, data: &AuthorizationData) -> Result<(), StorageError> {
        self.fail(Fault::Save)?;
        self.inner.save_authorize_data(ctx, data)
    }

    fn get_authorize_data(&self, ctx: &Context, code: &str) -> Result<AuthorizationData, StorageError> {
        self.fail(Fault::Lookup)?;
        self.inner.get_authorize_data(ctx, code)
    }

    fn delete_authorize_data(&self, ctx: &Context, code: &str) -> Result<bool, StorageError> {
        if self.fault == Fault::LostRace {
            return Ok(false);
        }
        self.inner.delete_authorize_data(ctx, code)
    }

    fn save_access_data(&self, ctx: &Context, data: &AccessData) -> Result<(), StorageError> {
        self.fail(Fault::Save)?;
        self.inner.save_access_data(ctx, data)
    }

    fn get_refresh_token_data(&self, ctx: &Context, token: &str) -> Result<RefreshTokenData, StorageError> {
        self.fail(Fault::Lookup)?;
        self.inner.get_refresh_token_data(ctx, token)
    }

    fn save_refresh_token_data(&self, ctx: &Context, data: &RefreshTokenData) -> Result<(), StorageError> {
        self.fail(Fault::Save)?;
        self.fail(Fault::SaveRefresh)?;
        self.inner.save_refresh_token_data(ctx, data)
    }

    fn delete_refresh_token_data(&self, ctx: &Context, token: &str) -> Result<bool, StorageError> {
        if self.fault == Fault::LostRace {
            return Ok(false);
        }
        self.inner.delete_refresh_token_data(ctx, token)
    }
}

pub mod defaults {
    pub const EXAMPLE_CLIENT_ID: &str = "ClientId";
    pub const EXAMPLE_PUBLIC_CLIENT_ID: &str = "PublicClientId";
    pub const EXAMPLE_OTHER_CLIENT_ID: &str = "OtherClientId";
    pub const EXAMPLE_PASSPHRASE: &str = "VGhpcyBpcyBhIHZlcnkgc2VjdXJlIHBhc3NwaHJhc2UK";
    pub const EXAMPLE_REDIRECT_URI: &str = "https://client.example/endpoint";
    pub const EXAMPLE_SCOPE: &str = "example default";
    pub const EXAMPLE_STATE: &str = "af0ifjsldkj";
}

use self::defaults::*;

fn clients() -> MemoryStorage {
    let scope = EXAMPLE_SCOPE.parse().unwrap();
    vec![
        ClientData::new(EXAMPLE_CLIENT_ID, EXAMPLE_PASSPHRASE, EXAMPLE_REDIRECT_URI).with_scope(scope),
        ClientData::public(EXAMPLE_PUBLIC_CLIENT_ID, EXAMPLE_REDIRECT_URI),
        ClientData::new(EXAMPLE_OTHER_CLIENT_ID, EXAMPLE_PASSPHRASE, "https://other.example/cb"),
    ]
    .into_iter()
    .collect()
}

/// A server with the example clients registered and predictable tokens.
fn server(config: ServerConfig) -> Server<MemoryStorage> {
    Server::new(config, clients()).with_generator(TestGenerator::default())
}

fn faulty_server(config: ServerConfig, fault: Fault) -> Server<FaultyStorage> {
    let storage = FaultyStorage {
        inner: clients(),
        fault,
    };
    Server::new(config, storage).with_generator(TestGenerator::default())
}

fn authorization_request() -> AuthorizationRequest {
    AuthorizationRequest {
        response_type: "code".into(),
        client_id: EXAMPLE_CLIENT_ID.into(),
        redirect_uri: Some(EXAMPLE_REDIRECT_URI.into()),
        scope: None,
        state: EXAMPLE_STATE.into(),
        user_data: None,
    }
}

fn access_request(grant_type: &str) -> AccessRequest {
    AccessRequest {
        grant_type: grant_type.into(),
        client_id: EXAMPLE_CLIENT_ID.into(),
        client_secret: Some(EXAMPLE_PASSPHRASE.into()),
        ..AccessRequest::default()
    }
}

/// Run an approved authorization request and extract the code.
fn issue_code<S: Storage>(server: &Server<S>) -> String {
    let result = server.handle_authorize(&Context::background(), authorization_request(), |_| Ok(true));
    let redirect = assert_redirect(result);
    redirect.parameter("code").expect("Expected a code").to_string()
}

fn code_request(code: &str) -> AccessRequest {
    AccessRequest {
        code: Some(code.into()),
        redirect_uri: Some(EXAMPLE_REDIRECT_URI.into()),
        ..access_request("authorization_code")
    }
}

fn assert_redirect(result: Result<Response, NisoError>) -> Redirect {
    match result {
        Ok(Response::Redirect(redirect)) => redirect,
        other => panic!("Expected a redirect: {:?}", other),
    }
}

fn assert_token(result: Result<Response, NisoError>) -> TokenResponse {
    match result {
        Ok(Response::Token(token)) => token,
        other => panic!("Expected a token: {:?}", other),
    }
}

fn assert_error(result: Result<Response, NisoError>, code: ErrorCode) -> NisoError {
    match result {
        Err(err) => {
            assert_eq!(err.code(), code, "Unexpected error: {}", err);
            err
        }
        other => panic!("Expected {}: {:?}", code, other),
    }
}

/// Check that the error reveals nothing of the backend failure.
fn assert_opaque(err: &NisoError) {
    assert_eq!(err.code(), ErrorCode::ServerError);
    assert_eq!(err.message(), "internal server error");
    assert!(err
        .response_dict()
        .iter()
        .all(|(_, value)| !value.contains("10.1.2.3")));
}

#[test]
fn server_is_send_sync() {
    fn uses<T: Send + Sync + 'static>(_: &T) {}
    uses(&server(ServerConfig::default()));
}

mod password;
