use super::defaults::*;
use super::*;

use crate::primitives::grant::GrantType;

const EXAMPLE_OWNER: &str = "alice";
const EXAMPLE_OWNER_PASSWORD: &str = "correct horse battery staple";

fn password_request(password: &str) -> AccessRequest {
    AccessRequest {
        username: Some(EXAMPLE_OWNER.into()),
        password: Some(password.into()),
        ..access_request("password")
    }
}

/// Accepts the example resource owner only.
fn verify(request: &mut AccessRequest) -> Result<bool, crate::code_grant::error::BoxError> {
    Ok(request.username.as_deref() == Some(EXAMPLE_OWNER)
        && request.password.as_deref() == Some(EXAMPLE_OWNER_PASSWORD))
}

fn password_server() -> Server<MemoryStorage> {
    server(ServerConfig::default().allow_access_type(GrantType::Password))
}

#[test]
fn owner_credentials_give_tokens() {
    let server = password_server();
    let token = assert_token(server.handle_access(
        &Context::background(),
        password_request(EXAMPLE_OWNER_PASSWORD),
        verify,
    ));

    assert_eq!(token.access_token, "access-1");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-2"));

    let access = server.storage().access_data("access-1").unwrap();
    assert_eq!(access.redirect_uri, EXAMPLE_REDIRECT_URI);
    assert_eq!(access.scope.to_string(), "default example");
}

#[test]
fn wrong_owner_credentials() {
    let server = password_server();
    assert_error(
        server.handle_access(&Context::background(), password_request("hunter2"), verify),
        ErrorCode::InvalidGrant,
    );
    assert_eq!(server.storage().access_data("access-1"), None);
}

#[test]
fn owner_credentials_are_required() {
    let server = password_server();
    let missing_password = AccessRequest {
        password: None,
        ..password_request("")
    };
    let missing_username = AccessRequest {
        username: Some(String::new()),
        ..password_request(EXAMPLE_OWNER_PASSWORD)
    };

    for request in vec![missing_password, missing_username] {
        let mut called = false;
        assert_error(
            server.handle_access(&Context::background(), request, |_| {
                called = true;
                Ok(true)
            }),
            ErrorCode::InvalidRequest,
        );
        assert!(!called);
    }
}

#[test]
fn credential_check_failure_is_opaque() {
    let server = password_server();
    let err = assert_error(
        server.handle_access(&Context::background(), password_request(EXAMPLE_OWNER_PASSWORD), |_| {
            Err("ldap: bind failed for cn=admin,dc=corp".into())
        }),
        ErrorCode::ServerError,
    );
    assert_eq!(err.message(), "internal server error");
}

#[test]
fn password_token_can_be_refreshed() {
    let server = password_server();
    let token = assert_token(server.handle_access(
        &Context::background(),
        password_request(EXAMPLE_OWNER_PASSWORD),
        verify,
    ));

    let request = AccessRequest {
        refresh_token: token.refresh_token,
        ..access_request("refresh_token")
    };
    let refreshed = assert_token(server.handle_access(&Context::background(), request, |_| Ok(true)));
    assert_eq!(refreshed.access_token, "access-3");
}
