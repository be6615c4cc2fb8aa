//! The complete code flow through the string based adapter.
use chrono::{Duration, Utc};
use serde_json::Value;

use niso::endpoint::{Server, ServerConfig};
use niso::frontends::simple::{parse_access, parse_authorization, respond, Body, Status, WebResponse};
use niso::primitives::prelude::*;

const CLIENT_ID: &str = "1234";
const CLIENT_SECRET: &str = "aabbccdd";
const REDIRECT_URI: &str = "http://localhost/appauth";

fn server() -> Server<MemoryStorage> {
    let storage = MemoryStorage::new();
    storage.register_client(ClientData::new(CLIENT_ID, CLIENT_SECRET, REDIRECT_URI));
    Server::new(ServerConfig::default().refresh_expiration(3600), storage)
}

fn basic() -> String {
    format!("Basic {}", base64::encode(format!("{}:{}", CLIENT_ID, CLIENT_SECRET)))
}

fn json(response: &WebResponse) -> Value {
    match &response.body {
        Some(Body::Json(body)) => serde_json::from_str(body).expect("Expected valid json"),
        None => panic!("Expected a json body: {:?}", response),
    }
}

fn authorize(server: &Server<MemoryStorage>) -> String {
    let request = parse_authorization(
        "response_type=code&client_id=1234&redirect_uri=http%3A%2F%2Flocalhost%2Fappauth&state=xyz",
    )
    .unwrap();
    let response = respond(server.handle_authorize(&Context::background(), request, |_| Ok(true))).unwrap();

    assert_eq!(response.status, Status::Redirect);
    let location = response.location.expect("Expected a location");
    assert!(location.as_str().starts_with("http://localhost/appauth?code="));
    assert!(location.query_pairs().any(|(k, v)| k == "state" && v == "xyz"));

    location
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .expect("Expected a code")
}

fn token(server: &Server<MemoryStorage>, body: &str) -> WebResponse {
    let request = parse_access(body, Some(basic().as_str())).unwrap();
    respond(server.handle_access(&Context::background(), request, |_| Ok(true))).unwrap()
}

fn exchange_body(code: &str) -> String {
    format!(
        "grant_type=authorization_code&code={}&redirect_uri=http%3A%2F%2Flocalhost%2Fappauth",
        code
    )
}

#[test]
fn authorization_code_flow() {
    let server = server();
    let code = authorize(&server);

    let response = token(&server, &exchange_body(&code));
    assert_eq!(response.status, Status::Ok);
    let body = json(&response);
    assert!(body["access_token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    assert!(body["refresh_token"].is_string());

    // Replaying the code fails.
    let response = token(&server, &exchange_body(&code));
    assert_eq!(response.status, Status::BadRequest);
    let body = json(&response);
    assert_eq!(body["error"], "invalid_grant");
    assert!(body["error_description"].is_string());
}

#[test]
fn foreign_redirect_uri_mints_nothing() {
    let server = server();
    let code = authorize(&server);

    let body = format!(
        "grant_type=authorization_code&code={}&redirect_uri=http%3A%2F%2Fevil.example%2F",
        code
    );
    let response = token(&server, &body);
    assert_eq!(response.status, Status::BadRequest);
    let error = json(&response)["error"].as_str().map(str::to_string);
    assert!(
        error.as_deref() == Some("invalid_request") || error.as_deref() == Some("invalid_grant"),
        "Unexpected error {:?}",
        error
    );
    assert_eq!(server.storage().authorization_count(), 1);
}

#[test]
fn expired_refresh_token() {
    let server = server();
    let code = authorize(&server);
    let issued = json(&token(&server, &exchange_body(&code)));
    let refresh_token = issued["refresh_token"].as_str().unwrap().to_string();

    let ctx = Context::background();
    let mut data = server.storage().get_refresh_token_data(&ctx, &refresh_token).unwrap();
    data.created_at = Utc::now() - Duration::hours(2);
    server.storage().save_refresh_token_data(&ctx, &data).unwrap();

    let response = token(
        &server,
        &format!("grant_type=refresh_token&refresh_token={}", refresh_token),
    );
    assert_eq!(response.status, Status::BadRequest);
    assert_eq!(json(&response)["error"], "invalid_grant");
}

#[test]
fn refresh_token_flow() {
    let server = server();
    let code = authorize(&server);
    let issued = json(&token(&server, &exchange_body(&code)));
    let refresh_token = issued["refresh_token"].as_str().unwrap();

    let response = token(
        &server,
        &format!("grant_type=refresh_token&refresh_token={}", refresh_token),
    );
    assert_eq!(response.status, Status::Ok);
    let refreshed = json(&response);
    assert_ne!(refreshed["access_token"], issued["access_token"]);
    assert_ne!(refreshed["refresh_token"], issued["refresh_token"]);
}

#[test]
fn wrong_secret_is_unauthorized() {
    let server = server();
    let code = authorize(&server);

    let header = format!("Basic {}", base64::encode(format!("{}:wrong", CLIENT_ID)));
    let request = parse_access(&exchange_body(&code), Some(header.as_str())).unwrap();
    let response = respond(server.handle_access(&Context::background(), request, |_| Ok(true))).unwrap();

    assert_eq!(response.status, Status::Unauthorized);
    assert_eq!(response.status.as_u16(), 401);
    assert_eq!(json(&response)["error"], "invalid_client");
}

#[test]
fn denied_authorization_redirects_with_state() {
    let server = server();
    let request = parse_authorization("response_type=code&client_id=1234&state=a%20b").unwrap();
    let response = respond(server.handle_authorize(&Context::background(), request, |_| Ok(false))).unwrap();

    assert_eq!(response.status, Status::Redirect);
    let location = response.location.unwrap();
    assert!(location.query_pairs().any(|(k, v)| k == "error" && v == "access_denied"));
    assert!(location.query_pairs().any(|(k, v)| k == "state" && v == "a b"));
}

#[test]
fn configuration_from_json() {
    let config = ServerConfig::from_json(r#"{ "allowed_access_types": ["client_credentials"] }"#).unwrap();
    let storage = MemoryStorage::new();
    storage.register_client(ClientData::new(CLIENT_ID, CLIENT_SECRET, REDIRECT_URI));
    let server = Server::new(config, storage);

    let response = token(&server, "grant_type=client_credentials");
    assert_eq!(response.status, Status::Ok);
    assert!(json(&response).get("refresh_token").is_none());

    let response = token(&server, "grant_type=authorization_code&code=x");
    assert_eq!(json(&response)["error"], "unsupported_grant_type");
}
