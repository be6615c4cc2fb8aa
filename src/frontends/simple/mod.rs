//! A baseline transport adapter on plain strings.
//!
//! Parses `application/x-www-form-urlencoded` query strings and bodies into the typed requests
//! of the engine and renders results into an owning [`WebResponse`]. This is useful for testing
//! as well as for hosting the endpoints behind any http server:
//!
//! ```
//! # use niso::endpoint::{Server, ServerConfig};
//! # use niso::frontends::simple::{parse_authorization, respond, Status};
//! # use niso::primitives::prelude::*;
//! let storage = MemoryStorage::new();
//! storage.register_client(ClientData::new("1234", "aabbccdd", "http://localhost/appauth"));
//! let server = Server::new(ServerConfig::default(), storage);
//!
//! let request = parse_authorization("response_type=code&client_id=1234&state=xyz").unwrap();
//! let result = server.handle_authorize(&Context::background(), request, |_| Ok(true));
//! let response = respond(result).unwrap();
//! assert_eq!(response.status, Status::Redirect);
//! ```
//!
//! [`WebResponse`]: response/struct.WebResponse.html
pub mod request;

pub mod response;

pub use self::request::{parse_access, parse_authorization};
pub use self::response::{respond, Body, ResponseError, Status, WebResponse};
