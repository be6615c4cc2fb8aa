//! Transport adapters.
//!
//! Frontends are glue between the typed requests of the engine and a concrete transport. The
//! engine only requires that a frontend fills an [`AuthorizationRequest`] or an [`AccessRequest`]
//! and renders a [`Response`] or [`NisoError`] again.
//!
//! Only the transport independent [`simple`] adapter is provided. It works on raw query strings,
//! bodies, and header values, which makes it easy to wrap for any http server crate.
//!
//! [`AuthorizationRequest`]: ../code_grant/authorization/struct.AuthorizationRequest.html
//! [`AccessRequest`]: ../code_grant/accesstoken/struct.AccessRequest.html
//! [`Response`]: ../endpoint/enum.Response.html
//! [`NisoError`]: ../code_grant/error/struct.NisoError.html
//! [`simple`]: simple/index.html

pub mod simple;
