//! # niso
//! An OAuth2 authorization server engine with a pluggable storage backend.
//!
//! ## About
//! `niso` validates authorization and token requests, enforces the grant flows of [RFC 6749],
//! mints opaque credentials, and classifies every failure into one of the error codes defined
//! there. It does not speak HTTP and does not store anything itself. A host application supplies
//! the transport, a persistence backend implementing [`Storage`], and the decision whether a
//! resource owner approves a request.
//!
//! The engine is synchronous and stateless. A [`Server`] holds an immutable configuration, a
//! token generator, and a storage handle and can be shared by all threads of a process.
//!
//! ## Usage
//! Register clients with a storage backend, for example the [`MemoryStorage`], and build a
//! [`Server`] around it. Then translate incoming requests into the typed requests of the engine,
//! either by hand or with the adapter in [`frontends::simple`], and render the outcome.
//!
//! The security relevant properties are all enforced by the engine: redirect uris are compared
//! verbatim with the registration, authorization codes can be exchanged at most once, expired
//! codes and refresh tokens are rejected, and internal failures are never described to clients.
//! The one property the engine can not enforce alone is the atomic consumption of codes and
//! refresh tokens under concurrency, which a backend provides by reporting from its delete
//! operation whether it removed the record.
//!
//! For more information, see the documentation of [`endpoint`] and [`primitives`].
//!
//! [RFC 6749]: https://tools.ietf.org/html/rfc6749
//! [`Storage`]: primitives/storage/trait.Storage.html
//! [`Server`]: endpoint/struct.Server.html
//! [`MemoryStorage`]: primitives/memory/struct.MemoryStorage.html
//! [`frontends::simple`]: frontends/simple/index.html
//! [`endpoint`]: endpoint/index.html
//! [`primitives`]: primitives/index.html
#![warn(missing_docs)]

pub mod code_grant;
pub mod endpoint;
pub mod frontends;
pub mod primitives;
