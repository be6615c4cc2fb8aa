//! A collection of primitives shared by every grant flow.
//!
//! A primitive is the smallest independent unit of policy or persistence used by the engine. The
//! [`Storage`] trait is the persistence boundary, a [`TokenGenerator`] mints the opaque strings
//! handed to clients, and [`Scope`] implements the permission algebra used to validate requests.
//! Abstracting these makes it possible to provide –e.g.– an independent database based backend
//! without touching the grant handling itself.
//!
//! ```
//! # use niso::primitives::memory::MemoryStorage;
//! # use niso::primitives::grant::ClientData;
//! let storage = MemoryStorage::new();
//! storage.register_client(ClientData::new("1234", "aabbccdd", "http://localhost/appauth"));
//! ```
//!
//! [`Storage`]: storage/trait.Storage.html
//! [`TokenGenerator`]: generator/trait.TokenGenerator.html
//! [`Scope`]: scope/struct.Scope.html

use chrono::DateTime;
use chrono::Utc;

pub mod generator;
pub mod grant;
pub mod memory;
pub mod scope;
pub mod storage;

type Time = DateTime<Utc>;

/// Commonly used primitives for frontends and backends.
pub mod prelude {
    pub use super::generator::{RandomGenerator, TokenGenerator, TokenKind};
    pub use super::grant::{AccessData, AuthorizationData, ClientData, RefreshTokenData};
    pub use super::memory::MemoryStorage;
    pub use super::scope::Scope;
    pub use super::storage::{Context, Storage, StorageError};
}
