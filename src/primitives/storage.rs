//! The persistence boundary of the engine.
//!
//! A [`Storage`] backend keeps clients, authorization codes and tokens. Any backend satisfying the
//! trait is interchangeable, an in-memory one is provided in [`memory`].
//!
//! Backends MUST distinguish a record that simply does not exist ([`StorageError::NotFound`]) from
//! every other failure. The former is safe to report to a client as an invalid credential, the
//! latter is reported only as a generic `server_error` while its cause is logged.
//!
//! ## Consumption of codes and refresh tokens
//!
//! Codes are exchanged by separate calls: read, validate, delete, issue. Two concurrent exchanges
//! of the same code race each other. The `delete_*` methods therefore report whether *this* call
//! removed the record and backends MUST make that removal atomic per key, so that at most one
//! caller ever observes `Ok(true)` for a given code or token.
//!
//! Issuing saves the refresh token before the access token it belongs to. When the second save
//! fails the request ends in `server_error` and the code is already consumed. The refresh token
//! left behind was never handed out and names an access token that does not exist. Backends
//! with transactions may roll both saves back together, others can garbage collect such records.
//!
//! [`Storage`]: trait.Storage.html
//! [`memory`]: ../memory/index.html
//! [`StorageError::NotFound`]: enum.StorageError.html#variant.NotFound
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};

use super::grant::{AccessData, AuthorizationData, ClientData, RefreshTokenData};
use super::Time;

/// Failure of a storage operation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The record does not exist.
    #[error("record not found")]
    NotFound,

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// The deadline of the operation passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Any other failure of the backend.
    #[error("storage backend failure: {0}")]
    Backend(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl StorageError {
    /// Wrap an arbitrary backend error.
    pub fn backend<E>(error: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        StorageError::Backend(error.into())
    }

    /// Whether this signals an absent record.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound => true,
            _ => false,
        }
    }
}

/// Cancellation and deadline signal passed to every storage operation.
///
/// Clones share the cancellation flag, so a host can keep one clone and cancel the request while
/// the engine is processing it. Backends that block should poll [`check`] or use the deadline.
///
/// [`check`]: #method.check
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Time>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Context::default()
    }

    /// A context whose operations fail after `deadline`.
    pub fn with_deadline(deadline: Time) -> Self {
        Context {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// A context whose operations fail after `timeout` has elapsed from now.
    ///
    /// A timeout reaching past the representable range of time means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Context {
            cancelled: Arc::default(),
            deadline: Utc::now().checked_add_signed(timeout),
        }
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Time> {
        self.deadline
    }

    /// Cancel all operations using this context or one of its clones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether `cancel` was called on this context or one of its clones.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail if the context was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), StorageError> {
        if self.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        match self.deadline {
            Some(deadline) if deadline <= Utc::now() => Err(StorageError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// The operations the engine requires from a persistence backend.
///
/// Methods take `&self` since a single backend serves all concurrent requests, implementations
/// use interior mutability or a connection pool.
pub trait Storage {
    /// Fetch a client by its id, `NotFound` if no such client is registered.
    fn get_client_data(&self, ctx: &Context, client_id: &str) -> Result<ClientData, StorageError>;

    /// Persist an authorization code.
    fn save_authorize_data(&self, ctx: &Context, data: &AuthorizationData) -> Result<(), StorageError>;

    /// Look up an authorization code, `NotFound` if absent.
    ///
    /// Expiry is checked by the engine, backends may return expired records.
    fn get_authorize_data(&self, ctx: &Context, code: &str) -> Result<AuthorizationData, StorageError>;

    /// Delete an authorization code.
    ///
    /// Deleting an unknown code is not an error and returns `Ok(false)`. Returns `Ok(true)` only
    /// for the one call that actually removed the record.
    fn delete_authorize_data(&self, ctx: &Context, code: &str) -> Result<bool, StorageError>;

    /// Persist an access token.
    fn save_access_data(&self, ctx: &Context, data: &AccessData) -> Result<(), StorageError>;

    /// Look up a refresh token, `NotFound` if absent or revoked.
    fn get_refresh_token_data(&self, ctx: &Context, token: &str) -> Result<RefreshTokenData, StorageError>;

    /// Persist a refresh token.
    fn save_refresh_token_data(&self, ctx: &Context, data: &RefreshTokenData) -> Result<(), StorageError>;

    /// Delete a refresh token, with the same semantics as `delete_authorize_data`.
    fn delete_refresh_token_data(&self, ctx: &Context, token: &str) -> Result<bool, StorageError>;
}

macro_rules! forward_storage {
    ($($impl_header:tt)*) => {
        $($impl_header)* {
            fn get_client_data(&self, ctx: &Context, client_id: &str) -> Result<ClientData, StorageError> {
                (**self).get_client_data(ctx, client_id)
            }

            fn save_authorize_data(&self, ctx: &Context, data: &AuthorizationData) -> Result<(), StorageError> {
                (**self).save_authorize_data(ctx, data)
            }

            fn get_authorize_data(&self, ctx: &Context, code: &str) -> Result<AuthorizationData, StorageError> {
                (**self).get_authorize_data(ctx, code)
            }

            fn delete_authorize_data(&self, ctx: &Context, code: &str) -> Result<bool, StorageError> {
                (**self).delete_authorize_data(ctx, code)
            }

            fn save_access_data(&self, ctx: &Context, data: &AccessData) -> Result<(), StorageError> {
                (**self).save_access_data(ctx, data)
            }

            fn get_refresh_token_data(&self, ctx: &Context, token: &str) -> Result<RefreshTokenData, StorageError> {
                (**self).get_refresh_token_data(ctx, token)
            }

            fn save_refresh_token_data(&self, ctx: &Context, data: &RefreshTokenData) -> Result<(), StorageError> {
                (**self).save_refresh_token_data(ctx, data)
            }

            fn delete_refresh_token_data(&self, ctx: &Context, token: &str) -> Result<bool, StorageError> {
                (**self).delete_refresh_token_data(ctx, token)
            }
        }
    };
}

forward_storage!(impl<'s, S: Storage + ?Sized> Storage for &'s S);
forward_storage!(impl<S: Storage + ?Sized> Storage for Box<S>);
forward_storage!(impl<S: Storage + ?Sized> Storage for Arc<S>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_shared() {
        let ctx = Context::background();
        let handle = ctx.clone();
        assert!(ctx.check().is_ok());

        handle.cancel();
        assert!(ctx.is_cancelled());
        assert!(match ctx.check() {
            Err(StorageError::Cancelled) => true,
            _ => false,
        });
    }

    #[test]
    fn deadline_passes() {
        let ctx = Context::with_deadline(Utc::now() - Duration::seconds(1));
        assert!(match ctx.check() {
            Err(StorageError::DeadlineExceeded) => true,
            _ => false,
        });

        let ctx = Context::with_timeout(Duration::hours(1));
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_some());

        let ctx = Context::with_timeout(Duration::MAX);
        assert!(ctx.check().is_ok());
        assert_eq!(ctx.deadline(), None);
    }

    #[test]
    fn backend_error_keeps_cause() {
        let error = StorageError::backend("connection reset");
        assert!(!error.is_not_found());
        assert!(std::error::Error::source(&error).is_some());
        assert!(StorageError::NotFound.is_not_found());
    }
}
