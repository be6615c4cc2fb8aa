//! Generators produce the opaque strings handed out as codes and tokens.
//!
//! Tokens carry no structure. Their only job is to be unguessable, the grant they stand for is
//! looked up through the [`Storage`] backend. Uniqueness is probabilistic and not enforced by
//! storage: with 256 bits of entropy a collision is as unlikely as guessing a token outright.
//!
//! [`Storage`]: ../storage/trait.Storage.html
use std::rc::Rc;
use std::sync::Arc;

use base64::{encode_config, URL_SAFE_NO_PAD};
use ring::rand::{SecureRandom, SystemRandom};

/// The purpose a token is generated for.
///
/// Generators that ignore their input are fine, the kind only exists so that signing or
/// prefixing implementations can tell the usages apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A single-use authorization code.
    AuthorizationCode,

    /// A bearer token.
    AccessToken,

    /// A refresh token.
    RefreshToken,
}

/// Generic source of opaque token strings.
///
/// ## Requirements on implementations
///
/// The output MUST be indistinguishable from a random function and MUST only use characters that
/// can appear in a url query or fragment without escaping.
pub trait TokenGenerator {
    /// Produce a fresh token for the given usage.
    fn generate(&self, kind: TokenKind) -> Result<String, ()>;
}

/// Generates tokens from random bytes.
///
/// The bytes are drawn from the operating system's secure random source and encoded with the url
/// safe base64 alphabet, without padding.
pub struct RandomGenerator {
    random: SystemRandom,
    len: usize,
}

impl RandomGenerator {
    /// The number of random bytes used by `RandomGenerator::default()`, 256 bits of entropy.
    pub const DEFAULT_LENGTH: usize = 32;

    /// Generates tokens with a specific byte length.
    ///
    /// Lengths below 32 bytes do not provide the entropy required for codes and tokens and are
    /// only useful in tests.
    pub fn new(length: usize) -> RandomGenerator {
        RandomGenerator {
            random: SystemRandom::new(),
            len: length,
        }
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        RandomGenerator::new(Self::DEFAULT_LENGTH)
    }
}

impl TokenGenerator for RandomGenerator {
    fn generate(&self, _: TokenKind) -> Result<String, ()> {
        let mut result = vec![0; self.len];
        self.random.fill(result.as_mut_slice()).map_err(|_| ())?;
        Ok(encode_config(&result, URL_SAFE_NO_PAD))
    }
}

impl<'a, T: TokenGenerator + ?Sized + 'a> TokenGenerator for &'a T {
    fn generate(&self, kind: TokenKind) -> Result<String, ()> {
        (**self).generate(kind)
    }
}

impl<T: TokenGenerator + ?Sized> TokenGenerator for Box<T> {
    fn generate(&self, kind: TokenKind) -> Result<String, ()> {
        (**self).generate(kind)
    }
}

impl<T: TokenGenerator + ?Sized> TokenGenerator for Rc<T> {
    fn generate(&self, kind: TokenKind) -> Result<String, ()> {
        (**self).generate(kind)
    }
}

impl<T: TokenGenerator + ?Sized> TokenGenerator for Arc<T> {
    fn generate(&self, kind: TokenKind) -> Result<String, ()> {
        (**self).generate(kind)
    }
}
