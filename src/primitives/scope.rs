//! Defines the Scope type and parsing/formatting according to the rfc.
use std::{cmp, fmt, str};

use std::collections::BTreeSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Scope of a given grant or request, a set of scope-tokens separated by spaces.
///
/// Scopes are interpreted as a conjunction of scope tokens.  This induces a partial ordering on
/// scopes where scope `A` is less or equal than scope `B` if all scope tokens of `A` are also
/// found in `B`.  A token request may only narrow the scope of its original grant, which is
/// exactly the rule
/// > A request for scope `A` is admissible under a grant of scope `B` iff `A <= B`
///
/// Example
/// ------
///
/// ```
/// # use niso::primitives::scope::Scope;
/// let granted   = "read write".parse::<Scope>().unwrap();
/// let requested = "read".parse::<Scope>().unwrap();
/// let widened   = "read admin".parse::<Scope>().unwrap();
///
/// assert!(requested <= granted);
/// assert!(requested.is_subset_of(&granted));
/// assert!(!widened.is_subset_of(&granted));
/// ```
///
/// Scope-tokens are restricted to the following subset of ascii:
///   - The character '!'
///   - The character range '\x23' to '\x5b' which includes numbers and upper case letters
///   - The character range '\x5d' to '\x7e' which includes lower case letters
/// Individual scope-tokens are separated by spaces.
///
/// In particular, the characters '\x22' (`"`) and '\x5c' (`\`)  are not allowed.
///
/// Tokens are kept ordered so that the formatted scope is stable between calls.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Scope {
    tokens: BTreeSet<String>,
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}

impl Scope {
    fn invalid_scope_char(ch: char) -> bool {
        match ch {
            '\x21' => false,
            ch if ('\x23'..='\x5b').contains(&ch) => false,
            ch if ('\x5d'..='\x7e').contains(&ch) => false,
            ' ' => false,
            _ => true,
        }
    }

    /// The scope without any tokens.
    pub fn empty() -> Self {
        Scope::default()
    }

    /// Whether no scope token was requested or granted.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Determines if every token of this scope is also contained in `rhs`.
    ///
    /// This operation is equivalent to comparison via `<=`.
    pub fn is_subset_of(&self, rhs: &Scope) -> bool {
        self <= rhs
    }

    /// Create an iterator over the individual scopes.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(AsRef::as_ref)
    }
}

/// Error returned from parsing a scope as encoded in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseScopeErr {
    /// A character was encountered which is not allowed to appear in scope strings.
    InvalidCharacter(char),
}

impl str::FromStr for Scope {
    type Err = ParseScopeErr;

    fn from_str(string: &str) -> Result<Scope, ParseScopeErr> {
        if let Some(ch) = string.chars().find(|&ch| Scope::invalid_scope_char(ch)) {
            return Err(ParseScopeErr::InvalidCharacter(ch));
        }
        let tokens = string.split(' ').filter(|s| !s.is_empty());
        Ok(Scope {
            tokens: tokens.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for ParseScopeErr {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseScopeErr::InvalidCharacter(chr) => {
                write!(fmt, "Encountered invalid character in scope: {}", chr)
            }
        }
    }
}

impl std::error::Error for ParseScopeErr {}

impl fmt::Debug for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_tuple("Scope").field(&self.tokens).finish()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let output = self
            .tokens
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        fmt.write_str(&output)
    }
}

impl PartialOrd for Scope {
    fn partial_cmp(&self, rhs: &Self) -> Option<cmp::Ordering> {
        let intersect_count = self.tokens.intersection(&rhs.tokens).count();
        if intersect_count == self.tokens.len() && intersect_count == rhs.tokens.len() {
            Some(cmp::Ordering::Equal)
        } else if intersect_count == self.tokens.len() {
            Some(cmp::Ordering::Less)
        } else if intersect_count == rhs.tokens.len() {
            Some(cmp::Ordering::Greater)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsing() {
        let scope = Scope {
            tokens: ["default", "password", "email"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        let from_string = "email  password default".parse::<Scope>().unwrap();
        assert_eq!(scope, from_string);
        assert_eq!(from_string.to_string(), "default email password");
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(
            "read \"write\"".parse::<Scope>(),
            Err(ParseScopeErr::InvalidCharacter('"'))
        );
        assert!("back\\slash".parse::<Scope>().is_err());
    }

    #[test]
    fn test_compare() {
        let scope_base = "cap1 cap2".parse::<Scope>().unwrap();
        let scope_less = "cap1".parse::<Scope>().unwrap();
        let scope_uncmp = "cap1 cap3".parse::<Scope>().unwrap();

        assert_eq!(scope_base.partial_cmp(&scope_less), Some(cmp::Ordering::Greater));
        assert_eq!(scope_less.partial_cmp(&scope_base), Some(cmp::Ordering::Less));
        assert_eq!(scope_base.partial_cmp(&scope_uncmp), None);
        assert_eq!(scope_base.partial_cmp(&scope_base), Some(cmp::Ordering::Equal));

        assert!(scope_less.is_subset_of(&scope_base));
        assert!(scope_base.is_subset_of(&scope_base));
        assert!(!scope_base.is_subset_of(&scope_less));
        assert!(!scope_uncmp.is_subset_of(&scope_base));
    }

    #[test]
    fn empty_scope_is_subset_of_all() {
        let empty = "".parse::<Scope>().unwrap();
        assert!(empty.is_empty());
        assert!(empty.is_subset_of(&Scope::empty()));
        assert!(empty.is_subset_of(&"any".parse().unwrap()));
        assert!(!"any".parse::<Scope>().unwrap().is_subset_of(&empty));
    }

    #[test]
    fn deserialize_invalid_scope() {
        let deserialized = serde_json::from_str::<Scope>("\"bad\\\\scope\"");
        assert!(deserialized.is_err());
    }
}
