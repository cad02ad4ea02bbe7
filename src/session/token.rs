//! Opaque Auth Token
//!
//! Wrapper around the bearer credential issued by the backend. The client
//! never inspects the value; it only stores it and attaches it to requests.

use std::fmt;

/// An opaque bearer token
///
/// The `Debug` implementation redacts the value so tokens never leak
/// into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token string
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token value, for the Authorization header and the
    /// live-sync query credential
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token is the empty string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<redacted, {} bytes>)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let token = Token::new("abc-123");
        assert_eq!(token.as_str(), "abc-123");
        assert!(!token.is_empty());
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = Token::new("super-secret-credential");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("super-secret-credential"));
        assert!(debug.contains("redacted"));
    }
}
