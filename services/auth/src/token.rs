//! Opaque session token
//!
//! Tokens are the only session identifier that ever leaves the server, so
//! they carry 256 bits from the OS random source (well above the 128-bit
//! floor needed to make guessing infeasible) and are never derived from
//! prior tokens. `Debug` is redacted so a token cannot leak through logs.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Number of random bytes behind each token (256 bits of entropy)
const TOKEN_BYTES: usize = 32;

/// External-facing session identifier, e.g. carried in a cookie
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh token from the OS cryptographic random source
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        SessionToken(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// The wire form of the token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Accepts a client-presented token string, e.g. from a cookie value
impl From<String> for SessionToken {
    fn from(raw: String) -> Self {
        SessionToken(raw)
    }
}

impl From<&str> for SessionToken {
    fn from(raw: &str) -> Self {
        SessionToken(raw.to_string())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_tokens_have_expected_length() {
        let token = SessionToken::generate();
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(token.as_str().len(), 43);
    }

    #[test]
    fn generated_tokens_are_url_safe() {
        let token = SessionToken::generate();
        assert!(
            token
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn generated_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000)
            .map(|_| SessionToken::generate().as_str().to_string())
            .collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn debug_output_is_redacted() {
        let token = SessionToken::generate();
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains(token.as_str()));
    }
}
