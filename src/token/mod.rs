//! Upload tokens.
//!
//! A token is a client-generated decimal string that ties one attempt's
//! upload to its playback URL. It is a correlation id only, not a credential:
//! uniqueness is expected but not guaranteed.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadToken(String);

impl UploadToken {
    /// Accepts non-empty, all-digit strings.
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait TokenSource: Send + Sync {
    fn next_token(&self) -> UploadToken;
}

/// Draws tokens from random v4 UUID bits.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokenSource;

impl TokenSource for RandomTokenSource {
    fn next_token(&self) -> UploadToken {
        let bits = uuid::Uuid::new_v4().as_u128() as u64;
        UploadToken(bits.to_string())
    }
}
