//! Key hashing strategies
//!
//! Keys are hashed over their UTF-16 code units so that assignments match
//! records written by earlier JavaScript deployments of the service.
//! Strategies are versioned: switching strategy re-homes existing keys, so
//! the name is recorded in every shard file and checked on open.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Versioned key hashing algorithm
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum HashStrategy {
    /// Sum of UTF-16 code units
    #[default]
    #[serde(rename = "char-sum-v1")]
    CharSumV1,
    /// Polynomial rolling hash (`code + (hash << 5) - hash`) in wrapping 32-bit arithmetic
    #[serde(rename = "rolling-v2")]
    RollingV2,
}

impl HashStrategy {
    /// Hash a key. The result may be negative for `RollingV2`.
    ///
    /// # Example
    /// ```
    /// use usershard_server::sharding::HashStrategy;
    ///
    /// assert_eq!(HashStrategy::CharSumV1.hash("a@b.com"), 624);
    /// assert_eq!(HashStrategy::RollingV2.hash("a"), 97);
    /// ```
    pub fn hash(&self, key: &str) -> i64 {
        match self {
            Self::CharSumV1 => char_sum(key),
            Self::RollingV2 => i64::from(rolling(key)),
        }
    }

    /// Stable name, as written to config and shard files
    pub fn name(&self) -> &'static str {
        match self {
            Self::CharSumV1 => "char-sum-v1",
            Self::RollingV2 => "rolling-v2",
        }
    }
}

impl fmt::Display for HashStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn char_sum(key: &str) -> i64 {
    key.encode_utf16()
        .fold(0i64, |acc, unit| acc.wrapping_add(i64::from(unit)))
}

fn rolling(key: &str) -> i32 {
    key.encode_utf16().fold(0i32, |hash, unit| {
        i32::from(unit).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    })
}
