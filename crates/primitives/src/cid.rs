use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::{Error as HashError, Hash};

/// A content identifier: the digest of an object's canonical encoding.
///
/// Identical bytes and identical directory listings always produce the same
/// identifier.
#[derive(
    Eq,
    Copy,
    Hash,
    Clone,
    Debug,
    PartialEq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
pub struct Cid(Hash);

impl Cid {
    #[must_use]
    pub fn hash(data: &[u8]) -> Self {
        Self(Hash::new(data))
    }

    #[must_use]
    pub fn to_base58(&self) -> String {
        self.0.to_base58()
    }
}

impl From<[u8; 32]> for Cid {
    fn from(id: [u8; 32]) -> Self {
        Self(id.into())
    }
}

impl From<Hash> for Cid {
    fn from(hash: Hash) -> Self {
        Self(hash)
    }
}

impl Deref for Cid {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        self.0.as_bytes()
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.to_base58())
    }
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct InvalidCid(HashError);

impl FromStr for Cid {
    type Err = InvalidCid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse().map_err(InvalidCid)?))
    }
}
