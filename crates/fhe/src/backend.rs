// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use confide_utils::ArcBytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Stored representation of an encrypted integer.
///
/// The tally never looks inside these bytes. It stores them, forwards them to the decryption
/// authority and hashes them into request fingerprints. Two values are "the same" exactly when
/// their stored representations are byte-for-byte equal.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptedValue(ArcBytes);

impl EncryptedValue {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(ArcBytes::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for EncryptedValue {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<u8>> for EncryptedValue {
    fn from(value: Vec<u8>) -> Self {
        Self::from_bytes(value)
    }
}

impl fmt::Debug for EncryptedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedValue({:?})", self.0)
    }
}

/// Capability boundary to the homomorphic scheme.
///
/// Implementations must make `add` associative and commutative on stored representations so that
/// the order in which submissions arrive never changes the aggregate.
pub trait HomomorphicBackend: Send + Sync + 'static {
    /// Rehydrate and validate a stored representation received from outside the tally.
    fn as_encrypted(&self, stored: &[u8]) -> Result<EncryptedValue>;

    /// Homomorphically add two encrypted values.
    fn add(&self, lhs: &EncryptedValue, rhs: &EncryptedValue) -> Result<EncryptedValue>;

    /// An encryption of zero. Every batch starts its totals from this value.
    fn zero(&self) -> Result<EncryptedValue>;
}
