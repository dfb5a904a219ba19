// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::TallyError;
use confide_fhe::{EncryptedValue, HomomorphicBackend};
use std::sync::Arc;
use tracing::trace;

/// The pair of running encrypted totals kept per batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedTotals {
    pub score: EncryptedValue,
    pub weight: EncryptedValue,
}

/// Combines opaque encrypted values through a homomorphic backend. Never looks inside them.
#[derive(Clone)]
pub struct AggregationEngine {
    backend: Arc<dyn HomomorphicBackend>,
}

impl AggregationEngine {
    pub fn new(backend: Arc<dyn HomomorphicBackend>) -> Self {
        Self { backend }
    }

    fn backend_error(e: anyhow::Error) -> TallyError {
        TallyError::InvalidCiphertext(format!("{e:#}"))
    }

    /// Totals of a batch nobody has submitted to yet
    pub fn zero_totals(&self) -> Result<EncryptedTotals, TallyError> {
        let zero = self.backend.zero().map_err(Self::backend_error)?;
        Ok(EncryptedTotals {
            score: zero.clone(),
            weight: zero,
        })
    }

    /// Fold `incoming` into `current`
    pub fn combine(
        &self,
        current: &EncryptedValue,
        incoming: &[u8],
    ) -> Result<EncryptedValue, TallyError> {
        self.backend
            .as_encrypted(incoming)
            .and_then(|value| self.backend.add(current, &value))
            .map_err(Self::backend_error)
    }

    /// Combine a submission into both totals. Either both succeed or neither is returned.
    pub fn combine_totals(
        &self,
        current: &EncryptedTotals,
        score: &[u8],
        weight: &[u8],
    ) -> Result<EncryptedTotals, TallyError> {
        let score = self.combine(&current.score, score)?;
        let weight = self.combine(&current.weight, weight)?;
        trace!(
            score_len = score.len(),
            weight_len = weight.len(),
            "Combined submission into totals"
        );
        Ok(EncryptedTotals { score, weight })
    }
}
