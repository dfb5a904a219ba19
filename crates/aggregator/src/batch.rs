// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{EncryptedTotals, RevealedTally, TallyError};
use confide_events::{BatchClosed, BatchId, BatchOpened};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub id: BatchId,
    pub is_open: bool,
    /// Running encrypted totals, an encryption of zero until the first submission lands
    pub totals: EncryptedTotals,
    pub submissions: u64,
    pub revealed: Option<RevealedTally>,
}

impl Batch {
    fn new(id: BatchId, totals: EncryptedTotals) -> Self {
        Self {
            id,
            is_open: true,
            totals,
            submissions: 0,
            revealed: None,
        }
    }
}

/// Numbered batches. Ids start at 1 and only move forward. Batches are never reopened and never
/// removed.
#[derive(Clone, Debug, Default)]
pub struct BatchManager {
    current: BatchId,
    batches: BTreeMap<BatchId, Batch>,
}

impl BatchManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero until the first batch is opened
    pub fn current_id(&self) -> BatchId {
        self.current
    }

    pub fn get(&self, batch_id: BatchId) -> Option<&Batch> {
        self.batches.get(&batch_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Batch> {
        self.batches.values()
    }

    pub fn open_count(&self) -> usize {
        self.batches.values().filter(|b| b.is_open).count()
    }

    /// Open the batch after the current one with the given starting totals
    pub fn open_next(&mut self, zero: EncryptedTotals) -> Result<BatchOpened, TallyError> {
        if let Some(current) = self.batches.get(&self.current) {
            if current.is_open {
                return Err(TallyError::BatchStillOpen(current.id));
            }
        }
        let batch_id = self.current + 1;
        self.batches.insert(batch_id, Batch::new(batch_id, zero));
        self.current = batch_id;
        Ok(BatchOpened { batch_id })
    }

    pub fn close(&mut self, batch_id: BatchId) -> Result<BatchClosed, TallyError> {
        if batch_id != self.current {
            return Err(TallyError::InvalidBatch(batch_id));
        }
        let batch = self
            .batches
            .get_mut(&batch_id)
            .ok_or(TallyError::InvalidBatch(batch_id))?;
        if !batch.is_open {
            return Err(TallyError::AlreadyClosed(batch_id));
        }
        batch.is_open = false;
        Ok(BatchClosed {
            batch_id,
            submissions: batch.submissions,
        })
    }

    /// The current batch, provided it is still accepting submissions
    pub fn accepting(&self, batch_id: BatchId) -> Result<&Batch, TallyError> {
        if batch_id != self.current {
            return Err(TallyError::InvalidBatch(batch_id));
        }
        let batch = self
            .batches
            .get(&batch_id)
            .ok_or(TallyError::InvalidBatch(batch_id))?;
        if !batch.is_open {
            return Err(TallyError::BatchClosed(batch_id));
        }
        Ok(batch)
    }

    /// A closed batch that still awaits its reveal
    pub fn frozen(&self, batch_id: BatchId) -> Result<&Batch, TallyError> {
        let batch = self
            .batches
            .get(&batch_id)
            .filter(|b| !b.is_open)
            .ok_or(TallyError::InvalidBatch(batch_id))?;
        if batch.revealed.is_some() {
            return Err(TallyError::BatchAlreadyRevealed(batch_id));
        }
        Ok(batch)
    }

    /// Replace the totals of an accepting batch and bump its count. Returns the new count.
    pub fn apply_submission(
        &mut self,
        batch_id: BatchId,
        totals: EncryptedTotals,
    ) -> Result<u64, TallyError> {
        self.accepting(batch_id)?;
        let batch = self
            .batches
            .get_mut(&batch_id)
            .ok_or(TallyError::InvalidBatch(batch_id))?;
        batch.totals = totals;
        batch.submissions += 1;
        Ok(batch.submissions)
    }

    pub(crate) fn reveal(&mut self, batch_id: BatchId, revealed: RevealedTally) {
        if let Some(batch) = self.batches.get_mut(&batch_id) {
            batch.revealed = Some(revealed);
        }
    }

    #[cfg(test)]
    pub(crate) fn overwrite_totals(&mut self, batch_id: BatchId, totals: EncryptedTotals) {
        if let Some(batch) = self.batches.get_mut(&batch_id) {
            batch.totals = totals;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use confide_fhe::EncryptedValue;
    use proptest::prelude::*;

    fn totals(score: u8, weight: u8) -> EncryptedTotals {
        EncryptedTotals {
            score: EncryptedValue::from_bytes(vec![score]),
            weight: EncryptedValue::from_bytes(vec![weight]),
        }
    }

    fn zero() -> EncryptedTotals {
        totals(0, 0)
    }

    #[test]
    fn lifecycle() -> Result<()> {
        let mut batches = BatchManager::new();
        assert_eq!(batches.current_id(), 0);
        assert_eq!(batches.open_next(zero())?, BatchOpened { batch_id: 1 });
        assert_eq!(batches.open_next(zero()), Err(TallyError::BatchStillOpen(1)));

        assert_eq!(batches.apply_submission(1, totals(1, 1))?, 1);
        assert_eq!(batches.apply_submission(1, totals(2, 2))?, 2);

        let closed = batches.close(1)?;
        assert_eq!(closed.submissions, 2);
        assert_eq!(batches.close(1), Err(TallyError::AlreadyClosed(1)));

        assert_eq!(batches.open_next(zero())?.batch_id, 2);
        assert_eq!(batches.close(1), Err(TallyError::InvalidBatch(1)));
        Ok(())
    }

    #[test]
    fn submissions_only_reach_the_current_open_batch() -> Result<()> {
        let mut batches = BatchManager::new();
        batches.open_next(zero())?;
        assert_eq!(
            batches.apply_submission(2, totals(1, 1)),
            Err(TallyError::InvalidBatch(2))
        );
        batches.close(1)?;
        assert_eq!(
            batches.apply_submission(1, totals(1, 1)),
            Err(TallyError::BatchClosed(1))
        );
        let batch = batches.get(1).expect("batch 1");
        assert_eq!(batch.submissions, 0);
        assert_eq!(batch.totals, zero());
        Ok(())
    }

    #[test]
    fn frozen_requires_a_closed_unrevealed_batch() -> Result<()> {
        let mut batches = BatchManager::new();
        batches.open_next(zero())?;
        assert_eq!(batches.frozen(1), Err(TallyError::InvalidBatch(1)));
        assert_eq!(batches.frozen(7), Err(TallyError::InvalidBatch(7)));
        batches.close(1)?;
        // An empty batch still has its zero totals to decrypt
        assert_eq!(batches.frozen(1)?.totals, zero());

        batches.open_next(zero())?;
        batches.apply_submission(2, totals(3, 1))?;
        batches.close(2)?;
        assert_eq!(batches.frozen(2)?.submissions, 1);

        batches.reveal(
            2,
            RevealedTally {
                request_id: 1,
                score: alloy_primitives::U256::from(3u64),
                weight: alloy_primitives::U256::from(1u64),
            },
        );
        assert_eq!(batches.frozen(2), Err(TallyError::BatchAlreadyRevealed(2)));
        Ok(())
    }

    proptest! {
        #[test]
        fn at_most_one_open_batch(ops in proptest::collection::vec(any::<bool>(), 0..64)) {
            let mut batches = BatchManager::new();
            for open in ops {
                if open {
                    let _ = batches.open_next(zero());
                } else {
                    let _ = batches.close(batches.current_id());
                }
                prop_assert!(batches.open_count() <= 1);
                if let Some(current) = batches.get(batches.current_id()) {
                    prop_assert_eq!(
                        batches.iter().filter(|b| b.is_open).all(|b| b.id == current.id),
                        true
                    );
                }
            }
        }
    }
}
