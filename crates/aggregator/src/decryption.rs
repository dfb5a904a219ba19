// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Batch, BatchManager, EncryptedTotals, TallyError};
use alloy_primitives::{keccak256, Address, B256, U256};
use anyhow::Result;
use confide_events::{BatchId, DecryptionCompleted, DecryptionRequested, RequestId};
use confide_fhe::EncryptedValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Width of one decrypted word in the callback payload
pub const CLEARTEXT_WORD_LEN: usize = 32;
/// Score word followed by weight word
pub const CLEARTEXT_LEN: usize = 2 * CLEARTEXT_WORD_LEN;

/// Continuation of a decryption round trip. Created when the request is dispatched and consulted
/// when the callback arrives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionContext {
    pub batch_id: BatchId,
    pub fingerprint: B256,
    pub processed: bool,
}

/// The decrypted aggregate of a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedTally {
    pub request_id: RequestId,
    pub score: U256,
    pub weight: U256,
}

/// What the decryption authority receives. `values` is always score then weight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptionRequest {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    pub values: Vec<EncryptedValue>,
}

/// External party that decrypts aggregates and later answers with cleartexts and a proof.
pub trait DecryptionAuthority: Send + 'static {
    /// Hand a request over. Must not call back synchronously.
    fn dispatch(&mut self, request: DecryptionRequest) -> Result<()>;

    /// Check that `proof` attests `cleartexts` as the decryption for `request_id`.
    fn verify_proof(&self, request_id: RequestId, cleartexts: &[u8], proof: &[u8]) -> bool;
}

/// Digest of the exact stored totals bound to this deployment
pub fn fingerprint(totals: &EncryptedTotals, system_tag: &Address) -> B256 {
    let mut preimage = Vec::with_capacity(16 + totals.score.len() + totals.weight.len() + 20);
    for value in [&totals.score, &totals.weight] {
        preimage.extend_from_slice(&(value.len() as u64).to_be_bytes());
        preimage.extend_from_slice(value);
    }
    preimage.extend_from_slice(system_tag.as_slice());
    keccak256(preimage)
}

pub fn encode_cleartexts(score: U256, weight: U256) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(CLEARTEXT_LEN);
    bytes.extend_from_slice(&score.to_be_bytes::<CLEARTEXT_WORD_LEN>());
    bytes.extend_from_slice(&weight.to_be_bytes::<CLEARTEXT_WORD_LEN>());
    bytes
}

pub fn decode_cleartexts(request_id: RequestId, bytes: &[u8]) -> Result<(U256, U256), TallyError> {
    if bytes.len() != CLEARTEXT_LEN {
        return Err(TallyError::MalformedCleartext {
            request_id,
            expected: CLEARTEXT_LEN,
            actual: bytes.len(),
        });
    }
    let (score, weight) = bytes.split_at(CLEARTEXT_WORD_LEN);
    Ok((U256::from_be_slice(score), U256::from_be_slice(weight)))
}

/// Issues fingerprinted decryption requests and validates their callbacks.
pub struct DecryptionHandler {
    system_tag: Address,
    next_request_id: RequestId,
    contexts: BTreeMap<RequestId, DecryptionContext>,
    authority: Box<dyn DecryptionAuthority>,
}

impl DecryptionHandler {
    pub fn new(system_tag: Address, authority: Box<dyn DecryptionAuthority>) -> Self {
        Self {
            system_tag,
            next_request_id: 1,
            contexts: BTreeMap::new(),
            authority,
        }
    }

    pub fn system_tag(&self) -> Address {
        self.system_tag
    }

    pub fn context(&self, request_id: RequestId) -> Option<&DecryptionContext> {
        self.contexts.get(&request_id)
    }

    /// Bind a frozen batch to a new request and hand it to the authority. Nothing is stored and
    /// no id is consumed when dispatch fails.
    pub fn request(&mut self, batch: &Batch) -> Result<DecryptionRequested, TallyError> {
        let totals = &batch.totals;
        let fingerprint = fingerprint(totals, &self.system_tag);
        let request_id = self.next_request_id;

        self.authority
            .dispatch(DecryptionRequest {
                request_id,
                batch_id: batch.id,
                values: vec![totals.score.clone(), totals.weight.clone()],
            })
            .map_err(|e| TallyError::DispatchFailed(format!("{e:#}")))?;

        self.contexts.insert(
            request_id,
            DecryptionContext {
                batch_id: batch.id,
                fingerprint,
                processed: false,
            },
        );
        self.next_request_id += 1;

        Ok(DecryptionRequested {
            request_id,
            batch_id: batch.id,
            fingerprint,
        })
    }

    /// Validate a callback against its context and the batch as it is stored now. Any failure
    /// leaves the context and the batch untouched.
    pub fn complete(
        &mut self,
        batches: &mut BatchManager,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &[u8],
    ) -> Result<DecryptionCompleted, TallyError> {
        let context = self
            .contexts
            .get(&request_id)
            .ok_or(TallyError::UnknownRequest(request_id))?;
        let batch_id = context.batch_id;
        let mismatch = TallyError::StateMismatch {
            request_id,
            batch_id,
        };

        let batch = batches.get(batch_id).ok_or(mismatch.clone())?;
        if context.processed || batch.revealed.is_some() {
            return Err(TallyError::ReplayDetected(request_id));
        }

        if fingerprint(&batch.totals, &self.system_tag) != context.fingerprint {
            return Err(mismatch);
        }

        if !self.authority.verify_proof(request_id, cleartexts, proof) {
            return Err(TallyError::InvalidProof(request_id));
        }

        let (score, weight) = decode_cleartexts(request_id, cleartexts)?;

        if let Some(context) = self.contexts.get_mut(&request_id) {
            context.processed = true;
        }
        batches.reveal(
            batch_id,
            RevealedTally {
                request_id,
                score,
                weight,
            },
        );

        Ok(DecryptionCompleted {
            request_id,
            batch_id,
            score,
            weight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(score: &[u8], weight: &[u8]) -> EncryptedTotals {
        EncryptedTotals {
            score: EncryptedValue::from_bytes(score.to_vec()),
            weight: EncryptedValue::from_bytes(weight.to_vec()),
        }
    }

    #[test]
    fn fingerprint_depends_on_order_content_and_tag() {
        let tag = Address::repeat_byte(7);
        let base = fingerprint(&totals(b"ab", b"cd"), &tag);
        assert_eq!(base, fingerprint(&totals(b"ab", b"cd"), &tag));
        assert_ne!(base, fingerprint(&totals(b"cd", b"ab"), &tag));
        assert_ne!(base, fingerprint(&totals(b"ab", b"ce"), &tag));
        assert_ne!(base, fingerprint(&totals(b"ab", b"cd"), &Address::repeat_byte(8)));
        // Length prefixes keep the boundary between the two values unambiguous
        assert_ne!(base, fingerprint(&totals(b"abc", b"d"), &tag));
    }

    #[test]
    fn cleartext_layout() -> anyhow::Result<()> {
        let bytes = encode_cleartexts(U256::from(30u64), U256::from(2u64));
        assert_eq!(bytes.len(), CLEARTEXT_LEN);
        assert_eq!(bytes[31], 30);
        assert_eq!(bytes[63], 2);
        assert_eq!(
            decode_cleartexts(1, &bytes)?,
            (U256::from(30u64), U256::from(2u64))
        );
        Ok(())
    }

    #[test]
    fn cleartext_of_the_wrong_size_is_malformed() {
        assert_eq!(
            decode_cleartexts(4, &[0u8; 63]),
            Err(TallyError::MalformedCleartext {
                request_id: 4,
                expected: 64,
                actual: 63
            })
        );
    }
}
