// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::U256;
use anyhow::{anyhow, bail, Context, Result};
use confide_aggregator::{
    encode_cleartexts, DecryptionAuthority, DecryptionCallback, DecryptionRequest,
};
use confide_events::RequestId;
use confide_fhe::EncryptedValue;
use confide_utils::ArcBytes;
use fhe::bfv::{BfvParameters, Ciphertext, Encoding, SecretKey};
use fhe_traits::{DeserializeParametrized, FheDecoder, FheDecrypter};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

struct Inner {
    params: Arc<BfvParameters>,
    secret_key: SecretKey,
    proof_key: [u8; 32],
    pending: BTreeMap<RequestId, DecryptionRequest>,
}

/// In-process decryption authority holding the BFV secret key. Proofs are a keyed SHA-256 over
/// the request id and the cleartexts. Clones share state so a test can keep a handle after the
/// tally takes ownership of one.
#[derive(Clone)]
pub struct LocalDecryptionAuthority {
    inner: Arc<Mutex<Inner>>,
}

impl LocalDecryptionAuthority {
    pub fn new(params: Arc<BfvParameters>, secret_key: SecretKey, proof_key: [u8; 32]) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                params,
                secret_key,
                proof_key,
                pending: BTreeMap::new(),
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("authority state poisoned"))
    }

    /// Request ids dispatched but not yet fulfilled
    pub fn pending(&self) -> Result<Vec<RequestId>> {
        Ok(self.lock()?.pending.keys().copied().collect())
    }

    pub fn request(&self, request_id: RequestId) -> Result<Option<DecryptionRequest>> {
        Ok(self.lock()?.pending.get(&request_id).cloned())
    }

    /// Proof for `cleartexts` under this authority's key
    pub fn sign(&self, request_id: RequestId, cleartexts: &[u8]) -> Result<Vec<u8>> {
        Ok(sign(&self.lock()?.proof_key, request_id, cleartexts))
    }

    pub fn decrypt(&self, value: &EncryptedValue) -> Result<u64> {
        let inner = self.lock()?;
        decrypt(&inner, value)
    }

    /// Decrypt a pending request and build the callback for it
    pub fn fulfil(&self, request_id: RequestId) -> Result<DecryptionCallback> {
        let mut inner = self.lock()?;
        let Some(request) = inner.pending.get(&request_id) else {
            bail!("no pending request {request_id}");
        };
        let [score, weight] = request.values.as_slice() else {
            bail!(
                "request {request_id} carries {} values, expected 2",
                request.values.len()
            );
        };

        let score = decrypt(&inner, score)?;
        let weight = decrypt(&inner, weight)?;
        let cleartexts = encode_cleartexts(U256::from(score), U256::from(weight));
        let proof = sign(&inner.proof_key, request_id, &cleartexts);
        inner.pending.remove(&request_id);

        info!(request_id, score, weight, "Fulfilled decryption request");
        Ok(DecryptionCallback {
            request_id,
            cleartexts: ArcBytes::from_bytes(cleartexts),
            proof: ArcBytes::from_bytes(proof),
        })
    }
}

fn sign(proof_key: &[u8; 32], request_id: RequestId, cleartexts: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(proof_key);
    hasher.update(request_id.to_be_bytes());
    hasher.update(cleartexts);
    hasher.finalize().to_vec()
}

fn decrypt(inner: &Inner, value: &EncryptedValue) -> Result<u64> {
    let ct = Ciphertext::from_bytes(value, &inner.params).context("Invalid ciphertext")?;
    let pt = inner
        .secret_key
        .try_decrypt(&ct)
        .map_err(|e| anyhow!("Decryption failed: {e}"))?;
    let decoded = Vec::<u64>::try_decode(&pt, Encoding::poly())
        .map_err(|e| anyhow!("Decoding failed: {e}"))?;
    decoded
        .first()
        .copied()
        .ok_or_else(|| anyhow!("Empty plaintext"))
}

impl DecryptionAuthority for LocalDecryptionAuthority {
    fn dispatch(&mut self, request: DecryptionRequest) -> Result<()> {
        let mut inner = self.lock()?;
        inner.pending.insert(request.request_id, request);
        Ok(())
    }

    fn verify_proof(&self, request_id: RequestId, cleartexts: &[u8], proof: &[u8]) -> bool {
        match self.lock() {
            Ok(inner) => sign(&inner.proof_key, request_id, cleartexts) == proof,
            Err(_) => false,
        }
    }
}
