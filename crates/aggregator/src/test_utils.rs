// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{DecryptionAuthority, DecryptionRequest};
use alloy_primitives::keccak256;
use anyhow::{bail, Result};
use confide_events::RequestId;
use confide_fhe::{EncryptedValue, HomomorphicBackend};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

/// Little endian u64 "ciphertexts" with wrapping addition
pub struct Additive;

pub fn enc(value: u64) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

pub fn dec(bytes: &[u8]) -> Result<u64> {
    let Ok(raw) = <[u8; 8]>::try_from(bytes) else {
        bail!("expected 8 bytes, got {}", bytes.len());
    };
    Ok(u64::from_le_bytes(raw))
}

impl HomomorphicBackend for Additive {
    fn as_encrypted(&self, stored: &[u8]) -> Result<EncryptedValue> {
        dec(stored)?;
        Ok(EncryptedValue::from_bytes(stored.to_vec()))
    }

    fn add(&self, lhs: &EncryptedValue, rhs: &EncryptedValue) -> Result<EncryptedValue> {
        Ok(EncryptedValue::from_bytes(enc(dec(lhs)?.wrapping_add(dec(rhs)?))))
    }

    fn zero(&self) -> Result<EncryptedValue> {
        Ok(EncryptedValue::from_bytes(enc(0)))
    }
}

pub fn proof_for(request_id: RequestId, cleartexts: &[u8]) -> Vec<u8> {
    let mut preimage = request_id.to_be_bytes().to_vec();
    preimage.extend_from_slice(cleartexts);
    keccak256(preimage).to_vec()
}

/// Records dispatched requests and accepts proofs built with `proof_for`
#[derive(Clone, Default)]
pub struct RecordingAuthority {
    pub dispatched: Arc<Mutex<Vec<DecryptionRequest>>>,
    pub offline: Arc<AtomicBool>,
}

impl RecordingAuthority {
    pub fn requests(&self) -> Vec<DecryptionRequest> {
        self.dispatched
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl DecryptionAuthority for RecordingAuthority {
    fn dispatch(&mut self, request: DecryptionRequest) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("authority offline");
        }
        self.dispatched
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .push(request);
        Ok(())
    }

    fn verify_proof(&self, request_id: RequestId, cleartexts: &[u8], proof: &[u8]) -> bool {
        proof == proof_for(request_id, cleartexts).as_slice()
    }
}
