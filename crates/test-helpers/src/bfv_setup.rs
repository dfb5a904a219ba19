// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::LocalDecryptionAuthority;
use anyhow::{anyhow, Result};
use confide_fhe::{encrypt_u64, sets::SET_2048_1032193_1, Fhe};
use confide_utils::{ArcBytes, SharedRng};
use fhe::bfv::{Ciphertext, PublicKey, SecretKey};
use fhe_traits::{DeserializeParametrized, Serialize};
use std::sync::Arc;

/// A single key pair over the tally's BFV parameters. The secret key goes straight into a local
/// decryption authority. Stands in for the key management that lives outside the tally.
pub struct BfvSetup {
    pub fhe: Arc<Fhe>,
    pub public_key: PublicKey,
    pub authority: LocalDecryptionAuthority,
    rng: SharedRng,
}

impl BfvSetup {
    pub fn new(fhe: Arc<Fhe>, rng: &SharedRng, proof_key: [u8; 32]) -> Result<Self> {
        let mut guard = rng.lock().map_err(|_| anyhow!("rng poisoned"))?;
        let secret_key = SecretKey::random(&fhe.params, &mut *guard);
        let public_key = PublicKey::new(&secret_key, &mut *guard);
        drop(guard);
        Ok(Self {
            authority: LocalDecryptionAuthority::new(fhe.params.clone(), secret_key, proof_key),
            fhe,
            public_key,
            rng: rng.clone(),
        })
    }

    /// Key pair over the small parameter set used throughout the tests
    pub fn with_test_params(rng: &SharedRng, proof_key: [u8; 32]) -> Result<Self> {
        let (degree, plaintext_modulus, moduli) = SET_2048_1032193_1;
        let fhe = Fhe::from_raw_params(degree, plaintext_modulus, &moduli)?;
        Self::new(Arc::new(fhe), rng, proof_key)
    }

    /// Encrypt a value the way a provider would before submitting it
    pub fn encrypt(&self, value: u64) -> Result<ArcBytes> {
        let mut rng = self.rng.lock().map_err(|_| anyhow!("rng poisoned"))?;
        let encrypted = encrypt_u64(&self.fhe.params, &self.public_key, value, &mut *rng)?;
        Ok(ArcBytes::from_slice(&encrypted))
    }

    /// A well formed ciphertext with a third part, the shape an unrelinearized product has
    pub fn encrypt_with_extra_part(&self, value: u64) -> Result<ArcBytes> {
        let fresh = Ciphertext::from_bytes(&self.encrypt(value)?, &self.fhe.params)?;
        let parts = vec![fresh.c[0].clone(), fresh.c[1].clone(), fresh.c[1].clone()];
        let ct = Ciphertext::new(parts, &self.fhe.params)?;
        Ok(ArcBytes::from_bytes(ct.to_bytes()))
    }
}
