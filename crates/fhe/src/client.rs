// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::EncryptedValue;
use anyhow::{anyhow, Result};
use fhe::bfv::{BfvParameters, Encoding, Plaintext, PublicKey};
use fhe_traits::{FheEncoder, FheEncrypter, Serialize};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;

/// Encrypt a u64 judgment under the committee public key the way a provider would before
/// submitting it.
pub fn encrypt_u64<R: RngCore + CryptoRng>(
    params: &Arc<BfvParameters>,
    public_key: &PublicKey,
    value: u64,
    rng: &mut R,
) -> Result<EncryptedValue> {
    let pt = Plaintext::try_encode(&[value], Encoding::poly(), params)
        .map_err(|e| anyhow!("Error encoding plaintext: {e}"))?;
    let ct = public_key
        .try_encrypt(&pt, rng)
        .map_err(|e| anyhow!("Error encrypting data: {e}"))?;
    Ok(EncryptedValue::from_bytes(ct.to_bytes()))
}
