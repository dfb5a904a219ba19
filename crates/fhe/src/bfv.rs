// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{build_bfv_params_arc, EncryptedValue, HomomorphicBackend};
use anyhow::{ensure, Context, Result};
use fhe::bfv::{BfvParameters, Ciphertext};
use fhe_math::rq::{Poly, Representation};
use fhe_traits::{DeserializeParametrized, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Parts in a freshly encrypted, non-multiplied ciphertext
const FRESH_PARTS: usize = 2;
/// Level of a ciphertext that has not been modulus switched
const FRESH_LEVEL: usize = 0;

/// BFV adaptor for the homomorphic backend boundary.
#[derive(Clone)]
pub struct Fhe {
    pub params: Arc<BfvParameters>,
}

impl Fhe {
    pub fn new(params: Arc<BfvParameters>) -> Self {
        Self { params }
    }

    pub fn from_raw_params(degree: usize, plaintext_modulus: u64, moduli: &[u64]) -> Result<Self> {
        Ok(Fhe::new(build_bfv_params_arc(
            degree,
            plaintext_modulus,
            moduli,
        )?))
    }

    fn ciphertext(&self, bytes: &[u8]) -> Result<Ciphertext> {
        Ciphertext::from_bytes(bytes, &self.params).context("Error deserializing ciphertext")
    }

    /// Deserialize and require the shape every stored total has
    fn fresh_ciphertext(&self, bytes: &[u8]) -> Result<Ciphertext> {
        let ct = self.ciphertext(bytes)?;
        ensure!(
            ct.c.len() == FRESH_PARTS,
            "Expected a {FRESH_PARTS} part ciphertext but got {} parts",
            ct.c.len()
        );
        ensure!(
            ct.level == FRESH_LEVEL,
            "Expected a ciphertext at level {FRESH_LEVEL} but got level {}",
            ct.level
        );
        Ok(ct)
    }
}

impl HomomorphicBackend for Fhe {
    fn as_encrypted(&self, stored: &[u8]) -> Result<EncryptedValue> {
        // Re-serialize so every stored aggregate uses the canonical encoding
        let ct = self.fresh_ciphertext(stored)?;
        Ok(EncryptedValue::from_bytes(ct.to_bytes()))
    }

    fn add(&self, lhs: &EncryptedValue, rhs: &EncryptedValue) -> Result<EncryptedValue> {
        let mut sum = self.fresh_ciphertext(lhs)?;
        let rhs = self.fresh_ciphertext(rhs)?;
        trace!(lhs_parts = sum.c.len(), rhs_parts = rhs.c.len(), "Adding ciphertexts");
        sum += &rhs;
        Ok(EncryptedValue::from_bytes(sum.to_bytes()))
    }

    /// The trivial encryption (0, 0), which decrypts to zero under every secret key
    fn zero(&self) -> Result<EncryptedValue> {
        let ctx = self.params.ctx_at_level(FRESH_LEVEL)?;
        let parts = (0..FRESH_PARTS)
            .map(|_| Poly::zero(ctx, Representation::Ntt))
            .collect();
        let ct = Ciphertext::new(parts, &self.params).context("Failed to create zero ciphertext")?;
        Ok(EncryptedValue::from_bytes(ct.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encrypt_u64, sets::SET_2048_1032193_1};
    use fhe::bfv::{Encoding, PublicKey, SecretKey};
    use fhe_traits::{FheDecoder, FheDecrypter};
    use rand::thread_rng;

    fn setup() -> Result<(Fhe, SecretKey, PublicKey)> {
        let (degree, plaintext_modulus, moduli) = SET_2048_1032193_1;
        let fhe = Fhe::from_raw_params(degree, plaintext_modulus, &moduli)?;
        let sk = SecretKey::random(&fhe.params, &mut thread_rng());
        let pk = PublicKey::new(&sk, &mut thread_rng());
        Ok((fhe, sk, pk))
    }

    fn decrypt(fhe: &Fhe, sk: &SecretKey, value: &EncryptedValue) -> Result<u64> {
        let pt = sk.try_decrypt(&fhe.ciphertext(value)?)?;
        let decoded = Vec::<u64>::try_decode(&pt, Encoding::poly())?;
        Ok(decoded[0])
    }

    /// A well formed ciphertext with three parts, the shape of an unrelinearized product
    fn three_part(fhe: &Fhe, pk: &PublicKey) -> Result<EncryptedValue> {
        let fresh = fhe.ciphertext(&encrypt_u64(&fhe.params, pk, 2, &mut thread_rng())?)?;
        let parts = vec![fresh.c[0].clone(), fresh.c[1].clone(), fresh.c[1].clone()];
        let ct = Ciphertext::new(parts, &fhe.params)?;
        Ok(EncryptedValue::from_bytes(ct.to_bytes()))
    }

    #[test]
    fn add_is_homomorphic() -> Result<()> {
        let (fhe, sk, pk) = setup()?;
        let ten = encrypt_u64(&fhe.params, &pk, 10, &mut thread_rng())?;
        let twenty = encrypt_u64(&fhe.params, &pk, 20, &mut thread_rng())?;

        let sum = fhe.add(&fhe.as_encrypted(&ten)?, &fhe.as_encrypted(&twenty)?)?;
        assert_eq!(decrypt(&fhe, &sk, &sum)?, 30);
        Ok(())
    }

    #[test]
    fn add_is_commutative_on_representation() -> Result<()> {
        let (fhe, _, pk) = setup()?;
        let a = fhe.as_encrypted(&encrypt_u64(&fhe.params, &pk, 3, &mut thread_rng())?)?;
        let b = fhe.as_encrypted(&encrypt_u64(&fhe.params, &pk, 4, &mut thread_rng())?)?;
        assert_eq!(fhe.add(&a, &b)?, fhe.add(&b, &a)?);
        Ok(())
    }

    #[test]
    fn zero_is_the_additive_identity() -> Result<()> {
        let (fhe, sk, pk) = setup()?;
        let zero = fhe.zero()?;
        assert_eq!(decrypt(&fhe, &sk, &zero)?, 0);
        assert_eq!(fhe.zero()?, zero);

        let seven = fhe.as_encrypted(&encrypt_u64(&fhe.params, &pk, 7, &mut thread_rng())?)?;
        assert_eq!(decrypt(&fhe, &sk, &fhe.add(&zero, &seven)?)?, 7);
        Ok(())
    }

    #[test]
    fn rejects_garbage() -> Result<()> {
        let (fhe, _, _) = setup()?;
        assert!(fhe.as_encrypted(&[1, 2, 3]).is_err());
        Ok(())
    }

    #[test]
    fn rejects_ciphertexts_with_extra_parts() -> Result<()> {
        let (fhe, _, pk) = setup()?;
        let product = three_part(&fhe, &pk)?;
        let err = fhe.as_encrypted(&product).unwrap_err();
        assert!(err.to_string().contains("3 parts"));

        // Mixing shapes in an addition is an error rather than a panic
        assert!(fhe.add(&fhe.zero()?, &product).is_err());
        assert!(fhe.add(&product, &fhe.zero()?).is_err());
        Ok(())
    }
}
