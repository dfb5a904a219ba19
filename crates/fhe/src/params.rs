// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{anyhow, Result};
use fhe::bfv::{BfvParameters, BfvParametersBuilder};
use std::sync::Arc;

pub mod sets {
    /// Small insecure set suitable for tests and demos
    pub const SET_2048_1032193_1: (usize, u64, [u64; 1]) = (
        2048,               // degree
        1032193,            // plaintext_modulus
        [0x3FFFFFFF000001], // moduli
    );
}

/// Builds BFV parameters wrapped in an Arc.
pub fn build_bfv_params_arc(
    degree: usize,
    plaintext_modulus: u64,
    moduli: &[u64],
) -> Result<Arc<BfvParameters>> {
    BfvParametersBuilder::new()
        .set_degree(degree)
        .set_plaintext_modulus(plaintext_modulus)
        .set_moduli(moduli)
        .build_arc()
        .map_err(|e| anyhow!("Failed to build BFV parameters: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_default_set() -> Result<()> {
        let (degree, plaintext_modulus, moduli) = sets::SET_2048_1032193_1;
        let params = build_bfv_params_arc(degree, plaintext_modulus, &moduli)?;
        assert_eq!(params.degree(), degree);
        assert_eq!(params.plaintext(), plaintext_modulus);
        Ok(())
    }

    #[test]
    fn rejects_bad_degree() {
        assert!(build_bfv_params_arc(3, 1032193, &[0x3FFFFFFF000001]).is_err());
    }
}
