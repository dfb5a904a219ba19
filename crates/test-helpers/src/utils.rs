// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::Address;
use confide_utils::SharedRng;
use rand::Rng;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{fmt, EnvFilter};

pub fn rand_eth_addr(rng: &SharedRng) -> Address {
    let bytes = match rng.lock() {
        Ok(mut rng) => rng.gen::<[u8; 20]>(),
        Err(poisoned) => poisoned.into_inner().gen::<[u8; 20]>(),
    };
    Address::from(bytes)
}

/// Scoped subscriber writing through the test harness so output shows up only for failing tests
pub fn add_tracing(level: &str) -> DefaultGuard {
    tracing::subscriber::set_default(
        fmt()
            .with_env_filter(EnvFilter::new(level))
            .with_test_writer()
            .finish(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use confide_utils::create_shared_rng_from_u64;

    #[test]
    fn seeded_addresses_are_reproducible() {
        let a = rand_eth_addr(&create_shared_rng_from_u64(42));
        let b = rand_eth_addr(&create_shared_rng_from_u64(42));
        assert_eq!(a, b);
        assert!(!a.is_zero());

        let rng = create_shared_rng_from_u64(42);
        assert_ne!(rand_eth_addr(&rng), rand_eth_addr(&rng));
    }
}
