// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::Address;
use anyhow::{bail, Result};

pub fn non_zero_address(field: &str, address: &Address) -> Result<()> {
    if address.is_zero() {
        bail!("'{field}' must be set to a non zero address");
    }
    Ok(())
}

pub fn non_empty<T>(field: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        bail!("'{field}' must not be empty");
    }
    Ok(())
}

pub fn power_of_two(field: &str, value: usize) -> Result<()> {
    if !value.is_power_of_two() {
        bail!("'{field}' must be a power of two, got {value}");
    }
    Ok(())
}
