// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod access;
mod aggregation;
mod batch;
mod coordinator;
mod decryption;
mod error;
mod rate_limiter;
mod tally;
#[cfg(test)]
mod test_utils;

pub use access::*;
pub use aggregation::*;
pub use batch::*;
pub use coordinator::*;
pub use decryption::*;
pub use error::*;
pub use rate_limiter::*;
pub use tally::*;
