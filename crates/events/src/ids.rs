// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

/// Monotonic batch identifier. The first batch is `1`.
pub type BatchId = u64;

/// Monotonic decryption request identifier. The first request is `1`.
pub type RequestId = u64;
