// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use core::fmt;

/// Number of hex characters kept on either side when a blob is elided.
const ELIDE_EDGE: usize = 25;
/// Blobs with a hex representation longer than this are elided.
const ELIDE_THRESHOLD: usize = 100;

/// Write bytes as `0x`-prefixed hex, eliding the middle of large blobs such as ciphertexts.
pub fn hexf(data: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(&to_display_hex(data))
}

/// Render bytes as `0x`-prefixed hex, eliding the middle of large blobs.
pub fn to_display_hex(data: &[u8]) -> String {
    let hex = hex::encode(data);
    if hex.len() <= ELIDE_THRESHOLD {
        return format!("0x{}", hex);
    }
    let start = &hex[..ELIDE_EDGE];
    let end = &hex[hex.len() - ELIDE_EDGE..];
    format!("<bytes({}):0x{}..{}>", data.len(), start, end)
}
