// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod bfv_setup;
mod local_authority;
mod utils;

pub use bfv_setup::*;
pub use local_authority::*;
pub use utils::*;
