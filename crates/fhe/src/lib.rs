// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod backend;
mod bfv;
mod client;
mod params;

pub use backend::*;
pub use bfv::*;
pub use client::*;
pub use params::*;
