// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{Context, Result};
use std::str::FromStr;
use tracing::{debug, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub fn parse_level(log_level: &str) -> Result<Level> {
    Level::from_str(log_level).context(format!("Unknown log level '{log_level}'"))
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `log_level` when set. A
/// subscriber installed earlier, eg. by an embedding application, is left in place.
pub fn setup_tracing(log_level: &str) -> Result<()> {
    let level = parse_level(log_level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let installed = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init();
    if let Err(e) = installed {
        debug!("Keeping the existing tracing subscriber: {e}");
    }
    Ok(())
}
