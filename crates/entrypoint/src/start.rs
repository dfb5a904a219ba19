// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::Addr;
use anyhow::{ensure, Context, Result};
use confide_aggregator::{DecryptionAuthority, TallyCoordinator};
use confide_config::{load_config, AppConfig, BfvConfig};
use confide_events::{EventBus, TallyEvent};
use confide_fhe::Fhe;
use confide_logger::{setup_tracing, SimpleLogger};
use std::sync::Arc;
use tracing::info;

/// Handles to a started tally
pub struct TallyNode {
    pub bus: Addr<EventBus<TallyEvent>>,
    pub tally: Addr<TallyCoordinator>,
    pub fhe: Arc<Fhe>,
}

/// Load the configuration and install logging at its level
pub fn bootstrap(config_file: Option<String>) -> Result<AppConfig> {
    let config = load_config(config_file)?;
    setup_tracing(&config.log_level)?;
    Ok(config)
}

pub fn build_fhe(bfv: &BfvConfig) -> Result<Arc<Fhe>> {
    let fhe = Fhe::from_raw_params(bfv.degree, bfv.plaintext_modulus, &bfv.moduli)
        .context("Invalid bfv configuration")?;
    Ok(Arc::new(fhe))
}

/// Start the coordinator on `bus` with a logger attached. Anything that needs the setup events
/// (provider registrations, the first batch) must subscribe to `bus` before this is called.
pub fn execute(
    config: &AppConfig,
    fhe: Arc<Fhe>,
    authority: Box<dyn DecryptionAuthority>,
    bus: &Addr<EventBus<TallyEvent>>,
) -> Result<TallyNode> {
    config.validate()?;
    ensure!(
        fhe.params.degree() == config.bfv.degree
            && fhe.params.plaintext() == config.bfv.plaintext_modulus
            && fhe.params.moduli() == config.bfv.moduli.as_slice(),
        "BFV parameters do not match the bfv configuration"
    );

    SimpleLogger::<TallyEvent>::attach("tally", bus.clone());
    let tally = TallyCoordinator::attach(&config.tally_config(), fhe.clone(), authority, bus)?;
    info!(
        system_tag = %config.system_tag,
        degree = config.bfv.degree,
        "Tally is running"
    );

    Ok(TallyNode {
        bus: bus.clone(),
        tally,
        fhe,
    })
}
