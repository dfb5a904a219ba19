// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::load_config::locate_config;
use crate::validation::{non_empty, non_zero_address, power_of_two};
use crate::TallyConfig;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing::info;

pub const DEFAULT_CONFIG_NAME: &str = "confide.config.yaml";
pub const ENV_PREFIX: &str = "CONFIDE_";

/// Parameters of the BFV scheme used for encrypted submissions
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BfvConfig {
    pub degree: usize,
    pub plaintext_modulus: u64,
    pub moduli: Vec<u64>,
}

impl Default for BfvConfig {
    fn default() -> Self {
        Self {
            degree: 2048,
            plaintext_modulus: 1032193,
            moduli: vec![0x3FFFFFFF000001],
        }
    }
}

/// The config actually used throughout the app
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Identity tag of this deployment
    pub system_tag: Address,
    /// Initial administrator
    pub administrator: Address,
    /// Providers authorized at startup
    pub providers: Vec<Address>,
    /// Seconds between two actions of the same kind by one identity
    pub cooldown_secs: u64,
    pub bfv: BfvConfig,
    /// Default tracing level eg. "info" or "debug"
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            system_tag: Address::ZERO,
            administrator: Address::ZERO,
            providers: vec![],
            cooldown_secs: 60,
            bfv: BfvConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        non_zero_address("system_tag", &self.system_tag)?;
        non_zero_address("administrator", &self.administrator)?;
        non_empty("bfv.moduli", &self.bfv.moduli)?;
        power_of_two("bfv.degree", self.bfv.degree)?;
        Ok(())
    }

    /// The subset handed to the tally state machine
    pub fn tally_config(&self) -> TallyConfig {
        TallyConfig {
            system_tag: self.system_tag,
            administrator: self.administrator,
            providers: self.providers.clone(),
            cooldown_secs: self.cooldown_secs,
        }
    }
}

/// Layer defaults, the yaml file and `CONFIDE_` prefixed environment variables. Nested keys use a
/// double underscore eg. `CONFIDE_BFV__DEGREE`.
pub fn load_config(config_file: Option<String>) -> Result<AppConfig> {
    let source = locate_config(
        &env::current_dir()?,
        &OsDirs::config_dir(),
        DEFAULT_CONFIG_NAME,
        config_file.as_deref().map(Path::new),
    )?;
    info!(source = %source, "Loading configuration");

    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
    if let Some(path) = source.path() {
        figment = figment.merge(Yaml::file(path));
    }

    let config: AppConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("Could not parse configuration")?;

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

pub struct OsDirs;
impl OsDirs {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("confide")
    }
}
