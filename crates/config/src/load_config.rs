// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{bail, Result};
use path_clean::clean;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where the configuration is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A file named by the caller
    Explicit(PathBuf),
    /// The nearest config file in the working directory or one of its ancestors
    Workspace(PathBuf),
    /// The per user configuration folder
    UserDir(PathBuf),
    /// No file at all. Defaults and environment only.
    DefaultsOnly,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(path)
            | ConfigSource::Workspace(path)
            | ConfigSource::UserDir(path) => Some(path),
            ConfigSource::DefaultsOnly => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(path) => write!(f, "explicit file {}", path.display()),
            ConfigSource::Workspace(path) => write!(f, "workspace file {}", path.display()),
            ConfigSource::UserDir(path) => write!(f, "user config {}", path.display()),
            ConfigSource::DefaultsOnly => f.write_str("defaults"),
        }
    }
}

/// Pick the configuration to load.
///
/// An explicit file is resolved against `cwd` and must exist. Without one the nearest `filename`
/// in `cwd` or its ancestors is used, then `filename` inside `user_dir`. Finding nothing is not
/// an error since every field can come from the environment.
pub fn locate_config(
    cwd: &Path,
    user_dir: &Path,
    filename: &str,
    explicit: Option<&Path>,
) -> Result<ConfigSource> {
    if let Some(file) = explicit {
        let file = clean(cwd.join(file));
        if !file.is_file() {
            bail!("Configuration file not found at {}", file.display());
        }
        return Ok(ConfigSource::Explicit(file));
    }

    if let Some(found) = cwd
        .ancestors()
        .map(|dir| dir.join(filename))
        .find(|candidate| candidate.is_file())
    {
        return Ok(ConfigSource::Workspace(found));
    }

    let in_user_dir = user_dir.join(filename);
    if in_user_dir.is_file() {
        return Ok(ConfigSource::UserDir(in_user_dir));
    }

    Ok(ConfigSource::DefaultsOnly)
}
