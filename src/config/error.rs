// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Specified config file '{0}' doesn't exist")]
    FileDoesntExist(String),

    /// An error associated with the IEXPLOT_CONFIG environment variable.
    #[error("Problem with the IEXPLOT_CONFIG variable: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Couldn't parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Couldn't write config: {0}")]
    Write(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
