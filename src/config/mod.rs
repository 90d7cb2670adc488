// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Beamline configuration: where the data lives, how files are named and how the
electron analyser detector is calibrated.

Configuration is TOML. Every field is optional; missing fields take the IEX
defaults. For example:

```toml
path = "/net/s29data/export/data_29idc/2021_2/Cao/h5"
nzeros = 4

[ea]
center_channel = 521
deg_per_pix = 0.0292717
crop = true
```
 */

mod error;
#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

/// The environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "IEXPLOT_CONFIG";

/// The file format written by the analyser driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EaFormat {
    /// The current driver; HDF5.
    #[default]
    H5,
    /// The driver used before 2021; netCDF-4.
    Nc,
}

impl EaFormat {
    pub fn ext(self) -> &'static str {
        match self {
            EaFormat::H5 => "h5",
            EaFormat::Nc => "nc",
        }
    }
}

/// Calibration of the electron analyser detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EaDetectorConfig {
    /// The detector row at zero angle.
    pub center_channel: usize,
    /// The first detector row read out (non-zero when using an ROI).
    pub first_channel: usize,
    /// Angle per detector row \[degrees\].
    pub deg_per_pix: f64,
    /// First angle row kept when cropping.
    pub crop_start: usize,
    /// One past the last angle row kept when cropping.
    pub crop_stop: usize,
    /// Keep only the `crop_start..crop_stop` rows.
    pub crop: bool,
    /// Leave the data in detector pixels.
    pub raw_data: bool,
}

impl Default for EaDetectorConfig {
    fn default() -> Self {
        EaDetectorConfig {
            center_channel: 571 - 50,
            first_channel: 0,
            deg_per_pix: 0.0292717,
            crop_start: 338 - 50,
            crop_stop: 819 - 50,
            crop: false,
            raw_data: false,
        }
    }
}

impl EaDetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.deg_per_pix.is_finite() && self.deg_per_pix > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "deg_per_pix must be positive, got {}",
                self.deg_per_pix
            )));
        }
        if self.crop && self.crop_start >= self.crop_stop {
            return Err(ConfigError::Invalid(format!(
                "crop_start ({}) must be less than crop_stop ({})",
                self.crop_start, self.crop_stop
            )));
        }
        Ok(())
    }
}

/// Where the data of an experiment lives and how its files are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IexConfig {
    pub path: PathBuf,
    /// Minimum number of digits of a scan number in a file name.
    pub nzeros: usize,
    pub suffix: String,
    pub ea_prefix: String,
    pub ea_format: EaFormat,
    pub tiff_prefix: String,
    pub tiff_ext: String,
    pub ea: EaDetectorConfig,
}

impl Default for IexConfig {
    fn default() -> Self {
        IexConfig {
            path: PathBuf::from("."),
            nzeros: 4,
            suffix: String::new(),
            ea_prefix: "EA_".to_string(),
            ea_format: EaFormat::default(),
            tiff_prefix: String::new(),
            tiff_ext: "tif".to_string(),
            ea: EaDetectorConfig::default(),
        }
    }
}

impl IexConfig {
    /// Parse a TOML document.
    pub fn from_toml(s: &str) -> Result<IexConfig, ConfigError> {
        let config: IexConfig = toml::from_str(s)?;
        config.ea.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub fn from_file<T: AsRef<Path>>(file: T) -> Result<IexConfig, ConfigError> {
        let file = file.as_ref();
        if !file.exists() {
            return Err(ConfigError::FileDoesntExist(file.display().to_string()));
        }
        let config = Self::from_toml(&std::fs::read_to_string(file)?)?;
        debug!("Read config from {}: {config:?}", file.display());
        Ok(config)
    }

    /// Read the config file named by the `IEXPLOT_CONFIG` environment
    /// variable.
    pub fn from_env() -> Result<IexConfig, ConfigError> {
        let file = std::env::var(CONFIG_ENV_VAR)?;
        Self::from_file(file)
    }

    /// The name of the analyser file of a scan, e.g. `EA_0012.h5`.
    pub fn ea_file_name(&self, scan_num: u32) -> String {
        crate::io::scan_list::scan_file_name(
            &self.ea_prefix,
            scan_num,
            self.nzeros,
            &self.suffix,
            self.ea_format.ext(),
        )
    }

    pub fn tiff_file_name(&self, scan_num: u32) -> String {
        crate::io::scan_list::scan_file_name(
            &self.tiff_prefix,
            scan_num,
            self.nzeros,
            &self.suffix,
            &self.tiff_ext,
        )
    }
}
