// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests for reading configuration.

use serial_test::serial;

use super::*;

#[test]
fn defaults() {
    let c = IexConfig::default();
    assert_eq!(c.ea.center_channel, 521);
    assert_eq!(c.ea.crop_start, 288);
    assert_eq!(c.ea.crop_stop, 769);
    assert_eq!(c.ea_file_name(12), "EA_0012.h5");
    assert_eq!(IexConfig::from_toml("").unwrap(), c);
}

#[test]
fn partial_toml() {
    let c = IexConfig::from_toml(
        r#"
        path = "/data/2021_2"
        tiff_prefix = "MDAscan0042_"
        ea_format = "nc"

        [ea]
        deg_per_pix = 0.03
        crop = true
        "#,
    )
    .unwrap();
    assert_eq!(c.path, PathBuf::from("/data/2021_2"));
    assert_eq!(c.ea_file_name(7), "EA_0007.nc");
    assert_eq!(c.tiff_file_name(3), "MDAscan0042_0003.tif");
    assert_eq!(c.ea.deg_per_pix, 0.03);
    assert!(c.ea.crop);
    assert_eq!(c.ea.center_channel, 521);
}

#[test]
fn invalid() {
    assert!(matches!(
        IexConfig::from_toml("nzeros = \"four\""),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        IexConfig::from_toml("[ea]\ncrop = true\ncrop_start = 10\ncrop_stop = 10"),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        IexConfig::from_toml("[ea]\ndeg_per_pix = -1.0"),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn to_toml_and_back() {
    let mut c = IexConfig::default();
    c.suffix = "_a".to_string();
    c.ea.raw_data = true;
    let s = c.to_toml().unwrap();
    assert_eq!(IexConfig::from_toml(&s).unwrap(), c);
}

#[test]
#[serial]
fn from_env() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("iexplot.toml");
    std::fs::write(&file, "nzeros = 5\n").unwrap();

    std::env::set_var(CONFIG_ENV_VAR, &file);
    let c = IexConfig::from_env().unwrap();
    assert_eq!(c.nzeros, 5);

    std::env::remove_var(CONFIG_ENV_VAR);
    assert!(matches!(IexConfig::from_env(), Err(ConfigError::EnvVar(_))));
}

#[test]
#[serial]
fn missing_file() {
    std::env::set_var(CONFIG_ENV_VAR, "/surely/not/here.toml");
    assert!(matches!(
        IexConfig::from_env(),
        Err(ConfigError::FileDoesntExist(_))
    ));
    std::env::remove_var(CONFIG_ENV_VAR);
}
