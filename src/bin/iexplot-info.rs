// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Summarise nData, analyser and TIFF files, or list the scans of an
//! experiment directory.
//!
//! `iexplot-info EA_0012.h5 Cam_0003.tif saved.h5`
//! `iexplot-info --config experiment.toml`

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use log::{debug, info};

use iexplot::{
    config::IexConfig,
    dataset::{DataKind, IexData},
    io::{load_ea, load_tiff},
    IexplotError, NData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FileKind {
    /// Guess from the file's extension and contents.
    Auto,
    NData,
    Ea,
    Tiff,
}

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Files to summarise.
    files: Vec<PathBuf>,

    /// How to read the files.
    #[arg(short, long, value_enum, default_value_t = FileKind::Auto)]
    kind: FileKind,

    /// List the scans in the data directory of this config file. Without a
    /// file, IEXPLOT_CONFIG is used if no files are given.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbosity: u8,
}

fn main() {
    let args = Args::parse();
    setup_logging(args.verbosity);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .init();
}

fn run(args: &Args) -> Result<(), IexplotError> {
    if args.config.is_some() || args.files.is_empty() {
        let config = match &args.config {
            Some(c) => IexConfig::from_file(c)?,
            None => IexConfig::from_env()?,
        };
        list_scans(IexData::new(config))?;
    }
    for file in &args.files {
        println!("{}", file.display());
        println!("{}", summarise(file, args.kind)?);
    }
    Ok(())
}

fn list_scans(data: IexData) -> Result<(), IexplotError> {
    println!("path: {}", data.config.path.display());
    for kind in [DataKind::Ea, DataKind::Tiff] {
        let scans = data.available(kind)?;
        println!("{kind} scans: {scans:?}");
    }
    Ok(())
}

fn guess_kind(file: &Path) -> FileKind {
    match file.extension().and_then(|e| e.to_str()) {
        Some("tif" | "tiff") => FileKind::Tiff,
        Some("nc") => FileKind::Ea,
        _ => FileKind::Auto,
    }
}

fn summarise(file: &Path, kind: FileKind) -> Result<String, IexplotError> {
    let kind = match kind {
        FileKind::Auto => guess_kind(file),
        k => k,
    };
    debug!("Reading {} as {kind:?}", file.display());
    let s = match kind {
        FileKind::NData => NData::load(file)?.info(),
        FileKind::Ea => ea_summary(file)?,
        FileKind::Tiff => load_tiff(file, &[])?.info(),
        // An HDF5 file; either one we wrote or an analyser file.
        FileKind::Auto => match NData::load(file) {
            Ok(nd) => nd.info(),
            Err(e) => {
                info!("{} isn't an nData file ({e}); trying it as an analyser file", file.display());
                ea_summary(file)?
            }
        },
    };
    Ok(s)
}

fn ea_summary(file: &Path) -> Result<String, IexplotError> {
    let ea = load_ea(file, &Default::default())?;
    let mut s = format!(
        "scan {}: hv = {} eV, wk = {} eV\n{}",
        ea.scan_num,
        ea.hv(),
        ea.wk(),
        ea.info()
    );
    for (k, v) in &ea.spectra_info {
        s.push_str(&format!("\n  {k}: {v}"));
    }
    Ok(s)
}
