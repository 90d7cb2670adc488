// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The scans of an experiment.

[`IexData`] knows where an experiment's files are (an [`IexConfig`]) and
keeps the scans loaded from them, keyed by scan number. Loading is done in
parallel. The loaded scans can be saved into, and restored from, a single
HDF5 file:

```text
@config         string attribute; the configuration as TOML
EA/
    EA_<n>      one group per analyser spectrum
AD/
    AD_<n>      one group per TIFF frame
```
 */

mod error;

pub use error::DatasetError;

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info, warn};
use ndarray::prelude::*;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use rayon::prelude::*;

use crate::{
    arpes::{stack_eas, NArpes, StackOptions},
    config::IexConfig,
    io::{
        ea::load_ea,
        scan_list::{dir_scan_num_list, shortlist, ScanSelection},
        tiff::load_tiff,
        NEa,
    },
    ndata::NData,
    read_hdf5::{read_string, write_string_attr},
    Axis,
};

const EA_GROUP: &str = "EA";
const AD_GROUP: &str = "AD";

/// The kinds of scan an [`IexData`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Electron analyser spectra.
    Ea,
    /// Area detector TIFF frames.
    Tiff,
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DataKind::Ea => "EA",
                DataKind::Tiff => "TIFF",
            }
        )
    }
}

/// The scans of an experiment.
#[derive(Debug, Default)]
pub struct IexData {
    pub config: IexConfig,
    ea: RwLock<BTreeMap<u32, NEa>>,
    tiff: RwLock<BTreeMap<u32, NData>>,
}

impl IexData {
    pub fn new(config: IexConfig) -> IexData {
        IexData {
            config,
            ..Default::default()
        }
    }

    /// Use the config file named by the `IEXPLOT_CONFIG` environment
    /// variable.
    pub fn new_from_env() -> Result<IexData, DatasetError> {
        Ok(Self::new(IexConfig::from_env()?))
    }

    fn prefix_ext(&self, kind: DataKind) -> (&str, &str) {
        match kind {
            DataKind::Ea => (self.config.ea_prefix.as_str(), self.config.ea_format.ext()),
            DataKind::Tiff => (self.config.tiff_prefix.as_str(), self.config.tiff_ext.as_str()),
        }
    }

    fn file_name(&self, kind: DataKind, scan: u32) -> String {
        match kind {
            DataKind::Ea => self.config.ea_file_name(scan),
            DataKind::Tiff => self.config.tiff_file_name(scan),
        }
    }

    /// The scan numbers of the files of this kind in the data directory.
    pub fn available(&self, kind: DataKind) -> Result<Vec<u32>, DatasetError> {
        let (prefix, ext) = self.prefix_ext(kind);
        dir_scan_num_list(&self.config.path, prefix, ext).map_err(|source| DatasetError::Listing {
            kind,
            path: self.config.path.display().to_string(),
            source,
        })
    }

    /// The scan numbers loaded, in ascending order.
    pub fn loaded(&self, kind: DataKind) -> Vec<u32> {
        match kind {
            DataKind::Ea => self.ea.read().keys().copied().collect(),
            DataKind::Tiff => self.tiff.read().keys().copied().collect(),
        }
    }

    /// Load the selected scans that exist in the data directory. Unless
    /// `overwrite`, scans that are already loaded are skipped. Returns the
    /// scan numbers that were loaded.
    pub fn load(
        &self,
        selection: &ScanSelection,
        kind: DataKind,
        overwrite: bool,
    ) -> Result<Vec<u32>, DatasetError> {
        let mut scans = shortlist(selection, &self.available(kind)?);
        if !overwrite {
            let loaded = self.loaded(kind);
            scans.retain(|n| loaded.binary_search(n).is_err());
        }
        if scans.is_empty() {
            warn!("No {kind} scans to load for {selection:?}");
            return Ok(scans);
        }
        debug!("Loading {kind} scans {scans:?}");

        match kind {
            DataKind::Ea => {
                let cfg = &self.config.ea;
                let loaded = scans
                    .par_iter()
                    .map(|&scan| {
                        let file = self.config.path.join(self.file_name(kind, scan));
                        load_ea(file, cfg)
                            .map(|ea| (scan, ea))
                            .map_err(|source| DatasetError::Ea { scan, source })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                self.ea.write().extend(loaded);
            }
            DataKind::Tiff => {
                let loaded = scans
                    .par_iter()
                    .map(|&scan| {
                        let file = self.config.path.join(self.file_name(kind, scan));
                        load_tiff(file, &[])
                            .map(|nd| (scan, nd))
                            .map_err(|source| DatasetError::Tiff { scan, source })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                self.tiff.write().extend(loaded);
            }
        }
        info!("Loaded {} {kind} scan(s)", scans.len());
        Ok(scans)
    }

    /// Add an already loaded spectrum, replacing any with the same scan
    /// number.
    pub fn insert_ea(&self, ea: NEa) {
        self.ea.write().insert(ea.scan_num, ea);
    }

    pub fn insert_tiff(&self, scan: u32, nd: NData) {
        self.tiff.write().insert(scan, nd);
    }

    /// A loaded analyser spectrum. Don't hold on to this while loading or
    /// removing scans; it holds a read lock on the spectra.
    pub fn ea(&self, scan: u32) -> Option<MappedRwLockReadGuard<'_, NEa>> {
        RwLockReadGuard::try_map(self.ea.read(), |m| m.get(&scan)).ok()
    }

    /// A loaded TIFF frame. The same caveat as [`IexData::ea`] applies.
    pub fn tiff(&self, scan: u32) -> Option<MappedRwLockReadGuard<'_, NData>> {
        RwLockReadGuard::try_map(self.tiff.read(), |m| m.get(&scan)).ok()
    }

    fn ea_or_err(&self, scan: u32) -> Result<MappedRwLockReadGuard<'_, NEa>, DatasetError> {
        self.ea(scan).ok_or(DatasetError::NotLoaded {
            kind: DataKind::Ea,
            scan,
        })
    }

    /// Forget the selected scans. Returns the scan numbers removed.
    pub fn remove(&self, selection: &ScanSelection, kind: DataKind) -> Vec<u32> {
        let scans = shortlist(selection, &self.loaded(kind));
        match kind {
            DataKind::Ea => {
                let mut ea = self.ea.write();
                scans.iter().for_each(|n| {
                    ea.remove(n);
                });
            }
            DataKind::Tiff => {
                let mut tiff = self.tiff.write();
                scans.iter().for_each(|n| {
                    tiff.remove(n);
                });
            }
        }
        scans
    }

    /// A summary of what's loaded.
    pub fn info(&self) -> String {
        let mut s = format!("path: {}", self.config.path.display());
        for kind in [DataKind::Ea, DataKind::Tiff] {
            let loaded = self.loaded(kind);
            if !loaded.is_empty() {
                s.push_str(&format!("\n{kind} scans loaded: {loaded:?}"));
            }
        }
        s
    }

    /// Save every loaded scan into a new HDF5 file. An existing file is
    /// overwritten.
    pub fn save<T: AsRef<Path>>(&self, file: T) -> Result<(), DatasetError> {
        let file = file.as_ref();
        if file.exists() {
            warn!("Overwriting file {}", file.display());
        }
        let h5 = hdf5::File::create(file)?;
        write_string_attr(&h5, "config", &self.config.to_toml()?)?;

        let ea_group = h5.create_group(EA_GROUP)?;
        for (n, ea) in self.ea.read().iter() {
            ea.write_group(&ea_group, &format!("EA_{n}"))
                .map_err(|source| DatasetError::Ea { scan: *n, source })?;
        }
        let ad_group = h5.create_group(AD_GROUP)?;
        for (n, nd) in self.tiff.read().iter() {
            nd.write_group(&ad_group, &format!("AD_{n}"))?;
        }
        debug!("Saved to {}: {}", file.display(), self.info());
        Ok(())
    }

    /// Restore scans saved with [`IexData::save`].
    pub fn load_file<T: AsRef<Path>>(file: T) -> Result<IexData, DatasetError> {
        // so that libhdf5 doesn't print errors to stdout
        hdf5::silence_errors(true);

        // If the file doesn't exist, hdf5::File::open will handle it, but the
        // error message is horrendous.
        let file = file.as_ref();
        if !file.exists() {
            return Err(DatasetError::FileDoesntExist(file.display().to_string()));
        }
        let h5 = hdf5::File::open(file)?;
        let config = match h5.attr("config") {
            Ok(a) => IexConfig::from_toml(&read_string(&a)?)?,
            Err(_) => IexConfig::default(),
        };
        let data = IexData::new(config);

        if let Ok(g) = h5.group(EA_GROUP) {
            for name in g.member_names()? {
                let Some(scan) = group_scan_num(&name, "EA_") else {
                    warn!("Skipping unexpected group '{name}' in {EA_GROUP}");
                    continue;
                };
                let mut ea = NEa::read_group(&g.group(&name)?)
                    .map_err(|source| DatasetError::Ea { scan, source })?;
                ea.scan_num = scan;
                data.insert_ea(ea);
            }
        }
        if let Ok(g) = h5.group(AD_GROUP) {
            for name in g.member_names()? {
                let Some(scan) = group_scan_num(&name, "AD_") else {
                    warn!("Skipping unexpected group '{name}' in {AD_GROUP}");
                    continue;
                };
                data.insert_tiff(scan, NData::read_group(&g.group(&name)?)?);
            }
        }
        debug!("Loaded {}: {}", file.display(), data.info());
        Ok(data)
    }

    /// A loaded spectrum with its energy axis in kinetic energy or, if `be`,
    /// binding energy.
    pub fn ea_spectra(&self, scan: u32, be: bool) -> Result<NData, DatasetError> {
        let mut a: NArpes = self.ea_or_err(scan)?.arpes.clone();
        if be {
            a.scale_be()?;
        } else {
            a.scale_ke()?;
        }
        Ok(a.into_ndata())
    }

    /// The EDC of a loaded spectrum as (energy, intensity).
    pub fn ea_edc(&self, scan: u32, be: bool) -> Result<(Array1<f64>, Array1<f64>), DatasetError> {
        let ea = self.ea_or_err(scan)?;
        let x = if be {
            ea.be_scale().clone()
        } else {
            &ea.ke_scale + ea.e_offset()
        };
        let y = ea
            .edc
            .data()
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(crate::ndata::NDataError::from)?
            .to_owned();
        Ok((x, y))
    }

    /// Stack the selected loaded spectra. Without a `stack_scale`, spectra
    /// are stacked against their scan numbers.
    pub fn stack_ea(
        &self,
        selection: &ScanSelection,
        stack_scale: Option<Array1<f64>>,
        stack_unit: &str,
        be: bool,
        opts: &StackOptions,
    ) -> Result<NData, DatasetError> {
        let (scans, list): (Vec<u32>, Vec<NArpes>) = {
            let ea = self.ea.read();
            let available: Vec<u32> = ea.keys().copied().collect();
            shortlist(selection, &available)
                .into_iter()
                .filter_map(|n| ea.get(&n).map(|e| (n, e.arpes.clone())))
                .unzip()
        };
        let (stack_scale, stack_unit) = match stack_scale {
            Some(s) => (s, stack_unit),
            None => (scans.iter().map(|&n| n as f64).collect(), "Scan Number"),
        };
        let mut stack = stack_eas(&list, Some(stack_scale), stack_unit, be, opts)?;
        stack.update_extras_by_key("scanNums", scans.iter().map(|&n| n as f64).collect::<Vec<_>>());
        debug!(
            "Stacked EA scans {scans:?}: {:?} along {}",
            stack.shape(),
            if opts.edc_only { Axis::Y } else { Axis::Z }
        );
        Ok(stack)
    }
}

fn group_scan_num(name: &str, prefix: &str) -> Option<u32> {
    name.strip_prefix(prefix)?.parse().ok()
}
