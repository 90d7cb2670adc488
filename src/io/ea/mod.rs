// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Code to load Scienta electron analyser ("EA") spectra.

Two file formats are supported:
- HDF5, written by the current analyser driver. The image is at
  `/entry/instrument/detector/data` and the PVs are one element datasets
  under `/entry/instrument/NDAttributes`;
- netCDF-4, written by the driver used before 2021. netCDF-4 files are HDF5
  files; the image is the variable `array_data` and each PV is a variable
  called `Attr_<PV>`.

Images are (angle, energy). The energy axis is scaled from the analyser
settings and the angle axis from the detector calibration in
[`EaDetectorConfig`].
 */

mod error;
mod h5;
mod header;
mod nc;

pub use error::EaError;
pub use header::IexHeader;

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, trace, warn};
use ndarray::prelude::*;

use crate::{
    arpes::{ArpesMetadata, NArpes},
    config::{EaDetectorConfig, EaFormat},
    constants::{ANGLE_UNIT, DEFAULT_HV, DEFAULT_WK, KE_UNIT},
    ndata::NData,
    read_hdf5::*,
    Axis, MetaValue, SlitDir,
};

/// How the analyser covers its energy window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcqMode {
    #[default]
    Swept,
    Fixed,
    BabySweep,
}

impl AcqMode {
    /// Swept = 0, Fixed = 1, Baby-Sweep = 2.
    pub fn code(self) -> i64 {
        match self {
            AcqMode::Swept => 0,
            AcqMode::Fixed => 1,
            AcqMode::BabySweep => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<AcqMode> {
        match code {
            0 => Some(AcqMode::Swept),
            1 => Some(AcqMode::Fixed),
            2 => Some(AcqMode::BabySweep),
            _ => None,
        }
    }

    /// The current driver numbers its modes differently: Fixed = 0,
    /// Baby-Sweep = 1, Sweep = 2.
    pub fn from_spectra_mode(mode: i64) -> Option<AcqMode> {
        match mode {
            0 => Some(AcqMode::Fixed),
            1 => Some(AcqMode::BabySweep),
            2 => Some(AcqMode::Swept),
            _ => None,
        }
    }
}

/// Analyser settings read from a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct EaSettings {
    pub(crate) acq_mode: AcqMode,
    pub(crate) swept_start: Option<f64>,
    pub(crate) swept_step: Option<f64>,
    pub(crate) kinetic_energy: Option<f64>,
    pub(crate) energy_per_pixel: Option<f64>,
    pub(crate) lens_mode: Option<MetaValue>,
    pub(crate) pass_energy: Option<MetaValue>,
    pub(crate) frames: Option<MetaValue>,
    pub(crate) sweeps: Option<MetaValue>,
    pub(crate) wk: Option<f64>,
}

/// What a reader gets out of a file.
#[derive(Debug)]
pub(crate) struct RawEa {
    /// (angle, energy)
    pub(crate) image: Array2<f64>,
    pub(crate) settings: EaSettings,
    /// Every PV in the file.
    pub(crate) pvs: BTreeMap<String, MetaValue>,
}

/// Where a spectrum was loaded from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileInfo {
    pub filename: String,
    pub filepath: String,
    /// The file name up to the first underscore.
    pub prefix: String,
    pub format: EaFormat,
}

/// An analyser spectrum loaded from an IEX file.
#[derive(Debug, Clone, PartialEq)]
pub struct NEa {
    pub arpes: NArpes,
    pub scan_num: u32,
    pub file_info: FileInfo,
    pub header: IexHeader,
}

impl std::ops::Deref for NEa {
    type Target = NArpes;

    fn deref(&self) -> &NArpes {
        &self.arpes
    }
}

impl std::ops::DerefMut for NEa {
    fn deref_mut(&mut self) -> &mut NArpes {
        &mut self.arpes
    }
}

impl NEa {
    /// Write this spectrum as the group `name` inside `parent`.
    pub fn write_group(&self, parent: &hdf5::Group, name: &str) -> Result<hdf5::Group, EaError> {
        let g = self.arpes.write_group(parent, name)?;
        write_meta_attr(&g, "scanNum", &MetaValue::from(self.scan_num))?;

        let info = g.create_group("fileInfo")?;
        write_string_attr(&info, "filename", &self.file_info.filename)?;
        write_string_attr(&info, "filepath", &self.file_info.filepath)?;
        write_string_attr(&info, "prefix", &self.file_info.prefix)?;
        write_string_attr(&info, "dtype", self.file_info.format.ext())?;

        let header = g.create_group("header")?;
        for (key, value) in self.header.all.iter() {
            write_meta_attr(&header, key, value)?;
        }
        Ok(g)
    }

    /// Read a spectrum written by [`NEa::write_group`].
    pub fn read_group(g: &hdf5::Group) -> Result<NEa, EaError> {
        let arpes = NArpes::read_group(g)?;
        let scan_num = match g.attr("scanNum") {
            Ok(a) => read_meta(&a)?.as_i64().unwrap_or(0) as u32,
            Err(_) => 0,
        };

        let mut file_info = FileInfo::default();
        if let Ok(info) = g.group("fileInfo") {
            let attrs = read_all_attrs(&info)?;
            let text = |k: &str| {
                attrs
                    .get(k)
                    .and_then(MetaValue::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            file_info.filename = text("filename");
            file_info.filepath = text("filepath");
            file_info.prefix = text("prefix");
            if text("dtype") == "nc" {
                file_info.format = EaFormat::Nc;
            }
        }

        let pvs = match g.group("header") {
            Ok(h) => read_all_attrs(&h)?,
            Err(_) => BTreeMap::new(),
        };
        let mut header = IexHeader::from_pvs(pvs);
        header.ea_settings = arpes.spectra_info.clone();
        Ok(NEa {
            arpes,
            scan_num,
            file_info,
            header,
        })
    }
}

/// The first value of a PV recorded for every frame.
fn first_value(v: MetaValue) -> MetaValue {
    match v {
        MetaValue::Floats(f) if !f.is_empty() => MetaValue::Float(f[0]),
        MetaValue::List(mut l) if !l.is_empty() => l.swap_remove(0),
        other => other,
    }
}

/// Read every dataset in `group` whose name starts with `prefix` as a PV,
/// keyed by the rest of its name. Datasets that aren't PVs are skipped.
pub(crate) fn read_pvs(group: &hdf5::Group, prefix: &str) -> Result<BTreeMap<String, MetaValue>, EaError> {
    let mut pvs = BTreeMap::new();
    for name in group.member_names()? {
        let Some(key) = name.strip_prefix(prefix) else {
            continue;
        };
        let Ok(ds) = group.dataset(&name) else {
            continue;
        };
        match read_meta(&ds) {
            Ok(v) => {
                pvs.insert(key.to_string(), first_value(v));
            }
            Err(e) => trace!("Skipping PV '{name}': {e}"),
        }
    }
    Ok(pvs)
}

/// The kinetic energy of each of `n` energy pixels.
pub(crate) fn energy_scale(s: &EaSettings, n: usize) -> Result<Array1<f64>, EaError> {
    let (start, step) = match s.acq_mode {
        AcqMode::Swept => {
            let start = s.swept_start.ok_or(EaError::MissingPv("sweptStart"))?;
            let step = s.swept_step.ok_or(EaError::MissingPv("sweptStep"))?;
            (start, step)
        }
        AcqMode::Fixed | AcqMode::BabySweep => {
            let ke = s.kinetic_energy.ok_or(EaError::MissingPv("kineticEnergy"))?;
            let step = s
                .energy_per_pixel
                .ok_or(EaError::MissingPv("energyPerPixel"))?;
            (ke - (n as f64 / 2.0) * step, step)
        }
    };
    Ok(Array1::from_shape_fn(n, |i| start + step * i as f64))
}

/// The angle of each of `n` detector rows, starting from the first row read.
pub(crate) fn angle_scale(cfg: &EaDetectorConfig, n: usize) -> Array1<f64> {
    let mut first = cfg.first_channel as f64;
    if cfg.crop {
        first += cfg.crop_start as f64;
    }
    let start = (first - cfg.center_channel as f64) * cfg.deg_per_pix;
    Array1::from_shape_fn(n, |i| start + cfg.deg_per_pix * i as f64)
}

fn spectra_info(
    s: &EaSettings,
    n_energy: usize,
    ses_slit: Option<&MetaValue>,
) -> BTreeMap<String, MetaValue> {
    let mut info = BTreeMap::new();
    for (key, value) in [
        ("lensMode", &s.lens_mode),
        ("passEnergy", &s.pass_energy),
        ("frames", &s.frames),
        ("sweeps", &s.sweeps),
    ] {
        if let Some(v) = value {
            info.insert(key.to_string(), v.clone());
        }
    }
    info.insert("acqMode".to_string(), s.acq_mode.code().into());
    match s.acq_mode {
        AcqMode::Swept => {
            if let (Some(start), Some(step)) = (s.swept_start, s.swept_step) {
                info.insert("sweptStart".to_string(), start.into());
                info.insert(
                    "sweptStop".to_string(),
                    (start + step * n_energy as f64).into(),
                );
                info.insert("sweptStep".to_string(), step.into());
            }
        }
        AcqMode::Fixed | AcqMode::BabySweep => {
            if let Some(ke) = s.kinetic_energy {
                info.insert("kineticEnergy".to_string(), ke.into());
            }
        }
    }
    if let Some(slit) = ses_slit {
        info.insert("SESslit".to_string(), slit.clone());
    }
    info
}

/// The scan number in a file name: the last run of digits before the
/// extension, e.g. 12 for `EA_0012.h5`.
pub fn scan_num_from_path(filename: &str) -> Option<u32> {
    let stem = filename.split('.').next().unwrap_or(filename);
    stem.rsplit(|c: char| !c.is_ascii_digit())
        .find(|digits| !digits.is_empty())?
        .parse()
        .ok()
}

fn file_info(file: &Path, format: EaFormat) -> FileInfo {
    let filename = file
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let filepath = file
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let prefix = filename.split('_').next().unwrap_or_default().to_string();
    FileInfo {
        filename,
        filepath,
        prefix,
        format,
    }
}

/// Load an analyser spectrum. The format is chosen by the file extension
/// (`h5` or `nc`).
pub fn load_ea<T: AsRef<Path>>(file: T, cfg: &EaDetectorConfig) -> Result<NEa, EaError> {
    // so that libhdf5 doesn't print errors to stdout
    hdf5::silence_errors(true);
    cfg.validate()?;

    // If the file doesn't exist, hdf5::File::open will handle it, but the
    // error message is horrendous.
    let file = file.as_ref();
    if !file.exists() {
        return Err(EaError::FileDoesntExist(file.display().to_string()));
    }
    let ext = file
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = match ext.as_str() {
        "h5" => EaFormat::H5,
        "nc" => EaFormat::Nc,
        _ => return Err(EaError::UnknownFormat(ext)),
    };
    let info = file_info(file, format);
    let scan_num =
        scan_num_from_path(&info.filename).ok_or_else(|| EaError::ScanNum(info.filename.clone()))?;

    let f = hdf5::File::open(file)?;
    let raw = match format {
        EaFormat::H5 => h5::read(&f)?,
        EaFormat::Nc => nc::read(&f)?,
    };
    debug!(
        "{}: {:?} image, {:?}",
        info.filename,
        raw.image.dim(),
        raw.settings.acq_mode
    );
    from_raw(raw, cfg, scan_num, info)
}

pub(crate) fn from_raw(
    raw: RawEa,
    cfg: &EaDetectorConfig,
    scan_num: u32,
    file_info: FileInfo,
) -> Result<NEa, EaError> {
    let RawEa {
        image,
        settings,
        pvs,
    } = raw;

    let image = if cfg.crop {
        let rows = image.nrows();
        if cfg.crop_stop > rows || cfg.crop_start >= cfg.crop_stop {
            return Err(EaError::Crop {
                start: cfg.crop_start,
                stop: cfg.crop_stop,
                rows,
            });
        }
        image.slice(s![cfg.crop_start..cfg.crop_stop, ..]).to_owned()
    } else {
        image
    };
    let (n_angle, n_energy) = image.dim();

    let mut nd = NData::new(image)?;
    if !cfg.raw_data {
        nd.update_ax(Axis::X, energy_scale(&settings, n_energy)?, KE_UNIT)?;
        nd.update_ax(Axis::Y, angle_scale(cfg, n_angle), ANGLE_UNIT)?;
    }

    let mut header = IexHeader::from_pvs(pvs);
    let info = spectra_info(&settings, n_energy, header.ses_slit());
    header.ea_settings = info.clone();

    let hv = header.hv().unwrap_or_else(|| {
        warn!("Scan {scan_num}: no photon energy recorded; using {DEFAULT_HV} eV");
        DEFAULT_HV
    });
    let wk = settings.wk.unwrap_or_else(|| {
        warn!("Scan {scan_num}: no work function recorded; using {DEFAULT_WK} eV");
        DEFAULT_WK
    });
    let meta = ArpesMetadata {
        slit_dir: SlitDir::V,
        theta_x: header.theta().unwrap_or(0.0),
        theta_y: header.chi().unwrap_or(0.0),
        hv,
        wk,
        spectra_info: info,
        ..Default::default()
    };
    nd.update_extras_by_key("scanNum", scan_num);
    nd.update_extras_by_key("fpath", format!("{}/{}", file_info.filepath, file_info.filename));

    let arpes = NArpes::from_ndata(nd, meta)?;
    Ok(NEa {
        arpes,
        scan_num,
        file_info,
        header,
    })
}
