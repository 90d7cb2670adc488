// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Saving and loading [`NData`] as HDF5.
//!
//! Layout (either at the root of a file or inside a group):
//!
//! ```text
//! data            dataset, f32
//! scale/          group
//!     x, y, z     datasets, f32
//! unit/           group
//!     @x, @y, @z  string attributes
//! extras/         group
//!     @key        one attribute per metadata entry
//! ```

use std::path::Path;

use log::{debug, warn};

use super::{NData, NDataError};
use crate::{read_hdf5::*, Axis};

impl NData {
    /// Save this data into a new HDF5 file. An existing file is overwritten.
    pub fn save<T: AsRef<Path>>(&self, file: T) -> Result<(), NDataError> {
        let file = file.as_ref();
        if file.exists() {
            warn!("Overwriting file {}", file.display());
        }
        let h5 = hdf5::File::create(file)?;
        self.write_into(&h5)?;
        Ok(())
    }

    /// Load data previously written with [`NData::save`].
    pub fn load<T: AsRef<Path>>(file: T) -> Result<NData, NDataError> {
        // so that libhdf5 doesn't print errors to stdout
        hdf5::silence_errors(true);

        // If the file doesn't exist, hdf5::File::open will handle it, but the
        // error message is horrendous.
        let file = file.as_ref();
        if !file.exists() {
            return Err(NDataError::FileDoesntExist(file.display().to_string()));
        }
        let h5 = hdf5::File::open(file)?;
        let nd = NData::read_group(&h5)?;
        debug!("{}", nd.info());
        Ok(nd)
    }

    /// Write this data as a group called `name` inside `parent`. If the group
    /// already exists, it is replaced.
    pub fn write_group(&self, parent: &hdf5::Group, name: &str) -> Result<hdf5::Group, NDataError> {
        if parent.link_exists(name) {
            parent.unlink(name)?;
        }
        let g = parent.create_group(name)?;
        self.write_into(&g)?;
        Ok(g)
    }

    fn write_into(&self, g: &hdf5::Group) -> Result<(), NDataError> {
        write_f32_dataset(g, "data", self.shape(), self.data().iter().copied())?;

        let scale = g.create_group("scale")?;
        let unit = g.create_group("unit")?;
        for &ax in self.axes() {
            let s = self.scale(ax)?;
            write_f32_dataset(&scale, ax.name(), &[s.len()], s.iter().copied())?;
            write_string_attr(&unit, ax.name(), self.unit(ax))?;
        }

        let extras = g.create_group("extras")?;
        for (key, value) in self.extras.iter() {
            write_meta_attr(&extras, key, value)?;
        }
        Ok(())
    }

    /// Read data written by [`NData::write_group`] (or [`NData::save`], when
    /// given the file itself).
    pub fn read_group(g: &hdf5::Group) -> Result<NData, NDataError> {
        let data = g
            .dataset("data")
            .map_err(|_| NDataError::MissingMember("data".to_string()))?;
        let mut nd = NData::new(read_f64_array(&data)?)?;

        if let Ok(scale) = g.group("scale") {
            let unit = g.group("unit").ok();
            for name in scale.member_names()? {
                let Some(ax) = Axis::from_name(&name) else {
                    warn!("Ignoring unknown scale '{name}'");
                    continue;
                };
                let s = read_f64_array(&*scale.dataset(&name)?)?;
                let n = s.len();
                let s = s.into_shape_with_order(n)?;
                let u = match unit.as_ref().and_then(|u| u.attr(&name).ok()) {
                    Some(a) => read_string(&a)?,
                    None => String::new(),
                };
                nd.update_ax(ax, s, &u)?;
            }
        }

        if let Ok(extras) = g.group("extras") {
            nd.extras = read_all_attrs(&extras)?;
        }
        Ok(nd)
    }
}
