// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Helpers to read and write the HDF5 objects used by nData files and detector
files.

Arrays are read with `read_raw` and reshaped here, so that the version of
ndarray used by the hdf5 crate doesn't have to match ours.
 */

use std::collections::BTreeMap;

use hdf5::types::{
    FixedAscii, FixedUnicode, FloatSize, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode,
};
use ndarray::{ArrayD, IxDyn};

use crate::MetaValue;

/// Read any numeric dataset (or attribute) as `f64`s along with its shape.
pub(crate) fn read_f64_array(c: &hdf5::Container) -> hdf5::Result<ArrayD<f64>> {
    let shape = c.shape();
    let raw: Vec<f64> = c.read_raw()?;
    ArrayD::from_shape_vec(IxDyn(&shape), raw).map_err(|e| hdf5::Error::from(e.to_string()))
}

/// Write `data` as an `f32` dataset called `name` with the given shape.
pub(crate) fn write_f32_dataset(
    group: &hdf5::Group,
    name: &str,
    shape: &[usize],
    data: impl Iterator<Item = f64>,
) -> hdf5::Result<()> {
    let raw: Vec<f32> = data.map(|v| v as f32).collect();
    let ds = group.new_dataset::<f32>().shape(shape.to_vec()).create(name)?;
    ds.write_raw(&raw)?;
    Ok(())
}

pub(crate) fn write_f64_dataset(group: &hdf5::Group, name: &str, data: &[f64]) -> hdf5::Result<()> {
    let ds = group.new_dataset::<f64>().shape(data.len()).create(name)?;
    ds.write_raw(data)?;
    Ok(())
}

pub(crate) fn write_f64_scalar(group: &hdf5::Group, name: &str, value: f64) -> hdf5::Result<()> {
    let ds = group.new_dataset::<f64>().create(name)?;
    ds.write_scalar(&value)
}

fn to_unicode(value: &str) -> hdf5::Result<VarLenUnicode> {
    value
        .parse::<VarLenUnicode>()
        .map_err(|e| hdf5::Error::from(e.to_string()))
}

pub(crate) fn write_string_attr(loc: &hdf5::Location, name: &str, value: &str) -> hdf5::Result<()> {
    loc.new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&to_unicode(value)?)
}

/// Write a metadata value as an attribute. Nested values don't have an HDF5
/// representation here, so they're stored as their text rendering.
pub(crate) fn write_meta_attr(
    loc: &hdf5::Location,
    name: &str,
    value: &MetaValue,
) -> hdf5::Result<()> {
    match value {
        MetaValue::Bool(b) => loc.new_attr::<bool>().create(name)?.write_scalar(b),
        MetaValue::Int(i) => loc.new_attr::<i64>().create(name)?.write_scalar(i),
        MetaValue::Float(f) => loc.new_attr::<f64>().create(name)?.write_scalar(f),
        MetaValue::Text(s) => write_string_attr(loc, name, s),
        MetaValue::Floats(v) if !v.is_empty() => loc
            .new_attr::<f64>()
            .shape(v.len())
            .create(name)?
            .write_raw(v),
        other => write_string_attr(loc, name, &other.to_string()),
    }
}

/// Read a string out of a container holding any of HDF5's string types.
pub(crate) fn read_string(c: &hdf5::Container) -> hdf5::Result<String> {
    match c.dtype()?.to_descriptor()? {
        // read_raw rather than read_scalar, as PVs are one element arrays.
        TypeDescriptor::VarLenAscii => {
            let values: Vec<VarLenAscii> = c.read_raw()?;
            Ok(values.first().map_or_else(String::new, |v| v.as_str().to_owned()))
        }
        TypeDescriptor::VarLenUnicode => {
            let values: Vec<VarLenUnicode> = c.read_raw()?;
            Ok(values.first().map_or_else(String::new, |v| v.as_str().to_owned()))
        }
        TypeDescriptor::FixedAscii(1) | TypeDescriptor::FixedUnicode(1) => {
            Ok(read_fixed_strings(c)?.concat().trim_end().to_owned())
        }
        TypeDescriptor::FixedAscii(_) | TypeDescriptor::FixedUnicode(_) => {
            let first = read_fixed_strings(c)?.into_iter().next().unwrap_or_default();
            Ok(first.trim_end().to_owned())
        }
        other => Err(hdf5::Error::from(format!(
            "Expected a string type, got {other}"
        ))),
    }
}

/// The longest fixed-length string kept whole; longer ones are truncated.
const MAX_FIXED_STRING: usize = 1024;

/// Read fixed-length strings through a fixed-length memory type, which HDF5
/// converts to from any other fixed-length string.
fn read_fixed_strings(c: &hdf5::Container) -> hdf5::Result<Vec<String>> {
    let strings = match c.dtype()?.to_descriptor()? {
        TypeDescriptor::FixedUnicode(_) => c
            .read_raw::<FixedUnicode<MAX_FIXED_STRING>>()?
            .iter()
            .map(|s| s.as_str().trim_end_matches('\0').to_owned())
            .collect(),
        _ => c
            .read_raw::<FixedAscii<MAX_FIXED_STRING>>()?
            .iter()
            .map(|s| s.as_str().trim_end_matches('\0').to_owned())
            .collect(),
    };
    Ok(strings)
}

/// Read an attribute or a (small) dataset as a [`MetaValue`].
///
/// Single element arrays are unwrapped into scalars, as detector PVs are
/// stored as one element datasets.
pub(crate) fn read_meta(c: &hdf5::Container) -> hdf5::Result<MetaValue> {
    let descriptor = c.dtype()?.to_descriptor()?;
    let numeric = |v: Vec<f64>, integer: bool| -> MetaValue {
        if v.len() == 1 {
            if integer {
                MetaValue::Int(v[0] as i64)
            } else {
                MetaValue::Float(v[0])
            }
        } else {
            MetaValue::Floats(v)
        }
    };
    let value = match &descriptor {
        TypeDescriptor::Boolean => {
            let v: Vec<bool> = c.read_raw()?;
            match v.as_slice() {
                [b] => MetaValue::Bool(*b),
                _ => MetaValue::List(v.into_iter().map(MetaValue::Bool).collect()),
            }
        }
        TypeDescriptor::Integer(size) => {
            let v: Vec<f64> = match size {
                IntSize::U8 => c.read_raw::<i64>()?.into_iter().map(|i| i as f64).collect(),
                _ => c.read_raw::<i32>()?.into_iter().map(f64::from).collect(),
            };
            numeric(v, true)
        }
        TypeDescriptor::Unsigned(size) => {
            let v: Vec<f64> = match size {
                IntSize::U8 => c.read_raw::<u64>()?.into_iter().map(|i| i as f64).collect(),
                _ => c.read_raw::<u32>()?.into_iter().map(f64::from).collect(),
            };
            numeric(v, true)
        }
        TypeDescriptor::Float(size) => {
            let v: Vec<f64> = match size {
                FloatSize::U4 => c.read_raw::<f32>()?.into_iter().map(f64::from).collect(),
                FloatSize::U8 => c.read_raw::<f64>()?,
            };
            numeric(v, false)
        }
        TypeDescriptor::Enum(enum_type) => {
            let value: Vec<u64> = c.read_raw()?;
            let names = value
                .iter()
                .map(|&v| {
                    enum_type
                        .members
                        .iter()
                        .find(|m| m.value == v)
                        .map_or_else(|| v.to_string(), |m| m.name.clone())
                })
                .collect::<Vec<_>>();
            MetaValue::Text(names.join(","))
        }
        TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode
        | TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_) => {
            // Arrays of single characters (netCDF char variables) are one
            // string.
            let chars = matches!(
                descriptor,
                TypeDescriptor::FixedAscii(1) | TypeDescriptor::FixedUnicode(1)
            );
            if c.size() <= 1 || chars {
                MetaValue::Text(read_string(c)?)
            } else {
                read_string_array(c, &descriptor)?
            }
        }
        _ => {
            return Err(hdf5::Error::from(format!(
                "Unsupported HDF5 type: {descriptor}"
            )))
        }
    };
    Ok(value)
}

fn read_string_array(c: &hdf5::Container, descriptor: &TypeDescriptor) -> hdf5::Result<MetaValue> {
    let strings: Vec<String> = match descriptor {
        TypeDescriptor::VarLenAscii => c
            .read_raw::<VarLenAscii>()?
            .iter()
            .map(|s| s.as_str().to_owned())
            .collect(),
        TypeDescriptor::VarLenUnicode => c
            .read_raw::<VarLenUnicode>()?
            .iter()
            .map(|s| s.as_str().to_owned())
            .collect(),
        _ => read_fixed_strings(c)?,
    };
    Ok(MetaValue::List(
        strings.into_iter().map(MetaValue::Text).collect(),
    ))
}

/// Read all attributes of an HDF5 object into a map. Attributes that can't be
/// understood are logged and skipped.
pub(crate) fn read_all_attrs(loc: &hdf5::Location) -> hdf5::Result<BTreeMap<String, MetaValue>> {
    let mut map = BTreeMap::new();
    for name in loc.attr_names()? {
        let attr = loc.attr(&name)?;
        match read_meta(&attr) {
            Ok(v) => {
                map.insert(name, v);
            }
            Err(e) => log::warn!("Skipping attribute '{name}': {e}"),
        }
    }
    Ok(map)
}
