// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Code to read area detector TIFF frames.

Only baseline, uncompressed, single sample per pixel images are supported,
which is what the areaDetector TIFF plugin writes. Pixels may be 8, 16, 32 or
64-bit unsigned or signed integers, or 32 or 64-bit floats. Every tag of the
first page is kept as metadata; areaDetector stores its attributes in
private ASCII tags as `name:value`, which are split into a key and a value.
 */

mod error;
#[cfg(test)]
pub(crate) mod tests;

pub use error::TiffError;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, trace};
use ndarray::prelude::*;

use crate::{ndata::NData, Axis, MetaValue};

/// Tags from here on are private (vendor) tags.
const FIRST_PRIVATE_TAG: u16 = 32768;

const IMAGE_WIDTH: u16 = 256;
const IMAGE_LENGTH: u16 = 257;
const BITS_PER_SAMPLE: u16 = 258;
const COMPRESSION: u16 = 259;
const STRIP_OFFSETS: u16 = 273;
const SAMPLES_PER_PIXEL: u16 = 277;
const STRIP_BYTE_COUNTS: u16 = 279;
const SAMPLE_FORMAT: u16 = 339;

fn tag_name(tag: u16) -> Option<&'static str> {
    let name = match tag {
        254 => "NewSubfileType",
        256 => "ImageWidth",
        257 => "ImageLength",
        258 => "BitsPerSample",
        259 => "Compression",
        262 => "PhotometricInterpretation",
        270 => "ImageDescription",
        271 => "Make",
        272 => "Model",
        273 => "StripOffsets",
        274 => "Orientation",
        277 => "SamplesPerPixel",
        278 => "RowsPerStrip",
        279 => "StripByteCounts",
        282 => "XResolution",
        283 => "YResolution",
        284 => "PlanarConfiguration",
        296 => "ResolutionUnit",
        305 => "Software",
        306 => "DateTime",
        339 => "SampleFormat",
        _ => return None,
    };
    Some(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

macro_rules! endian_read {
    ($name:ident, $t:ty) => {
        fn $name(self, b: &[u8]) -> $t {
            match self {
                Endian::Little => LittleEndian::$name(b),
                Endian::Big => BigEndian::$name(b),
            }
        }
    };
}

impl Endian {
    endian_read!(read_u16, u16);
    endian_read!(read_u32, u32);
    endian_read!(read_u64, u64);
    endian_read!(read_i16, i16);
    endian_read!(read_i32, i32);
    endian_read!(read_i64, i64);
    endian_read!(read_f32, f32);
    endian_read!(read_f64, f64);
}

/// The size in bytes of one value of a TIFF field type.
fn type_size(kind: u16) -> Option<usize> {
    match kind {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 | 13 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}

/// One IFD entry.
#[derive(Debug, Clone, Copy)]
struct Entry {
    tag: u16,
    kind: u16,
    count: usize,
    /// Where the entry's 4 byte value/offset field starts.
    field: usize,
}

struct Reader<'a> {
    buf: &'a [u8],
    endian: Endian,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Result<Reader<'a>, TiffError> {
        let endian = match buf.get(0..2) {
            Some(b"II") => Endian::Little,
            Some(b"MM") => Endian::Big,
            _ => return Err(TiffError::NotTiff),
        };
        let reader = Reader { buf, endian };
        match reader.u16_at(2)? {
            42 => Ok(reader),
            43 => Err(TiffError::Unsupported("BigTIFF".to_string())),
            _ => Err(TiffError::NotTiff),
        }
    }

    fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], TiffError> {
        offset
            .checked_add(len)
            .and_then(|end| self.buf.get(offset..end))
            .ok_or(TiffError::Truncated { offset, len })
    }

    fn u16_at(&self, offset: usize) -> Result<u16, TiffError> {
        Ok(self.endian.read_u16(self.bytes(offset, 2)?))
    }

    fn u32_at(&self, offset: usize) -> Result<u32, TiffError> {
        Ok(self.endian.read_u32(self.bytes(offset, 4)?))
    }

    /// The entries of the IFD at `offset`, and the offset of the next IFD.
    fn ifd(&self, offset: usize) -> Result<(Vec<Entry>, usize), TiffError> {
        let n = self.u16_at(offset)? as usize;
        let entries = (0..n)
            .map(|i| {
                let start = offset + 2 + 12 * i;
                Ok(Entry {
                    tag: self.u16_at(start)?,
                    kind: self.u16_at(start + 2)?,
                    count: self.u32_at(start + 4)? as usize,
                    field: start + 8,
                })
            })
            .collect::<Result<Vec<_>, TiffError>>()?;
        let next = self.u32_at(offset + 2 + 12 * n)? as usize;
        Ok((entries, next))
    }

    /// The raw bytes of an entry's values; values of 4 bytes or fewer are
    /// stored in the entry itself.
    fn entry_bytes(&self, e: &Entry) -> Result<Option<&'a [u8]>, TiffError> {
        let Some(size) = type_size(e.kind) else {
            return Ok(None);
        };
        let len = size * e.count;
        if len <= 4 {
            Ok(Some(self.bytes(e.field, len)?))
        } else {
            let offset = self.u32_at(e.field)? as usize;
            Ok(Some(self.bytes(offset, len)?))
        }
    }

    /// An entry's values as numbers.
    fn numbers(&self, e: &Entry) -> Result<Vec<f64>, TiffError> {
        let Some(b) = self.entry_bytes(e)? else {
            return Ok(vec![]);
        };
        let endian = self.endian;
        let v = match e.kind {
            1 | 7 => b.iter().map(|&v| f64::from(v)).collect(),
            6 => b.iter().map(|&v| f64::from(v as i8)).collect(),
            3 => b.chunks_exact(2).map(|c| f64::from(endian.read_u16(c))).collect(),
            8 => b.chunks_exact(2).map(|c| f64::from(endian.read_i16(c))).collect(),
            4 | 13 => b.chunks_exact(4).map(|c| f64::from(endian.read_u32(c))).collect(),
            9 => b.chunks_exact(4).map(|c| f64::from(endian.read_i32(c))).collect(),
            5 => b
                .chunks_exact(8)
                .map(|c| f64::from(endian.read_u32(&c[..4])) / f64::from(endian.read_u32(&c[4..])))
                .collect(),
            10 => b
                .chunks_exact(8)
                .map(|c| f64::from(endian.read_i32(&c[..4])) / f64::from(endian.read_i32(&c[4..])))
                .collect(),
            11 => b.chunks_exact(4).map(|c| f64::from(endian.read_f32(c))).collect(),
            12 => b.chunks_exact(8).map(|c| endian.read_f64(c)).collect(),
            _ => vec![],
        };
        Ok(v)
    }

    fn text(&self, e: &Entry) -> Result<String, TiffError> {
        let b = self.entry_bytes(e)?.unwrap_or_default();
        Ok(String::from_utf8_lossy(b)
            .trim_end_matches('\0')
            .to_string())
    }

    /// An entry as a metadata (key, value) pair.
    fn meta(&self, e: &Entry) -> Result<(String, MetaValue), TiffError> {
        let key = tag_name(e.tag).map_or_else(|| e.tag.to_string(), str::to_string);
        if e.kind == 2 {
            let text = self.text(e)?;
            // Only "name:value"; values with colons of their own stay whole.
            if e.tag >= FIRST_PRIVATE_TAG && text.matches(':').count() == 1 {
                if let Some((k, v)) = text.split_once(':') {
                    return Ok((k.to_string(), parse_ad_value(v)));
                }
            }
            return Ok((key, MetaValue::Text(text)));
        }
        let numbers = self.numbers(e)?;
        let integer = !matches!(e.kind, 5 | 10 | 11 | 12);
        let value = match numbers.as_slice() {
            [v] if integer => MetaValue::Int(*v as i64),
            [v] => MetaValue::Float(*v),
            _ => MetaValue::Floats(numbers),
        };
        Ok((key, value))
    }
}

/// areaDetector attribute values are text; keep numbers as numbers.
fn parse_ad_value(v: &str) -> MetaValue {
    let v = v.trim();
    if let Ok(i) = v.parse::<i64>() {
        MetaValue::Int(i)
    } else if let Ok(f) = v.parse::<f64>() {
        MetaValue::Float(f)
    } else {
        MetaValue::Text(v.to_string())
    }
}

/// The pixels of one page, row major.
fn read_page(r: &Reader, entries: &[Entry], page: usize) -> Result<(usize, usize, Vec<f64>), TiffError> {
    let find = |tag: u16, name: &'static str| {
        entries
            .iter()
            .find(|e| e.tag == tag)
            .ok_or(TiffError::MissingTag { page, tag: name })
    };
    let first_number = |tag: u16, name: &'static str| -> Result<usize, TiffError> {
        let values = r.numbers(find(tag, name)?)?;
        values
            .first()
            .map(|&v| v as usize)
            .ok_or(TiffError::MissingTag { page, tag: name })
    };
    let optional_number = |tag: u16, default: usize| -> Result<usize, TiffError> {
        match entries.iter().find(|e| e.tag == tag) {
            Some(e) => Ok(r.numbers(e)?.first().map_or(default, |&v| v as usize)),
            None => Ok(default),
        }
    };

    let width = first_number(IMAGE_WIDTH, "ImageWidth")?;
    let height = first_number(IMAGE_LENGTH, "ImageLength")?;
    let bits = optional_number(BITS_PER_SAMPLE, 1)?;
    let compression = optional_number(COMPRESSION, 1)?;
    let samples = optional_number(SAMPLES_PER_PIXEL, 1)?;
    let format = optional_number(SAMPLE_FORMAT, 1)?;
    if compression != 1 {
        return Err(TiffError::Unsupported(format!("compression scheme {compression}")));
    }
    if samples != 1 {
        return Err(TiffError::Unsupported(format!("{samples} samples per pixel")));
    }

    let offsets = r.numbers(find(STRIP_OFFSETS, "StripOffsets")?)?;
    let counts = r.numbers(find(STRIP_BYTE_COUNTS, "StripByteCounts")?)?;
    let bytes_per_pixel = bits / 8;
    let len = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(bytes_per_pixel))
        .ok_or_else(|| {
            TiffError::Unsupported(format!("{width}x{height} pixels of {bits} bits"))
        })?;
    // No page can hold more pixel bytes than the file does.
    let mut raw = Vec::with_capacity(len.min(r.buf.len()));
    for (&offset, &count) in offsets.iter().zip(&counts) {
        if raw.len() >= len {
            break;
        }
        raw.extend_from_slice(r.bytes(offset as usize, count as usize)?);
    }
    if raw.len() < len {
        return Err(TiffError::Truncated {
            offset: offsets.first().map_or(0, |&o| o as usize),
            len,
        });
    }
    let e = r.endian;
    let pixels = raw[..len].chunks_exact(bytes_per_pixel.max(1));
    let values: Vec<f64> = match (format, bits) {
        (1, 8) => pixels.map(|c| f64::from(c[0])).collect(),
        (2, 8) => pixels.map(|c| f64::from(c[0] as i8)).collect(),
        (1, 16) => pixels.map(|c| f64::from(e.read_u16(c))).collect(),
        (2, 16) => pixels.map(|c| f64::from(e.read_i16(c))).collect(),
        (1, 32) => pixels.map(|c| f64::from(e.read_u32(c))).collect(),
        (2, 32) => pixels.map(|c| f64::from(e.read_i32(c))).collect(),
        (1, 64) => pixels.map(|c| e.read_u64(c) as f64).collect(),
        (2, 64) => pixels.map(|c| e.read_i64(c) as f64).collect(),
        (3, 32) => pixels.map(|c| f64::from(e.read_f32(c))).collect(),
        (3, 64) => pixels.map(|c| e.read_f64(c)).collect(),
        _ => {
            return Err(TiffError::Unsupported(format!(
                "{bits}-bit pixels with sample format {format}"
            )))
        }
    };
    Ok((height, width, values))
}

/// Decode a TIFF file held in memory. A single page gives a (y, x) image;
/// several pages give a (y, x, page) volume.
pub fn read_tiff(buf: &[u8]) -> Result<(ArrayD<f64>, BTreeMap<String, MetaValue>), TiffError> {
    let r = Reader::new(buf)?;
    let mut offset = r.u32_at(4)? as usize;
    let mut seen = HashSet::new();
    let mut pages = vec![];
    let mut meta = BTreeMap::new();

    while offset != 0 && seen.insert(offset) {
        let (entries, next) = r.ifd(offset)?;
        if pages.is_empty() {
            for e in &entries {
                let (k, v) = r.meta(e)?;
                trace!("{k}: {v}");
                meta.insert(k, v);
            }
        }
        let page = read_page(&r, &entries, pages.len())?;
        if let Some((h0, w0, _)) = pages.first() {
            if (page.0, page.1) != (*h0, *w0) {
                return Err(TiffError::PageShape {
                    page: pages.len(),
                    expected: (*h0, *w0),
                    got: (page.0, page.1),
                });
            }
        }
        pages.push(page);
        offset = next;
    }

    let Some(&(height, width, _)) = pages.first() else {
        return Err(TiffError::NotTiff);
    };
    debug!("TIFF: {} page(s) of {height} x {width}", pages.len());
    let data = if pages.len() == 1 {
        let (_, _, values) = pages.remove(0);
        Array2::from_shape_vec((height, width), values)?.into_dyn()
    } else {
        let n_pages = pages.len();
        let mut vol = Array3::zeros((height, width, n_pages));
        for (k, (_, _, values)) in pages.into_iter().enumerate() {
            let img = Array2::from_shape_vec((height, width), values)?;
            vol.index_axis_mut(ndarray::Axis(2), k).assign(&img);
        }
        vol.into_dyn()
    };
    Ok((data, meta))
}

/// A replacement scale for one axis of a loaded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisScale {
    pub ax: Axis,
    pub scale: Array1<f64>,
    pub unit: String,
}

/// Load an area detector TIFF file as `NData`, with the tags as metadata.
pub fn load_tiff<T: AsRef<Path>>(file: T, scales: &[AxisScale]) -> Result<NData, TiffError> {
    let file = file.as_ref();
    if !file.exists() {
        return Err(TiffError::FileDoesntExist(file.display().to_string()));
    }
    let buf = std::fs::read(file)?;
    let (data, meta) = read_tiff(&buf)?;
    let mut nd = NData::new(data)?;
    nd.update_extras(meta);
    nd.update_extras_by_key("fpath", file.display().to_string());
    for s in scales {
        nd.update_ax(s.ax, s.scale.clone(), &s.unit)?;
    }
    Ok(nd)
}
