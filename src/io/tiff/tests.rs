// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests for reading TIFF files. The files are made by a minimal writer.

use byteorder::{ByteOrder, WriteBytesExt};
use ndarray::array;

use super::*;
use crate::Axis;

/// (tag, type, count, value bytes)
pub(crate) type Tag = (u16, u16, u32, Vec<u8>);

/// Write pages of pixel bytes, each with its own tags. Values longer than 4
/// bytes and the pixels go after each IFD.
pub(crate) fn write_tiff<B: ByteOrder>(bom: &[u8; 2], pages: Vec<(Vec<Tag>, Vec<u8>)>) -> Vec<u8> {
    let mut out: Vec<u8> = vec![];
    out.extend_from_slice(bom);
    out.write_u16::<B>(42).unwrap();
    out.write_u32::<B>(8).unwrap();

    let n_pages = pages.len();
    for (i_page, (mut tags, pixels)) in pages.into_iter().enumerate() {
        tags.push((273, 4, 1, vec![]));
        tags.push((279, 4, 1, vec![]));
        tags.sort_by_key(|t| t.0);
        let ifd_start = out.len();
        let ifd_len = 2 + 12 * tags.len() + 4;
        let mut extra: Vec<u8> = vec![];
        let extra_start = ifd_start + ifd_len;
        let pixel_start = {
            let long: usize = tags.iter().filter(|t| t.3.len() > 4).map(|t| t.3.len()).sum();
            extra_start + long
        };

        out.write_u16::<B>(tags.len() as u16).unwrap();
        for (tag, kind, count, mut bytes) in tags {
            match tag {
                273 => {
                    bytes = vec![0; 4];
                    B::write_u32(&mut bytes, pixel_start as u32);
                }
                279 => {
                    bytes = vec![0; 4];
                    B::write_u32(&mut bytes, pixels.len() as u32);
                }
                _ => (),
            }
            out.write_u16::<B>(tag).unwrap();
            out.write_u16::<B>(kind).unwrap();
            out.write_u32::<B>(count).unwrap();
            if bytes.len() > 4 {
                out.write_u32::<B>((extra_start + extra.len()) as u32).unwrap();
                extra.extend_from_slice(&bytes);
            } else {
                bytes.resize(4, 0);
                out.extend_from_slice(&bytes);
            }
        }
        let next = if i_page + 1 == n_pages {
            0
        } else {
            pixel_start + pixels.len()
        };
        out.write_u32::<B>(next as u32).unwrap();
        out.extend_from_slice(&extra);
        out.extend_from_slice(&pixels);
    }
    out
}

fn short<B: ByteOrder>(tag: u16, v: u16) -> Tag {
    let mut b = vec![0; 2];
    B::write_u16(&mut b, v);
    (tag, 3, 1, b)
}

fn long<B: ByteOrder>(tag: u16, v: u32) -> Tag {
    let mut b = vec![0; 4];
    B::write_u32(&mut b, v);
    (tag, 4, 1, b)
}

fn ascii(tag: u16, s: &str) -> Tag {
    let mut b = s.as_bytes().to_vec();
    b.push(0);
    (tag, 2, b.len() as u32, b)
}

pub(crate) fn image_tags<B: ByteOrder>(w: u32, h: u32, bits: u16, format: u16) -> Vec<Tag> {
    vec![
        long::<B>(256, w),
        long::<B>(257, h),
        short::<B>(258, bits),
        short::<B>(259, 1),
        short::<B>(277, 1),
        long::<B>(278, h),
        short::<B>(339, format),
    ]
}

pub(crate) fn u16_pixels<B: ByteOrder>(values: &[u16]) -> Vec<u8> {
    let mut out: Vec<u8> = vec![];
    for &v in values {
        out.write_u16::<B>(v).unwrap();
    }
    out
}

#[test]
fn little_endian_pages() {
    use byteorder::LittleEndian as LE;
    let mut first = image_tags::<LE>(3, 2, 16, 1);
    first.push(ascii(306, "2024:05:01 10:00:00"));
    first.push(ascii(65010, "AcquireTime:0.5"));
    first.push(ascii(65011, "Model:Andor Zyla"));
    let buf = write_tiff::<LE>(
        b"II",
        vec![
            (first, u16_pixels::<LE>(&[1, 2, 3, 4, 5, 6])),
            (image_tags::<LE>(3, 2, 16, 1), u16_pixels::<LE>(&[10, 20, 30, 40, 50, 60])),
        ],
    );

    let (data, meta) = read_tiff(&buf).unwrap();
    assert_eq!(data.shape(), &[2, 3, 2]);
    assert_eq!(data[[0, 0, 0]], 1.0);
    assert_eq!(data[[1, 2, 0]], 6.0);
    assert_eq!(data[[0, 1, 1]], 20.0);
    assert_eq!(data[[1, 2, 1]], 60.0);

    assert_eq!(meta["ImageWidth"], MetaValue::Int(3));
    assert_eq!(meta["DateTime"], MetaValue::Text("2024:05:01 10:00:00".to_string()));
    assert_eq!(meta["AcquireTime"], MetaValue::Float(0.5));
    assert_eq!(meta["Model"], MetaValue::Text("Andor Zyla".to_string()));
    assert!(!meta.contains_key("65010"));
}

#[test]
fn private_tags_with_colons_in_the_value() {
    use byteorder::LittleEndian as LE;
    let mut tags = image_tags::<LE>(1, 1, 16, 1);
    tags.push(ascii(65010, "StartTime:12:30:05"));
    tags.push(ascii(65011, "Source:29idc:m1"));
    tags.push(ascii(65012, "Gain:2"));
    let buf = write_tiff::<LE>(b"II", vec![(tags, u16_pixels::<LE>(&[7]))]);

    let (_, meta) = read_tiff(&buf).unwrap();
    assert_eq!(meta["65010"], MetaValue::Text("StartTime:12:30:05".to_string()));
    assert_eq!(meta["65011"], MetaValue::Text("Source:29idc:m1".to_string()));
    assert_eq!(meta["Gain"], MetaValue::Int(2));
    assert!(!meta.contains_key("StartTime:12:30"));
}

#[test]
fn big_endian_single_page() {
    use byteorder::BigEndian as BE;
    let buf = write_tiff::<BE>(
        b"MM",
        vec![(image_tags::<BE>(2, 2, 16, 1), u16_pixels::<BE>(&[256, 1, 2, 3]))],
    );
    let (data, _) = read_tiff(&buf).unwrap();
    assert_eq!(data.shape(), &[2, 2]);
    assert_eq!(data.into_dimensionality::<Ix2>().unwrap(), array![[256.0, 1.0], [2.0, 3.0]]);
}

#[test]
fn float_pixels() {
    use byteorder::LittleEndian as LE;
    let mut pixels: Vec<u8> = vec![];
    for v in [0.5_f32, -1.25, 3.0] {
        pixels.write_f32::<LE>(v).unwrap();
    }
    let buf = write_tiff::<LE>(b"II", vec![(image_tags::<LE>(3, 1, 32, 3), pixels)]);
    let (data, _) = read_tiff(&buf).unwrap();
    assert_eq!(data.into_dimensionality::<Ix2>().unwrap(), array![[0.5, -1.25, 3.0]]);
}

#[test]
fn rejects_unsupported() {
    use byteorder::LittleEndian as LE;
    let mut tags = image_tags::<LE>(2, 1, 16, 1);
    tags.retain(|t| t.0 != 259);
    tags.push(short::<LE>(259, 5));
    let buf = write_tiff::<LE>(b"II", vec![(tags, u16_pixels::<LE>(&[1, 2]))]);
    assert!(matches!(read_tiff(&buf), Err(TiffError::Unsupported(_))));

    assert!(matches!(read_tiff(b"PK\x03\x04"), Err(TiffError::NotTiff)));
    assert!(matches!(read_tiff(b"II"), Err(TiffError::Truncated { .. })));
}

#[test]
fn mismatched_pages() {
    use byteorder::LittleEndian as LE;
    let buf = write_tiff::<LE>(
        b"II",
        vec![
            (image_tags::<LE>(2, 1, 16, 1), u16_pixels::<LE>(&[1, 2])),
            (image_tags::<LE>(1, 2, 16, 1), u16_pixels::<LE>(&[1, 2])),
        ],
    );
    assert!(matches!(
        read_tiff(&buf),
        Err(TiffError::PageShape {
            page: 1,
            expected: (1, 2),
            got: (2, 1)
        })
    ));
}

#[test]
fn load_from_file() {
    use byteorder::LittleEndian as LE;
    let buf = write_tiff::<LE>(
        b"II",
        vec![(image_tags::<LE>(3, 2, 16, 1), u16_pixels::<LE>(&[1, 2, 3, 4, 5, 6]))],
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Cam_0001.tif");
    std::fs::write(&path, buf).unwrap();

    let scales = [AxisScale {
        ax: Axis::X,
        scale: array![0.0, 0.5, 1.0],
        unit: "mm".to_string(),
    }];
    let nd = load_tiff(&path, &scales).unwrap();
    assert_eq!(nd.shape(), &[2, 3]);
    assert_eq!(nd.scale(Axis::X).unwrap(), &array![0.0, 0.5, 1.0]);
    assert_eq!(nd.unit(Axis::X), "mm");
    assert_eq!(nd.scale(Axis::Y).unwrap(), &array![0.0, 1.0]);
    assert_eq!(nd.extras["ImageLength"], MetaValue::Int(2));

    assert!(matches!(
        load_tiff(dir.path().join("missing.tif"), &[]),
        Err(TiffError::FileDoesntExist(_))
    ));
}

/// Overwrite the value of `tag` in the first IFD of a little-endian file.
fn patch_first_ifd(buf: &mut [u8], tag: u16, value: u32) {
    use byteorder::LittleEndian as LE;
    let n = LE::read_u16(&buf[8..10]) as usize;
    for i in 0..n {
        let entry = 10 + 12 * i;
        if LE::read_u16(&buf[entry..entry + 2]) == tag {
            LE::write_u32(&mut buf[entry + 8..entry + 12], value);
        }
    }
}

#[test]
fn malformed_sizes_are_errors() {
    use byteorder::LittleEndian as LE;

    // A strip claiming 4 GiB in a tiny file.
    let mut buf = write_tiff::<LE>(
        b"II",
        vec![(image_tags::<LE>(2, 1, 16, 1), u16_pixels::<LE>(&[1, 2]))],
    );
    patch_first_ifd(&mut buf, 279, u32::MAX);
    assert!(matches!(read_tiff(&buf), Err(TiffError::Truncated { .. })));

    // Width * height * bytes per pixel doesn't fit in a usize.
    let buf = write_tiff::<LE>(
        b"II",
        vec![(
            image_tags::<LE>(u32::MAX, u32::MAX, 64, 1),
            u16_pixels::<LE>(&[1, 2]),
        )],
    );
    assert!(matches!(read_tiff(&buf), Err(TiffError::Unsupported(_))));

    // More pixels than the file has bytes.
    let buf = write_tiff::<LE>(
        b"II",
        vec![(image_tags::<LE>(100, 100, 16, 1), u16_pixels::<LE>(&[1, 2]))],
    );
    assert!(matches!(read_tiff(&buf), Err(TiffError::Truncated { .. })));
}
