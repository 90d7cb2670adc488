// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Generic types.

use std::collections::BTreeMap;

/// A labelled axis of an [`crate::NData`].
///
/// Axes are named from the innermost outwards. The position of each axis
/// inside the underlying array depends on the rank of the data:
///
/// | rank | array order |
/// |------|-------------|
/// | 1    | `[x]`       |
/// | 2    | `[y, x]`    |
/// | 3    | `[y, x, z]` |
///
/// i.e. a volume is a stack of `(y, x)` images along its last dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// The axes that exist for data of the given rank, in array order.
    pub fn for_rank(rank: usize) -> &'static [Axis] {
        match rank {
            1 => &[Axis::X],
            2 => &[Axis::Y, Axis::X],
            3 => &[Axis::Y, Axis::X, Axis::Z],
            _ => &[],
        }
    }

    /// Where this axis lives in an array of the given rank, if it exists.
    pub fn array_index(self, rank: usize) -> Option<usize> {
        Self::for_rank(rank).iter().position(|&a| a == self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    pub fn from_name(s: &str) -> Option<Axis> {
        match s {
            "x" | "X" => Some(Axis::X),
            "y" | "Y" => Some(Axis::Y),
            "z" | "Z" => Some(Axis::Z),
            _ => None,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Axis::from_name(s.trim())
            .ok_or_else(|| format!("'{s}' isn't an axis; expected one of x, y or z"))
    }
}

/// The direction of the analyser entrance slit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlitDir {
    /// The slit is horizontal; the detector angle is along thetaX.
    H,
    /// The slit is vertical; the detector angle is along thetaY.
    #[default]
    V,
}

impl std::fmt::Display for SlitDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SlitDir::H => "H",
                SlitDir::V => "V",
            }
        )
    }
}

impl std::str::FromStr for SlitDir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "H" | "h" => Ok(SlitDir::H),
            "V" | "v" => Ok(SlitDir::V),
            _ => Err(format!("slit direction must be 'H' or 'V', got '{s}'")),
        }
    }
}

/// A metadata value, as held in the `extras` of an [`crate::NData`] or
/// read from a file header.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Floats(Vec<f64>),
    List(Vec<MetaValue>),
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    /// Get this value as a float, if it is numeric. Text is parsed, which
    /// matters for header values stored as strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            MetaValue::Int(i) => Some(*i as f64),
            MetaValue::Float(f) => Some(*f),
            MetaValue::Text(s) => s.trim().parse().ok(),
            MetaValue::Floats(v) if v.len() == 1 => Some(v[0]),
            MetaValue::List(v) if v.len() == 1 => v[0].as_f64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(i) => Some(*i),
            MetaValue::Text(s) => s.trim().parse().ok(),
            other => other.as_f64().map(|f| f.round() as i64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Float(v) => write!(f, "{v}"),
            MetaValue::Text(s) => write!(f, "{s}"),
            MetaValue::Floats(v) => write!(f, "{v:?}"),
            MetaValue::List(v) => {
                write!(f, "[")?;
                for (i, m) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{m}")?;
                }
                write!(f, "]")
            }
            MetaValue::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

macro_rules! meta_from {
    ($t:ty, $variant:ident, $conv:expr) => {
        impl From<$t> for MetaValue {
            fn from(v: $t) -> Self {
                MetaValue::$variant($conv(v))
            }
        }
    };
}

meta_from!(bool, Bool, |v| v);
meta_from!(i32, Int, i64::from);
meta_from!(i64, Int, |v| v);
meta_from!(u32, Int, i64::from);
meta_from!(usize, Int, |v: usize| v as i64);
meta_from!(f64, Float, |v| v);
meta_from!(f32, Float, f64::from);
meta_from!(String, Text, |v| v);
meta_from!(&str, Text, |v: &str| v.to_string());
meta_from!(Vec<f64>, Floats, |v| v);
meta_from!(Vec<MetaValue>, List, |v| v);
meta_from!(BTreeMap<String, MetaValue>, Map, |v| v);
