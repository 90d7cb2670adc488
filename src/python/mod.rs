// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Python interface to iexplot via pyo3.
 */

use std::collections::BTreeMap;
use std::path::PathBuf;

use numpy::{IntoPyArray, PyArray1, PyArrayDyn, PyReadonlyArray1, PyReadonlyArrayDyn};
use pyo3::create_exception;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::{
    arpes::ArpesError,
    config::{ConfigError, EaDetectorConfig},
    fitting::{fit as fit_rust, FitError, FitKind, FitOptions},
    io::{ea::load_ea as load_ea_rust, EaError, NEa, TiffError},
    ndata::{NData, NDataError},
    Axis,
};

// Add a python exception for iexplot.
create_exception!(iexplot, IexplotError, pyo3::exceptions::PyException);

macro_rules! into_py_err {
    ($($err:ty),+) => {
        $(
            impl std::convert::From<$err> for PyErr {
                fn from(err: $err) -> PyErr {
                    IexplotError::new_err(err.to_string())
                }
            }
        )+
    };
}
into_py_err!(NDataError, ArpesError, FitError, EaError, TiffError, ConfigError);

fn parse_axis(ax: &str) -> PyResult<Axis> {
    ax.parse().map_err(PyValueError::new_err)
}

fn parse_fit_kind(kind: &str, rank: usize) -> PyResult<FitKind> {
    match kind.to_ascii_lowercase().as_str() {
        "gaussian" => Ok(FitKind::Gaussian),
        "lorentzian" => Ok(FitKind::Lorentzian),
        "step" => Ok(FitKind::Step),
        "box" => Ok(FitKind::Box),
        "poly" => Ok(FitKind::Poly(rank)),
        _ => Err(PyValueError::new_err(format!("Unknown fit function '{kind}'"))),
    }
}

/// A labelled array of rank 1 to 3.
#[pyclass(name = "NData")]
struct PyNData {
    nd: NData,
}

#[pymethods]
impl PyNData {
    /// Wrap a numpy array. Every axis starts with an index scale.
    #[new]
    fn new(data: PyReadonlyArrayDyn<'_, f64>) -> PyResult<Self> {
        Ok(PyNData {
            nd: NData::new(data.as_array().to_owned())?,
        })
    }

    /// Read a file written by `save`.
    #[staticmethod]
    fn load(file: PathBuf) -> PyResult<Self> {
        Ok(PyNData {
            nd: NData::load(file)?,
        })
    }

    fn save(&self, file: PathBuf) -> PyResult<()> {
        Ok(self.nd.save(file)?)
    }

    #[getter]
    fn data<'py>(&self, py: Python<'py>) -> Bound<'py, PyArrayDyn<f64>> {
        self.nd.data().clone().into_pyarray_bound(py)
    }

    #[getter]
    fn shape(&self) -> Vec<usize> {
        self.nd.shape().to_vec()
    }

    /// The text rendering of each extra.
    #[getter]
    fn extras(&self) -> BTreeMap<String, String> {
        self.nd
            .extras
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    fn scale<'py>(&self, py: Python<'py>, ax: &str) -> PyResult<Bound<'py, PyArray1<f64>>> {
        Ok(self.nd.scale(parse_axis(ax)?)?.clone().into_pyarray_bound(py))
    }

    fn unit(&self, ax: &str) -> PyResult<String> {
        Ok(self.nd.unit(parse_axis(ax)?).to_string())
    }

    #[pyo3(signature = (ax, scale, unit=""))]
    fn update_ax(&mut self, ax: &str, scale: PyReadonlyArray1<'_, f64>, unit: &str) -> PyResult<()> {
        Ok(self
            .nd
            .update_ax(parse_axis(ax)?, scale.as_array().to_owned(), unit)?)
    }

    fn info(&self) -> String {
        self.nd.info()
    }

    fn __repr__(&self) -> String {
        format!("NData(shape={:?})", self.nd.shape())
    }
}

/// An electron analyser spectrum.
#[pyclass(name = "Ea")]
struct PyEa {
    ea: NEa,
}

#[pymethods]
impl PyEa {
    #[getter]
    fn scan_num(&self) -> u32 {
        self.ea.scan_num
    }

    #[getter]
    fn hv(&self) -> f64 {
        self.ea.hv()
    }

    #[getter]
    fn wk(&self) -> f64 {
        self.ea.wk()
    }

    /// The spectrum with its energy axis in kinetic energy or, if `be`,
    /// binding energy.
    #[pyo3(signature = (be=false))]
    fn spectra(&self, be: bool) -> PyResult<PyNData> {
        let mut a = self.ea.arpes.clone();
        if be {
            a.scale_be()?;
        } else {
            a.scale_ke()?;
        }
        Ok(PyNData { nd: a.into_ndata() })
    }

    /// The EDC as (energy, intensity).
    #[pyo3(signature = (be=false))]
    fn edc<'py>(
        &self,
        py: Python<'py>,
        be: bool,
    ) -> (Bound<'py, PyArray1<f64>>, Bound<'py, PyArrayDyn<f64>>) {
        let x = if be {
            self.ea.be_scale().clone()
        } else {
            &self.ea.ke_scale + self.ea.e_offset()
        };
        (
            x.into_pyarray_bound(py),
            self.ea.edc.data().clone().into_pyarray_bound(py),
        )
    }

    fn __repr__(&self) -> String {
        format!(
            "Ea(scan_num={}, shape={:?})",
            self.ea.scan_num,
            self.ea.shape()
        )
    }
}

/// Load an analyser file (h5 or nc) with the default detector geometry.
#[pyfunction]
#[pyo3(signature = (file, crop=false, raw_data=false))]
fn load_ea(file: PathBuf, crop: bool, raw_data: bool) -> PyResult<PyEa> {
    let cfg = EaDetectorConfig {
        crop,
        raw_data,
        ..Default::default()
    };
    Ok(PyEa {
        ea: load_ea_rust(file, &cfg)?,
    })
}

/// The result of a fit.
#[pyclass(name = "FitResult", get_all)]
struct PyFitResult {
    coefs: Vec<f64>,
    std_errors: Option<Vec<f64>>,
    fit_vals: BTreeMap<String, f64>,
    x_fit: Vec<f64>,
    y_fit: Vec<f64>,
}

/// Fit one of gaussian, lorentzian, step, box or poly (of `rank`) to (x, y).
#[pyfunction]
#[pyo3(signature = (x, y, kind, rank=2, xrange=None, coefs_0=None))]
fn fit(
    x: Vec<f64>,
    y: Vec<f64>,
    kind: &str,
    rank: usize,
    xrange: Option<(f64, f64)>,
    coefs_0: Option<Vec<f64>>,
) -> PyResult<PyFitResult> {
    let opts = FitOptions { xrange, coefs_0 };
    let result = fit_rust(&x, &y, parse_fit_kind(kind, rank)?, &opts)?;
    Ok(PyFitResult {
        std_errors: result.std_errors(),
        coefs: result.coefs,
        fit_vals: result.fit_vals,
        x_fit: result.x_fit.to_vec(),
        y_fit: result.y_fit.to_vec(),
    })
}

/// A Python module interfacing with the iexplot code written in Rust. This
/// module depends on and will import numpy.
#[pymodule]
fn iexplot(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    py.import_bound("numpy")?;
    m.add_class::<PyNData>()?;
    m.add_class::<PyEa>()?;
    m.add_class::<PyFitResult>()?;
    m.add_function(wrap_pyfunction!(load_ea, m)?)?;
    m.add_function(wrap_pyfunction!(fit, m)?)?;
    m.add("IexplotError", py.get_type_bound::<IexplotError>())?;

    Ok(())
}
