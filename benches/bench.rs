// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Benchmarks. All data is synthetic.
 */

use criterion::*;
use ndarray::prelude::*;

use iexplot::{
    fitting::{fit, FitKind, FitOptions},
    ndata::{nstack, rotate2d},
    NData,
};

fn image(ny: usize, nx: usize, offset: f64) -> NData {
    NData::new(Array2::from_shape_fn((ny, nx), |(y, x)| {
        offset + (y as f64 * 0.1).sin() * (x as f64 * 0.05).cos()
    }))
    .unwrap()
}

fn ndata(c: &mut Criterion) {
    c.bench_function("nstack 100 images", |b| {
        let list: Vec<NData> = (0..100).map(|i| image(200, 300, i as f64)).collect();
        b.iter(|| {
            nstack(&list, None, "").unwrap();
        })
    });

    c.bench_function("sum_along", |b| {
        let img = image(500, 500, 0.0);
        b.iter(|| {
            img.sum_along(iexplot::Axis::Y).unwrap();
        })
    });

    c.bench_function("rotate2d", |b| {
        let img = image(200, 200, 0.0);
        b.iter(|| {
            rotate2d(&img, 30.0, (100.0, 100.0), None, None).unwrap();
        })
    });
}

fn fitting(c: &mut Criterion) {
    let x: Vec<f64> = (0..400).map(|i| -10.0 + i as f64 * 0.05).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&x| 0.5 + 3.0 * (-(x - 1.0).powi(2) / 2.0).exp())
        .collect();

    c.bench_function("fit gaussian", |b| {
        b.iter(|| {
            fit(&x, &y, FitKind::Gaussian, &FitOptions::default()).unwrap();
        })
    });

    c.bench_function("fit poly", |b| {
        b.iter(|| {
            fit(&x, &y, FitKind::Poly(4), &FitOptions::default()).unwrap();
        })
    });
}

criterion_group!(benches, ndata, fitting);
criterion_main!(benches);
