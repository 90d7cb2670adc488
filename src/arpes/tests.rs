// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests for ARPES data and momentum conversion.

use super::*;
use crate::{constants::*, ndata::NData, Axis, MetaValue};
use approx::*;
use ndarray::{array, Array1, Array2, Array3};

/// A spectrum of ones.
fn spectrum(ke: Array1<f64>, angles: Array1<f64>, hv: f64) -> NArpes {
    let data = Array2::from_elem((angles.len(), ke.len()), 1.0);
    let nd = NData::new(data)
        .unwrap()
        .with_ax(Axis::X, ke, KE_UNIT)
        .unwrap()
        .with_ax(Axis::Y, angles, ANGLE_UNIT)
        .unwrap();
    NArpes::from_ndata(
        nd,
        ArpesMetadata {
            hv,
            wk: 4.0,
            ..Default::default()
        },
    )
    .unwrap()
}

#[test]
fn test_theta_to_k() {
    assert_abs_diff_eq!(theta_to_kx(100.0, 0.0), 0.0);
    assert_abs_diff_eq!(theta_to_kx(100.0, 30.0), k_factor() * 5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(
        theta_to_ky(100.0, 60.0, 30.0),
        k_factor() * 2.5,
        epsilon = 1e-12
    );
}

#[test]
fn test_k_to_theta_inverts_theta_to_k() {
    let (ke, tx, ty) = (50.0, 12.0, -7.0);
    let kx = theta_to_kx(ke, tx);
    let ky = theta_to_ky(ke, tx, ty);
    assert_abs_diff_eq!(k_to_theta_x(ke, kx), tx, epsilon = 1e-10);
    assert_abs_diff_eq!(k_to_theta_y(ke, kx, ky), ty, epsilon = 1e-10);
    // Unreachable momentum.
    assert!(k_to_theta_x(ke, 100.0).is_nan());
}

#[test]
fn test_kz() {
    // At normal emission all of the momentum is out of plane.
    let c = k_factor();
    assert_abs_diff_eq!(
        theta_to_kz(90.0, 0.0, 0.0, 10.0),
        c * 100f64.sqrt(),
        epsilon = 1e-12
    );
    let kx = 1.0;
    let expected = (c * c * 60.0 - 1.0).sqrt();
    assert_abs_diff_eq!(k_to_kz(kx, 0.0, 50.0, 10.0), expected, epsilon = 1e-12);
    assert!(k_to_kz(100.0, 0.0, 50.0, 10.0).is_nan());
}

#[test]
fn test_binding_energy() {
    assert_abs_diff_eq!(ke_to_be(90.0, 100.0, 4.0, 0.5), 6.5);
    assert_abs_diff_eq!(be_to_ke(6.5, 100.0, 4.0, 0.5), 90.0);
}

#[test]
fn test_t_k_to_mev() {
    assert_abs_diff_eq!(t_k_to_mev(300.0), 25.852, epsilon = 1e-3);
}

#[test]
fn test_arpes_angle_k_vertical_slit() {
    let ke = array![100.0, 101.0];
    let angles = Array1::linspace(-10.0, 10.0, 41);
    // Each pixel holds its own angle.
    let img = Array2::from_shape_fn((41, 2), |(i, _)| angles[i]);
    let k_new = array![-0.5, 0.0, 0.5, 5.0];

    let out = arpes_angle_k(&k_new, img.view(), &ke, &angles, 0.0, 0.0, SlitDir::V);
    assert_eq!(out.shape(), &[4, 2]);
    for (j, &e) in ke.iter().enumerate() {
        for i in 0..3 {
            let expected = k_to_theta_y(e, 0.0, k_new[i]);
            assert_abs_diff_eq!(out[[i, j]], expected, epsilon = 1e-3);
        }
        assert!(out[[3, j]].is_nan());
    }
}

#[test]
fn test_narpes_profiles() {
    let ea = spectrum(array![10.0, 10.5, 11.0, 11.5], array![-1.0, 0.0, 1.0], 20.0);
    assert_abs_diff_eq!(ea.edc.data(), &Array1::from_elem(4, 3.0).into_dyn());
    assert_abs_diff_eq!(ea.mdc.data(), &Array1::from_elem(3, 4.0).into_dyn());
    assert_abs_diff_eq!(ea.mdc.scale(Axis::X).unwrap(), &array![-1.0, 0.0, 1.0]);
    assert_abs_diff_eq!(ea.hv(), 20.0);
    assert_abs_diff_eq!(ea.wk(), 4.0);
}

#[test]
fn test_narpes_rejects_bad_input() {
    let nd = NData::new(array![1.0, 2.0]).unwrap();
    let result = NArpes::from_ndata(nd, ArpesMetadata::default());
    assert!(matches!(result, Err(ArpesError::Rank(1))));

    let nd = NData::new(Array2::<f64>::zeros((3, 4))).unwrap();
    let meta = ArpesMetadata {
        ke_scale: Some(array![1.0, 2.0]),
        ..Default::default()
    };
    let result = NArpes::from_ndata(nd, meta);
    assert!(matches!(
        result,
        Err(ArpesError::Length {
            expected: 4,
            got: 2,
            ..
        })
    ));
}

#[test]
fn test_scale_be_and_ke() {
    let mut ea = spectrum(array![10.0, 10.5, 11.0, 11.5], array![-1.0, 0.0, 1.0], 20.0);
    ea.scale_be().unwrap();
    assert_abs_diff_eq!(ea.scale(Axis::X).unwrap(), &array![6.0, 5.5, 5.0, 4.5]);
    assert_eq!(ea.unit(Axis::X), BE_UNIT);
    assert_abs_diff_eq!(ea.edc.scale(Axis::X).unwrap(), &array![6.0, 5.5, 5.0, 4.5]);

    ea.set_e_offset(0.25);
    assert_abs_diff_eq!(ea.be_scale(), &array![6.25, 5.75, 5.25, 4.75]);
    ea.set_hv(21.0);
    ea.set_wk(4.5);
    assert_abs_diff_eq!(ea.be_scale(), &array![6.75, 6.25, 5.75, 5.25]);

    ea.scale_ke().unwrap();
    assert_abs_diff_eq!(
        ea.scale(Axis::X).unwrap(),
        &array![10.25, 10.75, 11.25, 11.75]
    );
    assert_eq!(ea.edc.unit(Axis::X), KE_UNIT);
}

#[test]
fn test_scale_angle() {
    let mut ea = spectrum(array![10.0, 10.5], array![-1.0, 0.0, 1.0], 20.0);
    ea.ang_offset = 0.5;
    ea.scale_angle(1.0).unwrap();
    assert_abs_diff_eq!(ea.scale(Axis::Y).unwrap(), &array![0.5, 1.5, 2.5]);
    assert_abs_diff_eq!(ea.mdc.scale(Axis::X).unwrap(), &array![0.5, 1.5, 2.5]);
    assert_abs_diff_eq!(ea.ang_scale, array![0.5, 1.5, 2.5]);
    assert_eq!(ea.unit(Axis::Y), ANGLE_UNIT);
}

#[test]
fn test_attributes() {
    let ea = spectrum(array![10.0, 10.5], array![-1.0, 0.0, 1.0], 20.0);
    let attrs = ea.attributes();
    assert_eq!(attrs["slitDir"].as_str(), Some("V"));
    assert_eq!(attrs["hv"].as_f64(), Some(20.0));
    assert_eq!(attrs["BEscale"], MetaValue::Floats(vec![6.0, 5.5]));
    assert!(attrs.contains_key("spectraInfo"));
}

#[test]
fn test_group_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("arpes.h5");

    let mut ea = spectrum(array![10.0, 10.5, 11.0], array![-1.0, 0.0, 1.0], 20.0);
    ea.slit_dir = SlitDir::H;
    ea.theta_x = 3.5;
    ea.set_e_offset(0.125);
    ea.spectra_info
        .insert("lensMode".to_string(), "Angular".into());
    {
        let file = hdf5::File::create(&path).unwrap();
        ea.write_group(&file, "EA_7").unwrap();
    }

    let file = hdf5::File::open(&path).unwrap();
    let read = NArpes::read_group(&file.group("EA_7").unwrap()).unwrap();
    assert_eq!(read.slit_dir, SlitDir::H);
    assert_abs_diff_eq!(read.theta_x, 3.5);
    assert_abs_diff_eq!(read.e_offset(), 0.125);
    assert_abs_diff_eq!(read.hv(), 20.0);
    assert_abs_diff_eq!(read.ke_scale, array![10.0, 10.5, 11.0]);
    assert_abs_diff_eq!(read.be_scale(), ea.be_scale());
    assert_abs_diff_eq!(read.mdc.data(), ea.mdc.data());
    assert_abs_diff_eq!(read.mdc.scale(Axis::X).unwrap(), &array![-1.0, 0.0, 1.0]);
    assert_eq!(read.spectra_info["lensMode"].as_str(), Some("Angular"));
}

fn two_spectra() -> Vec<NArpes> {
    let angles = array![-1.0, 0.0, 1.0];
    vec![
        spectrum(array![10.0, 10.25, 10.5, 10.75], angles.clone(), 20.0),
        spectrum(array![10.5, 10.75, 11.0, 11.25], angles, 20.0),
    ]
}

#[test]
fn test_stack_escale() {
    let list = two_spectra();
    let (be, unit) = stack_escale(&list, true, None).unwrap();
    assert_eq!(unit, BE_UNIT);
    assert_abs_diff_eq!(be, array![6.0, 5.75, 5.5, 5.25, 5.0], epsilon = 1e-12);

    let (ke, unit) = stack_escale(&list, false, None).unwrap();
    assert_eq!(unit, KE_UNIT);
    assert_abs_diff_eq!(ke, array![10.0, 10.25, 10.5, 10.75, 11.0], epsilon = 1e-12);

    assert!(matches!(
        stack_escale(&list, true, Some(&[0.0])),
        Err(ArpesError::OffsetCount {
            expected: 2,
            got: 1
        })
    ));
    assert!(matches!(
        stack_escale(&[], true, None),
        Err(ArpesError::EmptyList)
    ));
}

#[test]
fn test_stack_flat_energy_scale() {
    let angles = Array1::linspace(-5.0, 5.0, 3);
    let flat = spectrum(array![10.0, 10.0, 10.0], angles, 30.0);
    assert!(matches!(
        stack_escale(std::slice::from_ref(&flat), false, None),
        Err(ArpesError::EnergyStep(s)) if s == 0.0
    ));
    let list = vec![flat];
    assert!(matches!(
        stack_eas(&list, None, "", true, &StackOptions::default()),
        Err(ArpesError::EnergyStep(_))
    ));
}

#[test]
fn test_ea_escale() {
    let list = two_spectra();
    let (ke, unit) = ea_escale(&list[1], false);
    assert_eq!(unit, KE_UNIT);
    assert_abs_diff_eq!(ke, array![10.5, 10.75, 11.0, 11.25]);
}

#[test]
fn test_stack_edcs() {
    let list = two_spectra();
    let opts = StackOptions {
        edc_only: true,
        ..Default::default()
    };
    let nd = stack_eas(&list, Some(array![100.0, 200.0]), "T (K)", true, &opts).unwrap();
    assert_eq!(nd.shape(), &[2, 5]);
    assert_eq!(nd.unit(Axis::X), BE_UNIT);
    assert_eq!(nd.unit(Axis::Y), "T (K)");
    let d = nd.data();
    // The first spectrum only reaches down to BE = 5.25.
    assert_abs_diff_eq!(d[[0, 0]], 3.0);
    assert_abs_diff_eq!(d[[0, 3]], 3.0);
    assert!(d[[0, 4]].is_nan());
    // The second spectrum only reaches up to BE = 5.5.
    assert!(d[[1, 0]].is_nan());
    assert!(d[[1, 1]].is_nan());
    assert_abs_diff_eq!(d[[1, 2]], 3.0);
    assert_abs_diff_eq!(d[[1, 4]], 3.0);
}

#[test]
fn test_stack_spectra_into_volume() {
    let list = two_spectra();
    let nd = stack_eas(&list, None, "scan", false, &StackOptions::default()).unwrap();
    assert_eq!(nd.shape(), &[3, 5, 2]);
    assert_eq!(nd.unit(Axis::Y), "Degree");
    assert_eq!(nd.unit(Axis::X), KE_UNIT);
    assert_abs_diff_eq!(nd.scale(Axis::Z).unwrap(), &array![1.0, 2.0]);
    assert_abs_diff_eq!(nd.data()[[1, 0, 0]], 1.0);
    assert!(nd.data()[[1, 0, 1]].is_nan());
    assert_abs_diff_eq!(nd.data()[[2, 4, 1]], 1.0);
}

#[test]
fn test_stack_with_energy_offsets() {
    let list = two_spectra();
    let opts = StackOptions {
        edc_only: true,
        e_offsets: Some(EnergyOffset::Each(vec![0.0, 0.25])),
    };
    let nd = stack_eas(&list, None, "", true, &opts).unwrap();
    // The second spectrum is shifted up by 0.25 eV in BE.
    assert_abs_diff_eq!(nd.scale(Axis::X).unwrap()[0], 6.0, epsilon = 1e-12);
    assert!(nd.data()[[1, 0]].is_nan());
    assert_abs_diff_eq!(nd.data()[[1, 1]], 3.0);

    let opts = StackOptions {
        edc_only: true,
        e_offsets: Some(EnergyOffset::Each(vec![0.0])),
    };
    assert!(stack_eas(&list, None, "", true, &opts).is_err());
}

#[test]
fn test_kmapping_boundaries() {
    let ea = spectrum(array![20.0, 25.0, 30.0], array![-5.0, 0.0, 5.0], 40.0);
    let b = kmapping_boundaries_slice(&ea, DEFAULT_V0);
    assert_abs_diff_eq!(b.ke_min, 20.0);
    assert_abs_diff_eq!(b.ke_max, 30.0);
    assert_abs_diff_eq!(b.kx_min, 0.0);
    assert_abs_diff_eq!(b.kx_max, 0.0);
    assert_abs_diff_eq!(b.ky_min, -b.ky_max, epsilon = 1e-12);
    assert_abs_diff_eq!(b.ky_max, theta_to_ky(30.0, 0.0, 5.0), epsilon = 1e-12);
    assert_abs_diff_eq!(b.kz_max, k_factor() * 40f64.sqrt(), epsilon = 1e-12);
    assert!(b.kz_min < b.kz_max);

    let other = spectrum(array![30.0, 35.0], array![-5.0, 5.0], 40.0);
    let both = kmapping_boundaries(&[ea, other], DEFAULT_V0).unwrap();
    assert_abs_diff_eq!(both.ke_max, 35.0);
    assert_abs_diff_eq!(both.ke_min, 20.0);
}

#[test]
fn test_kmapping_stack() {
    let angles = Array1::linspace(-5.0, 5.0, 11);
    let list = vec![
        spectrum(array![20.0, 21.0, 22.0], angles.clone(), 30.0),
        spectrum(array![20.0, 21.0, 22.0], angles, 30.0),
    ];
    let nd = kmapping_stack(&list, true, &EnergyOffset::Same(0.0)).unwrap();
    assert_eq!(nd.shape(), &[11, 3, 2]);
    assert_eq!(nd.unit(Axis::Y), "ky (1/Å)");
    assert_eq!(nd.unit(Axis::X), BE_UNIT);
    assert_abs_diff_eq!(nd.scale(Axis::X).unwrap(), &array![6.0, 5.0, 4.0]);
    // At normal emission every energy is covered.
    assert_abs_diff_eq!(nd.data()[[5, 1, 0]], 1.0, epsilon = 1e-12);
}

#[test]
fn test_kmapping_stack_offsets() {
    let angles = Array1::linspace(-5.0, 5.0, 11);
    let list = vec![
        spectrum(array![20.0, 21.0, 22.0], angles.clone(), 30.0),
        spectrum(array![20.0, 21.0, 22.0], angles, 30.0),
    ];
    let nd = kmapping_stack(&list, false, &EnergyOffset::Each(vec![0.0, 1.0])).unwrap();
    assert_eq!(nd.unit(Axis::X), KE_UNIT);
    // The grid reaches the top of the shifted second spectrum.
    assert_abs_diff_eq!(nd.scale(Axis::X).unwrap(), &array![20.0, 21.5, 23.0]);
    assert_abs_diff_eq!(nd.data()[[5, 2, 1]], 1.0, epsilon = 1e-12);
    assert!(nd.data()[[5, 2, 0]].is_nan());
    assert!(nd.data()[[5, 0, 1]].is_nan());

    assert!(matches!(
        kmapping_stack(&list, false, &EnergyOffset::Each(vec![0.0])),
        Err(ArpesError::OffsetCount { .. })
    ));
}

#[test]
fn test_kmap_scan_hv() {
    let ke = array![20.0, 21.0, 22.0, 23.0];
    let ty = Array1::linspace(-5.0, 5.0, 11);
    let hv = array![30.0, 31.0];
    let data = Array3::from_elem((11, 4, 2), 1.0);
    let nd = NData::new(data)
        .unwrap()
        .with_ax(Axis::X, ke, KE_UNIT)
        .unwrap()
        .with_ax(Axis::Y, ty, ANGLE_UNIT)
        .unwrap()
        .with_ax(Axis::Z, hv, "hv (eV)")
        .unwrap();
    let k = kmap_scan_hv(&nd, 4.0).unwrap();
    assert_eq!(k.shape(), &[4, 11, 2]);
    assert_abs_diff_eq!(k.scale(Axis::Y).unwrap()[0], 31.0 - 4.0 - 20.0);
    assert_abs_diff_eq!(k.scale(Axis::Y).unwrap()[3], 30.0 - 4.0 - 23.0);
    assert_eq!(k.unit(Axis::Z), "hv (eV)");
    // The middle of the BE range at ky = 0 is measured at both photon energies.
    assert_abs_diff_eq!(k.data()[[2, 5, 0]], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(k.data()[[2, 5, 1]], 1.0, epsilon = 1e-12);
    // BE = 7 at hv = 30 would need KE = 19.
    assert!(k.data()[[0, 5, 0]].is_nan());
}

#[test]
fn test_kmap_scan_theta_x() {
    let ke = array![20.0, 21.0];
    let ty = Array1::linspace(-5.0, 5.0, 11);
    let tx = Array1::linspace(-4.0, 4.0, 9);
    let data = Array3::from_elem((11, 2, 9), 1.0);
    let nd = NData::new(data)
        .unwrap()
        .with_ax(Axis::X, ke, KE_UNIT)
        .unwrap()
        .with_ax(Axis::Y, ty, ANGLE_UNIT)
        .unwrap()
        .with_ax(Axis::Z, tx, "thetaX")
        .unwrap();
    let stack = NArpes::from_ndata(
        nd,
        ArpesMetadata {
            hv: 30.0,
            wk: 4.0,
            ..Default::default()
        },
    )
    .unwrap();
    let k = kmap_scan_theta_x(&stack).unwrap();
    assert_eq!(k.shape(), &[11, 9, 2]);
    assert_abs_diff_eq!(k.scale(Axis::Z).unwrap(), &array![6.0, 5.0]);
    assert_eq!(k.unit(Axis::X), "kx (1/Å)");
    // Normal emission.
    assert_abs_diff_eq!(k.data()[[5, 4, 1]], 1.0, epsilon = 1e-12);

    let flat = spectrum(array![20.0, 21.0], array![-1.0, 1.0], 30.0);
    assert!(matches!(kmap_scan_theta_x(&flat), Err(ArpesError::Rank(2))));
}
