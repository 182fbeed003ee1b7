//! Common test utilities for volfft integration tests

#![allow(dead_code)]

use std::path::Path;

use volfft::nifti_io::{read_volume_file, write_scalar_volume, LoadedVolume, OutputFormat};
use volfft::{ComplexVolume, Geometry, RealVolume};

/// Largest absolute difference between two arrays
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "length mismatch");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Compute RMSE between two arrays
pub fn rmse(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "length mismatch");
    if a.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    (sum_sq / a.len() as f64).sqrt()
}

/// Smooth blob plus a ramp, so every frequency band carries some energy
pub fn phantom(nx: usize, ny: usize, nz: usize) -> RealVolume {
    let (cx, cy, cz) = (nx as f64 / 2.0, ny as f64 / 2.0, nz as f64 / 2.0);
    let mut data = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let dx = i as f64 - cx;
                let dy = j as f64 - cy;
                let dz = k as f64 - cz;
                let blob = 100.0 * (-(dx * dx + dy * dy + dz * dz) / 8.0).exp();
                data.push(blob + i as f64 * 0.5 - k as f64);
            }
        }
    }
    let geometry = Geometry::new([nx, ny, nz])
        .with_separations([1.0, 1.0, 2.0])
        .with_starts([-(nx as f64) / 2.0, -(ny as f64) / 2.0, 0.0]);
    RealVolume::new(data, geometry).expect("phantom geometry is valid")
}

/// Write a real volume as double-precision NIfTI
pub fn write_input(path: &Path, volume: &RealVolume) {
    write_scalar_volume(path, volume, OutputFormat::new(volfft::nifti_io::OutputType::Double, true), "input")
        .expect("failed to write test input");
}

pub fn read_spatial(path: &Path) -> RealVolume {
    match read_volume_file(path).expect("failed to read output") {
        LoadedVolume::Spatial(v) => v,
        LoadedVolume::Complex(_) => panic!("expected a 3D volume in {}", path.display()),
    }
}

pub fn read_complex(path: &Path) -> ComplexVolume {
    match read_volume_file(path).expect("failed to read output") {
        LoadedVolume::Complex(v) => v,
        LoadedVolume::Spatial(_) => panic!("expected a 4D complex volume in {}", path.display()),
    }
}
