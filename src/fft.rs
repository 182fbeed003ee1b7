//! FFT primitive for 1D, 2D and 3D complex buffers using rustfft
//!
//! Buffers are contiguous and stored in Fortran order (x fastest), matching
//! the volume layout. Transforms are unnormalized in both directions; the
//! caller divides by the transformed length after an inverse transform.

use num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::ops::Neg;
use std::sync::Arc;

use crate::error::{Result, SpectralError};

/// FFT workspace that caches plans and scratch buffers for one buffer shape
///
/// `shape` lists the lengths of the transformed axes, innermost first.
#[derive(Clone)]
pub struct NdFft {
    shape: Vec<usize>,
    n_total: usize,
    direction: FftDirection,
    plans: Vec<Arc<dyn Fft<f64>>>,
    scratch: Vec<Complex64>,
    // Gather buffer for the strided (y, z) axes
    line: Vec<Complex64>,
}

impl NdFft {
    /// Plan a transform over a buffer of the given shape (1 to 3 axes)
    pub fn new(shape: &[usize], direction: FftDirection) -> Result<Self> {
        if shape.is_empty() || shape.len() > 3 {
            return Err(SpectralError::UnsupportedRank(shape.len()));
        }
        if let Some(axis) = shape.iter().position(|&n| n == 0) {
            return Err(SpectralError::InvalidGeometry(format!("axis {} has zero length", axis)));
        }

        let mut planner = FftPlanner::new();
        let plans: Vec<Arc<dyn Fft<f64>>> = shape
            .iter()
            .map(|&n| planner.plan_fft(n, direction))
            .collect();

        let scratch_len = plans.iter().map(|p| p.get_inplace_scratch_len()).max().unwrap_or(0);
        let line_len = shape[1..].iter().copied().max().unwrap_or(0);

        Ok(Self {
            shape: shape.to_vec(),
            n_total: shape.iter().product(),
            direction,
            plans,
            scratch: alloc_buffer(scratch_len)?,
            line: alloc_buffer(line_len)?,
        })
    }

    /// Number of complex samples one call transforms
    #[inline]
    pub fn len(&self) -> usize {
        self.n_total
    }

    pub fn is_empty(&self) -> bool {
        self.n_total == 0
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn direction(&self) -> FftDirection {
        self.direction
    }

    /// In-place, unnormalized transform of one contiguous buffer
    pub fn process(&mut self, data: &mut [Complex64]) -> Result<()> {
        if data.len() != self.n_total {
            return Err(SpectralError::Primitive(format!(
                "buffer holds {} samples, plan expects {} for shape {:?}",
                data.len(), self.n_total, self.shape
            )));
        }

        let nx = self.shape[0];
        let ny = self.shape.get(1).copied().unwrap_or(1);
        let nz = self.shape.get(2).copied().unwrap_or(1);

        // Transform along x-axis (contiguous lines)
        for row in data.chunks_exact_mut(nx) {
            self.plans[0].process_with_scratch(row, &mut self.scratch);
        }

        // Transform along y-axis (stride nx)
        if self.shape.len() > 1 {
            for k in 0..nz {
                for i in 0..nx {
                    for j in 0..ny {
                        self.line[j] = data[idx3d(i, j, k, nx, ny)];
                    }
                    self.plans[1].process_with_scratch(&mut self.line[..ny], &mut self.scratch);
                    for j in 0..ny {
                        data[idx3d(i, j, k, nx, ny)] = self.line[j];
                    }
                }
            }
        }

        // Transform along z-axis (stride nx*ny)
        if self.shape.len() > 2 {
            for j in 0..ny {
                for i in 0..nx {
                    for k in 0..nz {
                        self.line[k] = data[idx3d(i, j, k, nx, ny)];
                    }
                    self.plans[2].process_with_scratch(&mut self.line[..nz], &mut self.scratch);
                    for k in 0..nz {
                        data[idx3d(i, j, k, nx, ny)] = self.line[k];
                    }
                }
            }
        }

        Ok(())
    }
}

/// Allocate a zeroed complex buffer, reporting allocation failure instead of aborting
pub(crate) fn alloc_buffer(len: usize) -> Result<Vec<Complex64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| SpectralError::Allocation { len })?;
    buf.resize(len, Complex64::new(0.0, 0.0));
    Ok(buf)
}

/// Index into a 3D array stored in Fortran order (column-major)
/// index = x + y*nx + z*nx*ny
#[inline(always)]
pub fn idx3d(i: usize, j: usize, k: usize, nx: usize, ny: usize) -> usize {
    i + j * nx + k * nx * ny
}

/// Multiply every sample by (-1)^(x + y + z) over a buffer of the given shape
///
/// For even-length axes this moves the zero-frequency component of the
/// subsequent transform to the centre of the output. Applying it twice is
/// the identity.
pub fn apply_checkerboard<T>(data: &mut [T], shape: &[usize])
where
    T: Copy + Neg<Output = T>,
{
    let nx = shape.first().copied().unwrap_or(1).max(1);
    let ny = shape.get(1).copied().unwrap_or(1).max(1);

    for (row_index, row) in data.chunks_mut(nx).enumerate() {
        let j = row_index % ny;
        let k = row_index / ny;
        let row_parity = (j + k) & 1;
        for (i, v) in row.iter_mut().enumerate() {
            if (i + row_parity) & 1 == 1 {
                *v = -*v;
            }
        }
    }
}

/// 3D FFT shift: swap quadrants so zero-frequency is at center
///
/// Returns a new array with the zero-frequency component shifted to the center.
/// Matches numpy.fft.fftshift behavior for 3D data in Fortran order.
pub fn fftshift<T: Copy + Default>(data: &[T], nx: usize, ny: usize, nz: usize) -> Vec<T> {
    let mut out = vec![T::default(); nx * ny * nz];

    let hx = nx / 2;
    let hy = ny / 2;
    let hz = nz / 2;

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let si = (i + hx) % nx;
                let sj = (j + hy) % ny;
                let sk = (k + hz) % nz;
                out[idx3d(si, sj, sk, nx, ny)] = data[idx3d(i, j, k, nx, ny)];
            }
        }
    }

    out
}
