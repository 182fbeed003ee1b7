//! Transform orchestration for complex volumes
//!
//! A request is resolved once into a [`TransformShape`], then the volume is
//! processed as a sequence of contiguous chunks:
//! - rank 1: every x-line, for each (y, z)
//! - rank 2: every x-y slice, for each z
//! - rank 3: the whole volume in one call
//!
//! Each chunk is copied into scratch, optionally multiplied by the
//! checkerboard (-1)^(x+y+z) over its own coordinates to centre the
//! spectrum, transformed, divided by the normalization divisor and written
//! back. Every precondition is checked before the first sample changes.

use std::fmt;

use log::debug;
use num_complex::Complex64;
use rustfft::FftDirection;

use crate::error::{Result, SpectralError};
use crate::fft::{alloc_buffer, apply_checkerboard, NdFft};
use crate::volume::ComplexVolume;

/// Transform direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

impl Direction {
    pub fn is_inverse(self) -> bool {
        self == Direction::Inverse
    }
}

impl From<Direction> for FftDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => FftDirection::Forward,
            Direction::Inverse => FftDirection::Inverse,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Inverse => write!(f, "inverse"),
        }
    }
}

/// Transform request threaded through every call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformConfig {
    pub direction: Direction,
    /// Number of axes jointly transformed (1, 2 or 3)
    pub rank: usize,
    /// Move the zero-frequency component to the array centre
    pub centered: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            direction: Direction::Forward,
            rank: 3,
            centered: false,
        }
    }
}

impl TransformConfig {
    pub fn forward(rank: usize) -> Self {
        Self { direction: Direction::Forward, rank, centered: false }
    }

    pub fn inverse(rank: usize) -> Self {
        Self { direction: Direction::Inverse, rank, centered: false }
    }

    pub fn centered(mut self, centered: bool) -> Self {
        self.centered = centered;
        self
    }
}

/// Shape of the buffer handed to the transform primitive for each chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformShape {
    /// One x-line per call
    OneD { len: usize },
    /// One x-y slice per call
    TwoD { nx: usize, ny: usize },
    /// The whole volume in a single call
    ThreeD { nx: usize, ny: usize, nz: usize },
}

impl TransformShape {
    /// Resolve a requested rank against the spatial sizes of a volume
    pub fn resolve(rank: usize, sizes: [usize; 3]) -> Result<Self> {
        let [nx, ny, nz] = sizes;
        match rank {
            1 => Ok(TransformShape::OneD { len: nx }),
            2 => Ok(TransformShape::TwoD { nx, ny }),
            3 => Ok(TransformShape::ThreeD { nx, ny, nz }),
            other => Err(SpectralError::UnsupportedRank(other)),
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            TransformShape::OneD { .. } => 1,
            TransformShape::TwoD { .. } => 2,
            TransformShape::ThreeD { .. } => 3,
        }
    }

    /// Lengths of the transformed axes, innermost first
    pub fn axes(&self) -> Vec<usize> {
        match *self {
            TransformShape::OneD { len } => vec![len],
            TransformShape::TwoD { nx, ny } => vec![nx, ny],
            TransformShape::ThreeD { nx, ny, nz } => vec![nx, ny, nz],
        }
    }

    /// Samples per primitive call
    pub fn chunk_len(&self) -> usize {
        self.axes().iter().product()
    }

    /// 1 for forward transforms, product of transformed lengths for inverse
    pub fn divisor(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Forward => 1.0,
            Direction::Inverse => self.chunk_len() as f64,
        }
    }

    /// Centering requires every transformed axis to have even length
    pub fn check_centering(&self) -> Result<()> {
        for (axis, &len) in self.axes().iter().enumerate() {
            if len % 2 != 0 {
                return Err(SpectralError::OddAxis { axis, len, rank: self.rank() });
            }
        }
        Ok(())
    }
}

/// Transform a complex volume in place
pub fn fft_volume(volume: &mut ComplexVolume, config: &TransformConfig) -> Result<()> {
    fft_volume_with_progress(volume, config, |_, _| {})
}

/// Transform a complex volume in place, reporting (chunks done, chunks total)
///
/// The callback is advisory. With the `parallel` feature, rank 1 and rank 2
/// passes report only their start and completion.
pub fn fft_volume_with_progress<F>(
    volume: &mut ComplexVolume,
    config: &TransformConfig,
    mut progress_callback: F,
) -> Result<()>
where
    F: FnMut(usize, usize),
{
    let shape = TransformShape::resolve(config.rank, volume.geometry().sizes)?;
    if config.centered {
        shape.check_centering()?;
    }

    let axes = shape.axes();
    let chunk_len = shape.chunk_len();
    let divisor = shape.divisor(config.direction);
    let mut workspace = NdFft::new(&axes, config.direction.into())?;
    let mut scratch = alloc_buffer(chunk_len)?;
    let n_chunks = volume.data().len() / chunk_len;

    debug!(
        "{} rank-{} FFT over {:?}: {} chunk(s) of {} samples, centered={}, divisor={}",
        config.direction, shape.rank(), volume.geometry().sizes,
        n_chunks, chunk_len, config.centered, divisor
    );

    progress_callback(0, n_chunks);

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        if n_chunks > 1 {
            let centered = config.centered;
            volume
                .data_mut()
                .par_chunks_mut(chunk_len)
                .try_for_each_init(
                    || (workspace.clone(), scratch.clone()),
                    |(ws, buf), chunk| transform_chunk(chunk, buf, ws, &axes, centered, divisor),
                )?;
            progress_callback(n_chunks, n_chunks);
            return Ok(());
        }
    }

    for (done, chunk) in volume.data_mut().chunks_exact_mut(chunk_len).enumerate() {
        transform_chunk(chunk, &mut scratch, &mut workspace, &axes, config.centered, divisor)?;
        progress_callback(done + 1, n_chunks);
    }

    Ok(())
}

/// Marshal one chunk through scratch storage and the primitive
fn transform_chunk(
    chunk: &mut [Complex64],
    scratch: &mut [Complex64],
    workspace: &mut NdFft,
    axes: &[usize],
    centered: bool,
    divisor: f64,
) -> Result<()> {
    scratch.copy_from_slice(chunk);

    if centered {
        apply_checkerboard(scratch, axes);
    }

    workspace.process(scratch)?;

    if divisor != 1.0 {
        for v in scratch.iter_mut() {
            *v /= divisor;
        }
    }

    chunk.copy_from_slice(scratch);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft::{fftshift, idx3d};
    use crate::volume::{Channel, Geometry};

    fn real_volume(sizes: [usize; 3], f: impl Fn(usize) -> f64) -> ComplexVolume {
        let n: usize = sizes.iter().product();
        let data = (0..n).map(|i| Complex64::new(f(i), 0.0)).collect();
        ComplexVolume::from_samples(data, Geometry::new(sizes)).unwrap()
    }

    fn assert_close(a: &ComplexVolume, b: &ComplexVolume, tol: f64) {
        for (i, (x, y)) in a.data().iter().zip(b.data().iter()).enumerate() {
            assert!(
                (x - y).norm() < tol,
                "Mismatch at index {}: expected {}, got {}",
                i, y, x
            );
        }
    }

    #[test]
    fn test_resolve_shapes() {
        assert_eq!(TransformShape::resolve(1, [4, 5, 6]).unwrap(), TransformShape::OneD { len: 4 });
        assert_eq!(TransformShape::resolve(2, [4, 5, 6]).unwrap(), TransformShape::TwoD { nx: 4, ny: 5 });
        assert_eq!(
            TransformShape::resolve(3, [4, 5, 6]).unwrap(),
            TransformShape::ThreeD { nx: 4, ny: 5, nz: 6 }
        );
        assert_eq!(TransformShape::TwoD { nx: 4, ny: 5 }.divisor(Direction::Inverse), 20.0);
        assert_eq!(TransformShape::TwoD { nx: 4, ny: 5 }.divisor(Direction::Forward), 1.0);
    }

    #[test]
    fn test_unsupported_rank_leaves_volume_untouched() {
        for rank in [0, 4, 7] {
            let mut vol = real_volume([4, 4, 4], |i| i as f64);
            let original = vol.clone();
            let err = fft_volume(&mut vol, &TransformConfig::forward(rank)).unwrap_err();
            assert!(matches!(err, SpectralError::UnsupportedRank(r) if r == rank));
            assert!(err.is_configuration());
            assert_eq!(vol, original);
        }
    }

    #[test]
    fn test_centering_rank1_odd_innermost_axis_fails() {
        let mut vol = real_volume([5, 4, 4], |i| i as f64);
        let original = vol.clone();
        let err = fft_volume(&mut vol, &TransformConfig::forward(1).centered(true)).unwrap_err();
        match err {
            SpectralError::OddAxis { axis, len, rank } => {
                assert_eq!((axis, len, rank), (0, 5, 1));
            }
            other => panic!("expected OddAxis, got {:?}", other),
        }
        assert_eq!(vol, original, "volume must not change on a configuration error");
    }

    #[test]
    fn test_centering_only_checks_transformed_axes() {
        // Outer axes are odd, but rank 1 only transforms x
        let mut vol = real_volume([4, 3, 5], |i| i as f64);
        fft_volume(&mut vol, &TransformConfig::forward(1).centered(true)).unwrap();

        let mut vol = real_volume([4, 3, 5], |i| i as f64);
        let err = fft_volume(&mut vol, &TransformConfig::forward(2).centered(true)).unwrap_err();
        assert!(matches!(err, SpectralError::OddAxis { axis: 1, len: 3, rank: 2 }));

        let mut vol = real_volume([4, 4, 5], |i| i as f64);
        let err = fft_volume(&mut vol, &TransformConfig::inverse(3).centered(true)).unwrap_err();
        assert!(matches!(err, SpectralError::OddAxis { axis: 2, len: 5, rank: 3 }));
    }

    #[test]
    fn test_odd_axes_are_fine_without_centering() {
        let mut vol = real_volume([5, 3, 7], |i| (i % 11) as f64);
        let original = vol.clone();
        fft_volume(&mut vol, &TransformConfig::forward(3)).unwrap();
        fft_volume(&mut vol, &TransformConfig::inverse(3)).unwrap();
        assert_close(&vol, &original, 1e-10);
    }

    #[test]
    fn test_forward_inverse_roundtrip_all_ranks() {
        for rank in 1..=3 {
            let mut vol = real_volume([4, 6, 2], |i| (i as f64 * 0.37).sin() * 10.0);
            let original = vol.clone();

            fft_volume(&mut vol, &TransformConfig::forward(rank)).unwrap();
            fft_volume(&mut vol, &TransformConfig::inverse(rank)).unwrap();

            for (i, (x, y)) in vol.data().iter().zip(original.data().iter()).enumerate() {
                assert!(
                    (x.re - y.re).abs() < 1e-10,
                    "rank {} mismatch at index {}: expected {}, got {}",
                    rank, i, y.re, x.re
                );
                assert!(x.im.abs() < 1e-10, "rank {} imaginary residue at {}: {}", rank, i, x.im);
            }
        }
    }

    #[test]
    fn test_zero_volume_stays_zero() {
        let mut vol = real_volume([4, 4, 4], |_| 0.0);
        fft_volume(&mut vol, &TransformConfig::forward(3)).unwrap();
        assert!(vol.data().iter().all(|c| c.re == 0.0 && c.im == 0.0));
    }

    #[test]
    fn test_rank3_constant_volume_dc_component() {
        let mut vol = real_volume([4, 4, 4], |_| 2.0);
        fft_volume(&mut vol, &TransformConfig::forward(3)).unwrap();

        assert!((vol.get(0, 0, 0, Channel::Real) - 128.0).abs() < 1e-10);
        let off_dc: f64 = vol.data()[1..].iter().map(|c| c.norm()).sum();
        assert!(off_dc < 1e-9, "non-DC energy: {}", off_dc);
    }

    #[test]
    fn test_centering_moves_dc_to_centre() {
        let mut vol = real_volume([4, 4, 4], |_| 1.0);
        fft_volume(&mut vol, &TransformConfig::forward(3).centered(true)).unwrap();

        assert!((vol.get(2, 2, 2, Channel::Real) - 64.0).abs() < 1e-10);
        assert!(vol.get(0, 0, 0, Channel::Real).abs() < 1e-10);
    }

    #[test]
    fn test_centered_forward_matches_fftshift() {
        let (nx, ny, nz) = (4, 6, 2);
        let mut plain = real_volume([nx, ny, nz], |i| ((i * 7) % 13) as f64 - 4.0);
        let mut centered = plain.clone();

        fft_volume(&mut plain, &TransformConfig::forward(3)).unwrap();
        fft_volume(&mut centered, &TransformConfig::forward(3).centered(true)).unwrap();

        let shifted = fftshift(plain.data(), nx, ny, nz);
        for (i, (c, s)) in centered.data().iter().zip(shifted.iter()).enumerate() {
            assert!((c - s).norm() < 1e-9, "index {}: centered {} vs shifted {}", i, c, s);
        }
    }

    #[test]
    fn test_rank2_centering_shifts_each_slice() {
        // Odd nz: the outer axis is neither checked nor modulated
        let (nx, ny, nz) = (4, 6, 3);
        let mut plain = real_volume([nx, ny, nz], |i| ((i * 5) % 11) as f64 - 3.0);
        let mut centered = plain.clone();

        fft_volume(&mut plain, &TransformConfig::forward(2)).unwrap();
        fft_volume(&mut centered, &TransformConfig::forward(2).centered(true)).unwrap();

        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let p = plain.sample(i, j, k);
                    let c = centered.sample((i + nx / 2) % nx, (j + ny / 2) % ny, k);
                    assert!(
                        (c - p).norm() < 1e-9,
                        "voxel ({}, {}, {}): centered {} vs plain {}",
                        i, j, k, c, p
                    );
                }
            }
        }
    }

    #[test]
    fn test_centered_then_uncentered_restores_input() {
        // Undo: inverse without centering, then strip the checkerboard
        let (nx, ny, nz) = (4, 4, 2);
        let mut vol = real_volume([nx, ny, nz], |i| (i as f64).sqrt());
        let original = vol.clone();

        fft_volume(&mut vol, &TransformConfig::forward(3).centered(true)).unwrap();
        fft_volume(&mut vol, &TransformConfig::inverse(3)).unwrap();
        apply_checkerboard(vol.data_mut(), &[nx, ny, nz]);

        assert_close(&vol, &original, 1e-10);
    }

    #[test]
    fn test_rank2_normalizes_per_slice() {
        // A 32-voxel volume transformed slice-wise divides by 16, not 32
        let mut vol = real_volume([4, 4, 2], |i| if i < 16 { 1.0 } else { 3.0 });
        fft_volume(&mut vol, &TransformConfig::forward(2)).unwrap();

        assert!((vol.get(0, 0, 0, Channel::Real) - 16.0).abs() < 1e-10);
        assert!((vol.get(0, 0, 1, Channel::Real) - 48.0).abs() < 1e-10);

        fft_volume(&mut vol, &TransformConfig::inverse(2)).unwrap();
        assert!((vol.get(1, 2, 0, Channel::Real) - 1.0).abs() < 1e-10);
        assert!((vol.get(3, 1, 1, Channel::Real) - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_rank1_transforms_each_line_independently() {
        let (nx, ny, nz) = (4, 3, 2);
        let mut vol = real_volume([nx, ny, nz], |i| (i / nx) as f64);
        fft_volume(&mut vol, &TransformConfig::forward(1)).unwrap();

        for k in 0..nz {
            for j in 0..ny {
                let line_value = (j + k * ny) as f64;
                let dc = vol.data()[idx3d(0, j, k, nx, ny)];
                assert!((dc.re - line_value * nx as f64).abs() < 1e-10);
                for i in 1..nx {
                    assert!(vol.data()[idx3d(i, j, k, nx, ny)].norm() < 1e-10);
                }
            }
        }
    }

    #[test]
    fn test_rank1_centering_per_line() {
        let mut vol = real_volume([6, 2, 2], |_| 1.0);
        fft_volume(&mut vol, &TransformConfig::forward(1).centered(true)).unwrap();

        // Modulation only uses x, so every line has its DC at x = 3
        for k in 0..2 {
            for j in 0..2 {
                assert!((vol.get(3, j, k, Channel::Real) - 6.0).abs() < 1e-10);
                assert!(vol.get(0, j, k, Channel::Real).abs() < 1e-10);
            }
        }
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn test_progress_is_monotonic() {
        let mut vol = real_volume([4, 3, 2], |i| i as f64);
        let mut calls = Vec::new();
        fft_volume_with_progress(&mut vol, &TransformConfig::forward(1), |done, total| {
            calls.push((done, total));
        })
        .unwrap();

        assert_eq!(calls.first(), Some(&(0, 6)));
        assert_eq!(calls.last(), Some(&(6, 6)));
        assert!(calls.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
