//! Volume containers for spatial, scalar and complex data
//!
//! All volumes use Fortran (column-major) order to match NIfTI convention:
//! axis 0 (x) varies fastest, index = x + y*nx + z*nx*ny.
//! Axis 0 is the innermost axis, axis 2 the outermost.

use num_complex::Complex64;

use crate::error::{Result, SpectralError};
use crate::fft::idx3d;

/// Spatial geometry of a 3D volume
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Number of voxels along (x, y, z)
    pub sizes: [usize; 3],
    /// Position of the first voxel along each axis, in axis units (mm)
    pub starts: [f64; 3],
    /// Voxel spacing along each axis (mm)
    pub separations: [f64; 3],
    /// Unit direction cosine of each axis in world space
    pub direction_cosines: [[f64; 3]; 3],
}

impl Geometry {
    /// Unit-spaced, axis-aligned geometry starting at the origin
    pub fn new(sizes: [usize; 3]) -> Self {
        Self {
            sizes,
            starts: [0.0; 3],
            separations: [1.0; 3],
            direction_cosines: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub fn with_separations(mut self, separations: [f64; 3]) -> Self {
        self.separations = separations;
        self
    }

    pub fn with_starts(mut self, starts: [f64; 3]) -> Self {
        self.starts = starts;
        self
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.sizes[0], self.sizes[1], self.sizes[2])
    }

    #[inline]
    pub fn n_total(&self) -> usize {
        self.sizes.iter().product()
    }

    /// Check that the geometry describes a usable, non-degenerate volume
    pub fn validate(&self) -> Result<()> {
        for (axis, &len) in self.sizes.iter().enumerate() {
            if len == 0 {
                return Err(SpectralError::InvalidGeometry(format!("axis {} has zero length", axis)));
            }
        }
        for (axis, &sep) in self.separations.iter().enumerate() {
            if !sep.is_finite() || sep == 0.0 {
                return Err(SpectralError::InvalidGeometry(format!(
                    "axis {} has invalid separation {}", axis, sep
                )));
            }
        }
        for (axis, &start) in self.starts.iter().enumerate() {
            if !start.is_finite() {
                return Err(SpectralError::InvalidGeometry(format!(
                    "axis {} has invalid start {}", axis, start
                )));
            }
        }
        for (axis, cosine) in self.direction_cosines.iter().enumerate() {
            let norm = cosine.iter().map(|c| c * c).sum::<f64>().sqrt();
            if !norm.is_finite() || norm < 1e-12 {
                return Err(SpectralError::InvalidGeometry(format!(
                    "axis {} has a degenerate direction cosine", axis
                )));
            }
        }
        Ok(())
    }

    /// World coordinate of voxel (0, 0, 0)
    pub fn world_origin(&self) -> [f64; 3] {
        let mut origin = [0.0; 3];
        for axis in 0..3 {
            for (o, &c) in origin.iter_mut().zip(self.direction_cosines[axis].iter()) {
                *o += self.starts[axis] * c;
            }
        }
        origin
    }

    /// Voxel-to-world affine (4x4, row-major)
    ///
    /// Column `a` holds `cosine[a] * separation[a]`, the last column the
    /// world origin.
    pub fn to_affine(&self) -> [f64; 16] {
        let origin = self.world_origin();
        let mut affine = [0.0; 16];
        for row in 0..3 {
            for axis in 0..3 {
                affine[row * 4 + axis] = self.direction_cosines[axis][row] * self.separations[axis];
            }
            affine[row * 4 + 3] = origin[row];
        }
        affine[15] = 1.0;
        affine
    }

    /// Recover geometry from a voxel-to-world affine (4x4, row-major)
    ///
    /// Assumes orthogonal axes; the start along each axis is the projection
    /// of the translation onto that axis' cosine.
    pub fn from_affine(sizes: [usize; 3], affine: &[f64; 16]) -> Self {
        let mut geometry = Geometry::new(sizes);
        let translation = [affine[3], affine[7], affine[11]];
        for axis in 0..3 {
            let column = [affine[axis], affine[4 + axis], affine[8 + axis]];
            let sep = column.iter().map(|c| c * c).sum::<f64>().sqrt();
            if sep > 0.0 {
                geometry.separations[axis] = sep;
                geometry.direction_cosines[axis] = [column[0] / sep, column[1] / sep, column[2] / sep];
            }
            let cosine = geometry.direction_cosines[axis];
            geometry.starts[axis] = translation.iter().zip(cosine.iter()).map(|(t, c)| t * c).sum();
        }
        geometry
    }
}

/// Descriptor of a non-spatial axis (the real/imaginary channel axis)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisInfo {
    pub len: usize,
    pub start: f64,
    pub separation: f64,
}

/// Channel axis appended to every complex volume
pub const CHANNEL_AXIS: AxisInfo = AxisInfo { len: 2, start: 0.0, separation: 1.0 };

/// Index along the channel axis of a [`ComplexVolume`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Real = 0,
    Imag = 1,
}

/// Declared value range of a volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Starting point for running min/max tracking: [+inf, -inf]
    pub const EMPTY: ValueRange = ValueRange { min: f64::INFINITY, max: f64::NEG_INFINITY };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Fold one sample into the range (strict comparisons)
    #[inline]
    pub fn include(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut range = Self::EMPTY;
        for v in values {
            range.include(v);
        }
        range
    }

    pub fn is_empty(&self) -> bool {
        !(self.min <= self.max)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Real-valued 3D volume
#[derive(Debug, Clone, PartialEq)]
pub struct RealVolume {
    data: Vec<f64>,
    geometry: Geometry,
    range: ValueRange,
}

/// Real input volume handed to the embedder
pub type SpatialVolume = RealVolume;

/// Real output volume produced by a projection
pub type ScalarVolume = RealVolume;

impl RealVolume {
    /// Wrap existing samples; the declared range is computed from the data
    pub fn new(data: Vec<f64>, geometry: Geometry) -> Result<Self> {
        geometry.validate()?;
        if data.len() != geometry.n_total() {
            return Err(SpectralError::InvalidGeometry(format!(
                "expected {} samples for {:?}, got {}",
                geometry.n_total(), geometry.sizes, data.len()
            )));
        }
        let range = ValueRange::from_values(data.iter().copied());
        Ok(Self { data, geometry, range })
    }

    pub fn zeros(geometry: Geometry) -> Result<Self> {
        geometry.validate()?;
        let data = vec![0.0; geometry.n_total()];
        Ok(Self { data, geometry, range: ValueRange::new(0.0, 0.0) })
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        let (nx, ny, _) = self.geometry.dims();
        self.data[idx3d(i, j, k, nx, ny)]
    }

    /// Write one sample; the declared range is left untouched
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        let (nx, ny, _) = self.geometry.dims();
        self.data[idx3d(i, j, k, nx, ny)] = value;
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        self.geometry.dims()
    }

    pub fn range(&self) -> ValueRange {
        self.range
    }

    pub fn set_range(&mut self, range: ValueRange) {
        self.range = range;
    }
}

/// Complex 4D volume: three spatial axes plus a real/imaginary channel axis
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexVolume {
    data: Vec<Complex64>,
    geometry: Geometry,
    channel: AxisInfo,
    range: ValueRange,
}

impl ComplexVolume {
    pub fn zeros(geometry: Geometry) -> Result<Self> {
        geometry.validate()?;
        let data = vec![Complex64::new(0.0, 0.0); geometry.n_total()];
        Ok(Self { data, geometry, channel: CHANNEL_AXIS, range: ValueRange::new(0.0, 0.0) })
    }

    /// Wrap existing samples; the declared range covers both channels
    pub fn from_samples(data: Vec<Complex64>, geometry: Geometry) -> Result<Self> {
        geometry.validate()?;
        if data.len() != geometry.n_total() {
            return Err(SpectralError::InvalidGeometry(format!(
                "expected {} complex samples for {:?}, got {}",
                geometry.n_total(), geometry.sizes, data.len()
            )));
        }
        let range = ValueRange::from_values(data.iter().flat_map(|c| [c.re, c.im]));
        Ok(Self { data, geometry, channel: CHANNEL_AXIS, range })
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize, channel: Channel) -> f64 {
        let c = self.sample(i, j, k);
        match channel {
            Channel::Real => c.re,
            Channel::Imag => c.im,
        }
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, channel: Channel, value: f64) {
        let (nx, ny, _) = self.geometry.dims();
        let c = &mut self.data[idx3d(i, j, k, nx, ny)];
        match channel {
            Channel::Real => c.re = value,
            Channel::Imag => c.im = value,
        }
    }

    #[inline]
    pub fn sample(&self, i: usize, j: usize, k: usize) -> Complex64 {
        let (nx, ny, _) = self.geometry.dims();
        self.data[idx3d(i, j, k, nx, ny)]
    }

    /// Axis lengths including the channel axis: [nx, ny, nz, 2]
    pub fn sizes(&self) -> [usize; 4] {
        let [nx, ny, nz] = self.geometry.sizes;
        [nx, ny, nz, self.channel.len]
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        self.geometry.dims()
    }

    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn channel_axis(&self) -> AxisInfo {
        self.channel
    }

    pub fn range(&self) -> ValueRange {
        self.range
    }

    pub fn set_range(&mut self, range: ValueRange) {
        self.range = range;
    }
}
