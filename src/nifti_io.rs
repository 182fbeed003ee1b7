//! NIfTI file I/O for spatial, scalar and complex volumes
//!
//! Reads 3D real volumes and 4D complex volumes (last axis of length 2:
//! real then imaginary) from `.nii` / `.nii.gz`, and writes them back with
//! the declared range in `cal_min`/`cal_max` and the geometry in the sform.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array;
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiHeader, NiftiObject};
use num_complex::Complex64;

use crate::error::{Result, SpectralError};
use crate::volume::{ComplexVolume, Geometry, RealVolume, SpatialVolume, ValueRange};

/// Size of the NIfTI-1 header plus the empty extension block
const VOX_OFFSET: usize = 352;

/// A volume read from disk: either real-valued or already complex
#[derive(Debug, Clone)]
pub enum LoadedVolume {
    Spatial(SpatialVolume),
    Complex(ComplexVolume),
}

impl LoadedVolume {
    /// Number of file dimensions (3 for spatial, 4 for complex)
    pub fn ndims(&self) -> usize {
        match self {
            LoadedVolume::Spatial(_) => 3,
            LoadedVolume::Complex(_) => 4,
        }
    }

    pub fn range(&self) -> ValueRange {
        match self {
            LoadedVolume::Spatial(v) => v.range(),
            LoadedVolume::Complex(v) => v.range(),
        }
    }
}

/// On-disk sample type of a written volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    Byte,
    Short,
    Int,
    #[default]
    Float,
    Double,
}

/// Sample type plus signedness (ignored for floating-point types)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputFormat {
    pub data_type: OutputType,
    pub signed: bool,
}

impl OutputFormat {
    pub fn new(data_type: OutputType, signed: bool) -> Self {
        Self { data_type, signed }
    }

    /// NIfTI datatype code and bits per voxel
    fn datatype(&self) -> (i16, i16) {
        match (self.data_type, self.signed) {
            (OutputType::Byte, false) => (2, 8),
            (OutputType::Byte, true) => (256, 8),
            (OutputType::Short, false) => (512, 16),
            (OutputType::Short, true) => (4, 16),
            (OutputType::Int, false) => (768, 32),
            (OutputType::Int, true) => (8, 32),
            (OutputType::Float, _) => (16, 32),
            (OutputType::Double, _) => (64, 64),
        }
    }

    /// Representable range of integer types
    fn integer_limits(&self) -> Option<(f64, f64)> {
        match (self.data_type, self.signed) {
            (OutputType::Byte, false) => Some((u8::MIN as f64, u8::MAX as f64)),
            (OutputType::Byte, true) => Some((i8::MIN as f64, i8::MAX as f64)),
            (OutputType::Short, false) => Some((u16::MIN as f64, u16::MAX as f64)),
            (OutputType::Short, true) => Some((i16::MIN as f64, i16::MAX as f64)),
            (OutputType::Int, false) => Some((u32::MIN as f64, u32::MAX as f64)),
            (OutputType::Int, true) => Some((i32::MIN as f64, i32::MAX as f64)),
            (OutputType::Float, _) | (OutputType::Double, _) => None,
        }
    }

    /// (scl_slope, scl_inter) mapping stored integers onto `range`
    fn scaling(&self, range: ValueRange) -> (f64, f64) {
        match self.integer_limits() {
            None => (1.0, 0.0),
            Some((lo, hi)) => {
                if range.is_empty() || !range.width().is_finite() {
                    (1.0, 0.0)
                } else if range.width() == 0.0 {
                    (1.0, range.min)
                } else {
                    let slope = range.width() / (hi - lo);
                    (slope, range.min - lo * slope)
                }
            }
        }
    }
}

/// Check if bytes are gzip compressed
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Get header info for diagnostics
fn get_header_info(bytes: &[u8]) -> String {
    if bytes.len() < 348 {
        return format!("File too small ({} bytes, need at least 348)", bytes.len());
    }

    let sizeof_hdr = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let magic = String::from_utf8_lossy(&bytes[344..348]).to_string();
    let datatype = i16::from_le_bytes([bytes[70], bytes[71]]);

    format!("sizeof_hdr={}, magic='{}', datatype={}", sizeof_hdr, magic, datatype)
}

fn read_object(bytes: &[u8]) -> Result<InMemNiftiObject> {
    if is_gzip(bytes) {
        InMemNiftiObject::from_reader(GzDecoder::new(Cursor::new(bytes))).map_err(|e| {
            let mut decompressed = Vec::new();
            let info = if GzDecoder::new(Cursor::new(bytes)).read_to_end(&mut decompressed).is_ok() {
                get_header_info(&decompressed)
            } else {
                "Could not decompress".to_string()
            };
            SpectralError::Nifti(format!("gzipped NIfTI: {} ({})", e, info))
        })
    } else {
        let info = get_header_info(bytes);
        InMemNiftiObject::from_reader(Cursor::new(bytes))
            .map_err(|e| SpectralError::Nifti(format!("{} ({})", e, info)))
    }
}

/// Load a NIfTI volume from bytes
///
/// 3D files (or 4D with a single volume) load as spatial volumes, 4D files
/// with exactly two volumes load as complex volumes. Gzip is auto-detected.
pub fn load_volume(bytes: &[u8]) -> Result<LoadedVolume> {
    let obj = read_object(bytes)?;
    let header = obj.header().clone();

    let ndim = header.dim[0] as usize;
    if ndim < 3 {
        return Err(SpectralError::InvalidGeometry(format!(
            "Expected at least 3D volume, got {}D", ndim
        )));
    }

    let affine = get_affine(&header);

    let array: Array<f64, _> = obj
        .into_volume()
        .into_ndarray()
        .map_err(|e| SpectralError::Nifti(format!("Failed to convert to ndarray: {}", e)))?;

    // Use the actual array shape for dimensions (nifti-rs may drop trailing axes)
    let shape = array.shape().to_vec();
    if shape.len() < 3 {
        return Err(SpectralError::InvalidGeometry(format!(
            "Expected at least 3D array, got {}D", shape.len()
        )));
    }
    let (nx, ny, nz) = (shape[0], shape[1], shape[2]);
    let geometry = Geometry::from_affine([nx, ny, nz], &affine);
    let n_channels = if shape.len() >= 4 { shape[3] } else { 1 };

    let declared = if header.cal_max > header.cal_min {
        Some(ValueRange::new(header.cal_min as f64, header.cal_max as f64))
    } else {
        None
    };

    // Extract data in Fortran order (x varies fastest)
    match (shape.len(), n_channels) {
        (3, _) | (4, 1) => {
            let mut data = Vec::with_capacity(nx * ny * nz);
            for k in 0..nz {
                for j in 0..ny {
                    for i in 0..nx {
                        data.push(if shape.len() == 3 { array[[i, j, k]] } else { array[[i, j, k, 0]] });
                    }
                }
            }
            let mut volume = RealVolume::new(data, geometry)?;
            if let Some(range) = declared {
                volume.set_range(range);
            }
            Ok(LoadedVolume::Spatial(volume))
        }
        (4, 2) => {
            let mut data = Vec::with_capacity(nx * ny * nz);
            for k in 0..nz {
                for j in 0..ny {
                    for i in 0..nx {
                        data.push(Complex64::new(array[[i, j, k, 0]], array[[i, j, k, 1]]));
                    }
                }
            }
            let mut volume = ComplexVolume::from_samples(data, geometry)?;
            if let Some(range) = declared {
                volume.set_range(range);
            }
            Ok(LoadedVolume::Complex(volume))
        }
        _ => Err(SpectralError::InvalidGeometry(format!(
            "Expected a 3D real volume or a 4D volume with 2 channels, got shape {:?}", shape
        ))),
    }
}

/// Get affine transformation matrix from header
fn get_affine(header: &NiftiHeader) -> [f64; 16] {
    // Prefer sform if available (sform_code > 0)
    if header.sform_code > 0 {
        let s = &header.srow_x;
        let t = &header.srow_y;
        let u = &header.srow_z;
        [
            s[0] as f64, s[1] as f64, s[2] as f64, s[3] as f64,
            t[0] as f64, t[1] as f64, t[2] as f64, t[3] as f64,
            u[0] as f64, u[1] as f64, u[2] as f64, u[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        ]
    } else {
        // Fall back to identity with voxel scaling
        let vsx = header.pixdim[1] as f64;
        let vsy = header.pixdim[2] as f64;
        let vsz = header.pixdim[3] as f64;
        [
            vsx, 0.0, 0.0, 0.0,
            0.0, vsy, 0.0, 0.0,
            0.0, 0.0, vsz, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}

/// Longest prefix of `text` that fits in `descrip` (79 bytes + NUL) without splitting a character
fn truncate_descrip(text: &str) -> &str {
    let mut end = text.len().min(79);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Save samples as NIfTI bytes
///
/// `dims` holds 3 spatial sizes, optionally followed by the channel count.
/// Integer formats are scaled into the type's range via scl_slope/scl_inter.
pub fn save_nifti(
    data: &[f64],
    dims: &[usize],
    geometry: &Geometry,
    range: ValueRange,
    format: OutputFormat,
    description: &str,
) -> Result<Vec<u8>> {
    if dims.len() < 3 || dims.len() > 4 {
        return Err(SpectralError::InvalidGeometry(format!("cannot write {}D data", dims.len())));
    }
    if data.len() != dims.iter().product::<usize>() {
        return Err(SpectralError::InvalidGeometry(format!(
            "{} samples do not fill dims {:?}", data.len(), dims
        )));
    }
    if let Some(&too_big) = dims.iter().find(|&&d| d > i16::MAX as usize) {
        return Err(SpectralError::InvalidGeometry(format!(
            "dimension {} exceeds the NIfTI-1 limit", too_big
        )));
    }

    let (datatype, bitpix) = format.datatype();
    let (slope, inter) = format.scaling(range);

    // Create NIfTI-1 header (348 bytes)
    let mut header = [0u8; 348];

    // sizeof_hdr = 348
    header[0..4].copy_from_slice(&348i32.to_le_bytes());

    // dim[0..7]
    let mut dim: [i16; 8] = [dims.len() as i16, 1, 1, 1, 1, 1, 1, 1];
    for (d, &n) in dim[1..].iter_mut().zip(dims.iter()) {
        *d = n as i16;
    }
    for (i, &d) in dim.iter().enumerate() {
        let offset = 40 + i * 2;
        header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
    }

    header[70..72].copy_from_slice(&datatype.to_le_bytes());
    header[72..74].copy_from_slice(&bitpix.to_le_bytes());

    // pixdim[0..7]; the channel axis has unit spacing
    let [sx, sy, sz] = geometry.separations;
    let pixdim: [f32; 8] = [1.0, sx.abs() as f32, sy.abs() as f32, sz.abs() as f32, 1.0, 1.0, 1.0, 1.0];
    for (i, &p) in pixdim.iter().enumerate() {
        let offset = 76 + i * 4;
        header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
    }

    // vox_offset = 352 (header + 4 bytes extension)
    header[108..112].copy_from_slice(&(VOX_OFFSET as f32).to_le_bytes());

    header[112..116].copy_from_slice(&(slope as f32).to_le_bytes());
    header[116..120].copy_from_slice(&(inter as f32).to_le_bytes());

    // xyzt_units = mm
    header[123] = 2;

    // cal_max, cal_min carry the declared range
    if !range.is_empty() {
        header[124..128].copy_from_slice(&(range.max as f32).to_le_bytes());
        header[128..132].copy_from_slice(&(range.min as f32).to_le_bytes());
    }

    // descrip[80], NUL terminated
    let descrip = truncate_descrip(description).as_bytes();
    header[148..148 + descrip.len()].copy_from_slice(descrip);

    // sform_code = 1 (scanner anat)
    header[254..256].copy_from_slice(&1i16.to_le_bytes());

    // srow_x, srow_y, srow_z
    let affine = geometry.to_affine();
    for row in 0..3 {
        for col in 0..4 {
            let offset = 280 + row * 16 + col * 4;
            header[offset..offset + 4].copy_from_slice(&(affine[row * 4 + col] as f32).to_le_bytes());
        }
    }

    // magic = "n+1\0" for NIfTI-1 single file
    header[344..348].copy_from_slice(b"n+1\0");

    let mut buffer = Vec::with_capacity(VOX_OFFSET + data.len() * (bitpix as usize / 8));
    buffer.write_all(&header)?;
    // Extension (4 bytes, all zeros = no extension)
    buffer.write_all(&[0u8; 4])?;

    match format.integer_limits() {
        None if format.data_type == OutputType::Double => {
            for &val in data {
                buffer.write_all(&val.to_le_bytes())?;
            }
        }
        None => {
            for &val in data {
                buffer.write_all(&(val as f32).to_le_bytes())?;
            }
        }
        Some((lo, hi)) => {
            for &val in data {
                let stored = ((val - inter) / slope).round().clamp(lo, hi);
                match (format.data_type, format.signed) {
                    (OutputType::Byte, false) => buffer.write_all(&(stored as u8).to_le_bytes())?,
                    (OutputType::Byte, true) => buffer.write_all(&(stored as i8).to_le_bytes())?,
                    (OutputType::Short, false) => buffer.write_all(&(stored as u16).to_le_bytes())?,
                    (OutputType::Short, true) => buffer.write_all(&(stored as i16).to_le_bytes())?,
                    (OutputType::Int, false) => buffer.write_all(&(stored as u32).to_le_bytes())?,
                    _ => buffer.write_all(&(stored as i32).to_le_bytes())?,
                }
            }
        }
    }

    Ok(buffer)
}

/// Save samples as gzipped NIfTI bytes (.nii.gz)
pub fn save_nifti_gz(
    data: &[f64],
    dims: &[usize],
    geometry: &Geometry,
    range: ValueRange,
    format: OutputFormat,
    description: &str,
) -> Result<Vec<u8>> {
    let uncompressed = save_nifti(data, dims, geometry, range, format, description)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&uncompressed)?;
    Ok(encoder.finish()?)
}

/// Read a NIfTI file from a filesystem path
pub fn read_volume_file(path: &Path) -> Result<LoadedVolume> {
    let bytes = std::fs::read(path)?;
    load_volume(&bytes)
}

fn write_file(
    path: &Path,
    data: &[f64],
    dims: &[usize],
    geometry: &Geometry,
    range: ValueRange,
    format: OutputFormat,
    description: &str,
) -> Result<()> {
    let bytes = if path.to_string_lossy().ends_with(".gz") {
        save_nifti_gz(data, dims, geometry, range, format, description)?
    } else {
        save_nifti(data, dims, geometry, range, format, description)?
    };
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Write a 3D scalar volume; `.gz` paths are compressed
pub fn write_scalar_volume(
    path: &Path,
    volume: &RealVolume,
    format: OutputFormat,
    description: &str,
) -> Result<()> {
    let (nx, ny, nz) = volume.dims();
    write_file(path, volume.data(), &[nx, ny, nz], volume.geometry(), volume.range(), format, description)
}

/// Write a complex volume as 4D data: the real volume, then the imaginary volume
pub fn write_complex_volume(
    path: &Path,
    volume: &ComplexVolume,
    format: OutputFormat,
    description: &str,
) -> Result<()> {
    let (nx, ny, nz) = volume.dims();
    let samples = volume.data();
    let mut data = Vec::with_capacity(samples.len() * 2);
    data.extend(samples.iter().map(|c| c.re));
    data.extend(samples.iter().map(|c| c.im));
    write_file(path, &data, &[nx, ny, nz, 2], volume.geometry(), volume.range(), format, description)
}
