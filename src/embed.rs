//! Embedding of real spatial volumes into complex volumes

use log::debug;
use num_complex::Complex64;

use crate::error::{Result, SpectralError};
use crate::volume::{ComplexVolume, SpatialVolume};

/// Prepare a real volume for transformation
///
/// The real channel is copied verbatim, the imaginary channel is zero. The
/// spatial geometry and the declared value range carry over unchanged; the
/// appended channel axis starts at 0 with unit separation.
///
/// # Errors
/// `InvalidGeometry` if the source geometry is unusable.
pub fn prep_volume(input: &SpatialVolume) -> Result<ComplexVolume> {
    let geometry = input.geometry().clone();
    geometry.validate()?;
    if input.data().len() != geometry.n_total() {
        return Err(SpectralError::InvalidGeometry(format!(
            "volume holds {} samples but its geometry describes {}",
            input.data().len(), geometry.n_total()
        )));
    }

    let mut output = ComplexVolume::zeros(geometry)?;
    for (c, &r) in output.data_mut().iter_mut().zip(input.data().iter()) {
        *c = Complex64::new(r, 0.0);
    }
    output.set_range(input.range());

    debug!("Prepared complex volume {:?}", output.sizes());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::{Channel, Geometry, RealVolume, ValueRange, CHANNEL_AXIS};

    #[test]
    fn test_prep_copies_real_and_zeroes_imag() {
        let geometry = Geometry::new([3, 2, 2])
            .with_separations([0.5, 1.0, 2.0])
            .with_starts([-1.0, 0.0, 4.0]);
        let data: Vec<f64> = (0..12).map(|i| i as f64 - 5.0).collect();
        let input = RealVolume::new(data, geometry.clone()).unwrap();

        let output = prep_volume(&input).unwrap();

        assert_eq!(output.sizes(), [3, 2, 2, 2]);
        assert_eq!(output.geometry(), &geometry);
        assert_eq!(output.channel_axis(), CHANNEL_AXIS);
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..3 {
                    assert_eq!(output.get(i, j, k, Channel::Real), input.get(i, j, k));
                    assert_eq!(output.get(i, j, k, Channel::Imag), 0.0);
                }
            }
        }
    }

    #[test]
    fn test_prep_keeps_declared_range() {
        let mut input = RealVolume::new(vec![1.0; 8], Geometry::new([2, 2, 2])).unwrap();
        input.set_range(ValueRange::new(-100.0, 100.0));

        let output = prep_volume(&input).unwrap();
        assert_eq!(output.range(), ValueRange::new(-100.0, 100.0));
    }

    #[test]
    fn test_prep_keeps_direction_cosines() {
        let mut geometry = Geometry::new([2, 2, 2]);
        geometry.direction_cosines = [[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        let input = RealVolume::new(vec![0.0; 8], geometry.clone()).unwrap();

        let output = prep_volume(&input).unwrap();
        assert_eq!(output.geometry().direction_cosines, geometry.direction_cosines);
    }
}
