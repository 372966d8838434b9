//! Turning edge lengths into Gaussian-kernel weights.

use crate::common::*;

/// Where edge lengths come from before the kernel is applied
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DistanceSource {
    /// The distance column of the edge table
    #[default]
    Recorded,
    /// Euclidean distance between normalized endpoint coordinates
    Coordinates,
}

/// Gaussian-type exponential kernel: `w = exp(-d² / φ)`.
///
/// `d = 0` gives exactly 1; larger `φ` decays more slowly.
#[inline]
pub fn exp_kernel_weight(distance: f32, phi: f32) -> f32 {
    (-(distance * distance) / phi).exp()
}

/// Convert edge lengths to similarity weights, one per edge, in order.
///
/// * `distances` - non-negative edge lengths
/// * `phi` - positive bandwidth
pub fn exp_kernel_weights(distances: &[f32], phi: f32) -> anyhow::Result<Vec<f32>> {
    if !(phi.is_finite() && phi > 0.0) {
        return Err(anyhow::anyhow!("bandwidth φ must be positive, got {}", phi));
    }

    if let Some(pos) = distances.iter().position(|d| !d.is_finite() || *d < 0.0) {
        return Err(anyhow::anyhow!(
            "edge {} has an invalid distance {}",
            pos,
            distances[pos]
        ));
    }

    Ok(distances
        .iter()
        .map(|&d| exp_kernel_weight(d, phi))
        .collect())
}

/// Euclidean length of each `(src, tgt)` pair in an `n x 2` coordinate matrix
pub fn coordinate_distances(pairs: &[(usize, usize)], coords: &Mat) -> anyhow::Result<Vec<f32>> {
    let nn = coords.nrows();
    pairs
        .iter()
        .map(|&(i, j)| {
            if i >= nn || j >= nn {
                return Err(anyhow::anyhow!(
                    "edge ({}, {}) out of range for {} cells",
                    i,
                    j,
                    nn
                ));
            }
            let dx = coords[(i, 0)] - coords[(j, 0)];
            let dy = coords[(i, 1)] - coords[(j, 1)];
            Ok((dx * dx + dy * dy).sqrt())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_is_unit_weight() {
        for phi in [1e-4, 0.1, 1.0, 1e3] {
            assert_eq!(exp_kernel_weight(0.0, phi), 1.0);
        }
    }

    #[test]
    fn weights_do_not_increase_with_distance() {
        let distances: Vec<f32> = (0..50).map(|x| x as f32 * 0.05).collect();
        for phi in [0.01, 0.1, 1.0, 10.0] {
            let w = exp_kernel_weights(&distances, phi).unwrap();
            assert_eq!(w.len(), distances.len());
            for pair in w.windows(2) {
                assert!(pair[1] <= pair[0]);
            }
        }
    }

    #[test]
    fn wider_bandwidth_decays_slower() {
        let narrow = exp_kernel_weight(0.5, 0.1);
        let wide = exp_kernel_weight(0.5, 1.0);
        assert!(wide > narrow);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(exp_kernel_weights(&[1.0], 0.0).is_err());
        assert!(exp_kernel_weights(&[1.0], -1.0).is_err());
        assert!(exp_kernel_weights(&[-0.5], 1.0).is_err());
        assert!(exp_kernel_weights(&[f32::NAN], 1.0).is_err());
    }

    #[test]
    fn distances_from_coordinates() {
        let coords = Mat::from_row_slice(2, 2, &[0.0, 0.0, 0.3, 0.4]);
        let d = coordinate_distances(&[(0, 1), (1, 1)], &coords).unwrap();
        approx::assert_abs_diff_eq!(d[0], 0.5, epsilon = 1e-6);
        assert_eq!(d[1], 0.0);
        assert!(coordinate_distances(&[(0, 2)], &coords).is_err());
    }
}
